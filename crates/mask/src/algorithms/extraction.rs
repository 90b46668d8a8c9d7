use image::GrayImage;
use crate::{error::Result, traits::ContourExtractor, types::Ring};

/// Traces the cell edges separating foreground from background.
///
/// Ring vertices sit on cell corners, so filling the rings with the even-odd
/// rule and sampling at cell centres gives back exactly the foreground set.
/// Every edge is walked with foreground on its right-hand side (image
/// coordinates, y down): exteriors come out clockwise on screen and holes
/// counter-clockwise. Where two foreground cells touch only diagonally the
/// walk keeps them apart, so regions are 4-connected.
#[derive(Debug, Clone, Default)]
pub struct CrackEdgeContourExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Right,
    Down,
    Left,
    Up,
}

impl Dir {
    const ALL: [Dir; 4] = [Dir::Right, Dir::Down, Dir::Left, Dir::Up];

    fn bit(self) -> u8 {
        1 << self as u8
    }

    fn turn_right(self) -> Dir {
        Self::ALL[(self as usize + 1) % 4]
    }

    fn turn_left(self) -> Dir {
        Self::ALL[(self as usize + 3) % 4]
    }

    fn step(self, (x, y): (usize, usize)) -> (usize, usize) {
        match self {
            Dir::Right => (x + 1, y),
            Dir::Down => (x, y + 1),
            Dir::Left => (x - 1, y),
            Dir::Up => (x, y - 1),
        }
    }
}

struct EdgeGrid {
    stride: usize,
    outgoing: Vec<u8>,
    used: Vec<u8>,
}

impl EdgeGrid {
    fn from_binary(binary: &GrayImage) -> Self {
        let (width, height) = (binary.width() as usize, binary.height() as usize);
        let stride = width + 1;
        let mut outgoing = vec![0u8; stride * (height + 1)];
        let fg = |x: isize, y: isize| {
            x >= 0
                && y >= 0
                && (x as usize) < width
                && (y as usize) < height
                && binary.get_pixel(x as u32, y as u32)[0] > 0
        };

        for y in 0..height {
            for x in 0..width {
                let (xi, yi) = (x as isize, y as isize);
                if !fg(xi, yi) {
                    continue;
                }
                if !fg(xi, yi - 1) {
                    outgoing[y * stride + x] |= Dir::Right.bit();
                }
                if !fg(xi + 1, yi) {
                    outgoing[y * stride + x + 1] |= Dir::Down.bit();
                }
                if !fg(xi, yi + 1) {
                    outgoing[(y + 1) * stride + x + 1] |= Dir::Left.bit();
                }
                if !fg(xi - 1, yi) {
                    outgoing[(y + 1) * stride + x] |= Dir::Up.bit();
                }
            }
        }

        let used = vec![0u8; outgoing.len()];
        Self { stride, outgoing, used }
    }

    fn has(&self, vertex: (usize, usize), dir: Dir) -> bool {
        self.outgoing[vertex.1 * self.stride + vertex.0] & dir.bit() != 0
    }

    fn mark_used(&mut self, vertex: (usize, usize), dir: Dir) {
        self.used[vertex.1 * self.stride + vertex.0] |= dir.bit();
    }

    fn first_unused(&self, index: usize) -> Option<Dir> {
        let free = self.outgoing[index] & !self.used[index];
        Dir::ALL.into_iter().find(|d| free & d.bit() != 0)
    }

    /// Right turn first (hugging the same foreground cell), then straight.
    fn next_dir(&self, vertex: (usize, usize), incoming: Dir) -> Option<Dir> {
        [incoming.turn_right(), incoming, incoming.turn_left()]
            .into_iter()
            .find(|&d| self.has(vertex, d))
    }

    fn trace_ring(&mut self, start: (usize, usize), start_dir: Dir) -> Ring {
        // (vertex, direction leaving it)
        let mut steps = vec![(start, start_dir)];
        self.mark_used(start, start_dir);
        let mut vertex = start_dir.step(start);
        let mut dir = start_dir;

        loop {
            let Some(next) = self.next_dir(vertex, dir) else {
                break;
            };
            if vertex == start && next == start_dir {
                break;
            }
            self.mark_used(vertex, next);
            steps.push((vertex, next));
            vertex = next.step(vertex);
            dir = next;
        }

        // Keep only corners: vertices where the direction changes.
        let n = steps.len();
        (0..n)
            .filter(|&i| steps[(i + n - 1) % n].1 != steps[i].1)
            .map(|i| [steps[i].0 .0 as f64, steps[i].0 .1 as f64])
            .collect()
    }
}

impl ContourExtractor for CrackEdgeContourExtractor {
    fn extract_contours(&self, binary: &GrayImage) -> Result<Vec<Ring>> {
        let mut grid = EdgeGrid::from_binary(binary);
        let mut rings = Vec::new();

        for index in 0..grid.outgoing.len() {
            while let Some(dir) = grid.first_unused(index) {
                let start = (index % grid.stride, index / grid.stride);
                let ring = grid.trace_ring(start, dir);
                if ring.len() >= 4 {
                    rings.push(ring);
                }
            }
        }

        Ok(rings)
    }
}

/// Imageproc border-following extractor. Vertices are the centres of the
/// boundary cells, so outlines sit half a cell inside the foreground.
#[derive(Debug, Clone, Default)]
pub struct ImageprocContourExtractor;

impl ContourExtractor for ImageprocContourExtractor {
    fn extract_contours(&self, binary: &GrayImage) -> Result<Vec<Ring>> {
        let contours = imageproc::contours::find_contours::<i32>(binary);

        let result = contours
            .into_iter()
            .map(|contour| {
                contour
                    .points
                    .iter()
                    .map(|p| [p.x as f64 + 0.5, p.y as f64 + 0.5])
                    .collect()
            })
            .collect();

        Ok(result)
    }
}
