use geo::{Area, BoundingRect, Contains};
use geo_types::{Coord, LineString, Polygon, Rect};
use crate::{error::Result, traits::HoleDetector, types::{ComplexShape, Ring}};

/// Containment-based hole detector.
///
/// A ring's depth is the number of rings enclosing it. Rings at even depth
/// are exteriors; rings at odd depth are holes of their smallest enclosing
/// ring, so islands inside holes become shapes of their own.
#[derive(Debug, Clone, Default)]
pub struct ContainmentHoleDetector;

struct Candidate {
    ring: Ring,
    polygon: Polygon<f64>,
    bounds: Option<Rect<f64>>,
    area: f64,
}

fn rect_within(inner: &Rect<f64>, outer: &Rect<f64>) -> bool {
    inner.min().x >= outer.min().x
        && inner.min().y >= outer.min().y
        && inner.max().x <= outer.max().x
        && inner.max().y <= outer.max().y
}

impl HoleDetector for ContainmentHoleDetector {
    fn detect_holes(&self, rings: Vec<Ring>) -> Result<Vec<ComplexShape>> {
        let mut candidates: Vec<Candidate> = rings
            .into_iter()
            .map(|ring| {
                let coords: Vec<Coord<f64>> = ring.iter().map(|&[x, y]| Coord { x, y }).collect();
                let polygon = Polygon::new(LineString::new(coords), vec![]);
                let bounds = polygon.bounding_rect();
                let area = polygon.unsigned_area();
                Candidate { ring, polygon, bounds, area }
            })
            .collect();

        // Largest first, so a ring's possible parents all precede it
        candidates.sort_by(|a, b| b.area.total_cmp(&a.area));

        let mut parent: Vec<Option<usize>> = vec![None; candidates.len()];
        let mut depth: Vec<usize> = vec![0; candidates.len()];

        for i in 0..candidates.len() {
            let inner = &candidates[i];
            // Walk backwards: the nearest enclosing ring is the smallest one
            for j in (0..i).rev() {
                let outer = &candidates[j];
                if outer.area <= inner.area {
                    continue;
                }
                let fits = match (&inner.bounds, &outer.bounds) {
                    (Some(a), Some(b)) => rect_within(a, b),
                    _ => false,
                };
                if fits && outer.polygon.contains(&inner.polygon) {
                    parent[i] = Some(j);
                    depth[i] = depth[j] + 1;
                    break;
                }
            }
        }

        let mut shape_of: Vec<Option<usize>> = vec![None; candidates.len()];
        let mut shapes: Vec<ComplexShape> = Vec::new();

        for (i, candidate) in candidates.into_iter().enumerate() {
            if depth[i] % 2 == 0 {
                shape_of[i] = Some(shapes.len());
                shapes.push(ComplexShape::new(candidate.ring));
            } else if let Some(shape) = parent[i].and_then(|p| shape_of[p]) {
                shapes[shape].holes.push(candidate.ring);
            }
        }

        Ok(shapes)
    }
}

/// Simple hole detector that treats each ring as a separate shape
#[derive(Debug, Clone, Default)]
pub struct NoHoleDetector;

impl HoleDetector for NoHoleDetector {
    fn detect_holes(&self, rings: Vec<Ring>) -> Result<Vec<ComplexShape>> {
        Ok(rings.into_iter().map(ComplexShape::new).collect())
    }
}
