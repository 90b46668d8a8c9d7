//! Turns traced outlines plus the source bitmap into the trimmed two-tone
//! cutout: black subject on a white background.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{MaskError, Result},
    types::TracedOutline,
};

pub const SUBJECT: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Pixel rectangle, `x`/`y` inclusive origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Tight bounds of every pixel with non-zero alpha, `None` if there are none.
    pub fn of_opaque(image: &RgbaImage) -> Option<Self> {
        let mut min = (u32::MAX, u32::MAX);
        let mut max = (0u32, 0u32);
        let mut found = false;

        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel[3] == 0 {
                continue;
            }
            found = true;
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        }

        found.then(|| Self {
            x: min.0,
            y: min.1,
            width: max.0 - min.0 + 1,
            height: max.1 - min.1 + 1,
        })
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Final two-tone output and the region it was trimmed to.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub image: RgbaImage,
    pub bounds: BoundingBox,
}

impl RenderedImage {
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// The trimmed region alone.
    pub fn cropped(&self) -> RgbaImage {
        let b = self.bounds;
        imageops::crop_imm(&self.image, b.x, b.y, b.width, b.height).to_image()
    }
}

/// Fill every ring of `outline` with the even-odd rule onto a `width`x`height`
/// coverage canvas, sampling at pixel centres. Inside is 255, outside 0.
pub fn rasterize(outline: &TracedOutline, width: u32, height: u32) -> Result<GrayImage> {
    let (w, h) = (width as usize, height as usize);
    let mut coverage = vec![0u8; w * h];

    let edges: Vec<([f64; 2], [f64; 2])> = outline
        .rings()
        .filter(|ring| ring.len() >= 3)
        .flat_map(|ring| {
            let n = ring.len();
            (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
        })
        .filter(|(a, b)| a[1] != b[1])
        .collect();

    let mut crossings = Vec::new();
    for row in 0..h {
        let sample_y = row as f64 + 0.5;
        crossings.clear();
        for &(a, b) in &edges {
            if (a[1] <= sample_y) != (b[1] <= sample_y) {
                let t = (sample_y - a[1]) / (b[1] - a[1]);
                crossings.push(a[0] + t * (b[0] - a[0]));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            // Pixels whose centre falls in [span[0], span[1])
            let start = (span[0] - 0.5).ceil().max(0.0) as usize;
            let end = ((span[1] - 0.5).ceil().max(0.0) as usize).min(w);
            if start < end {
                coverage[row * w + start..row * w + end].fill(255);
            }
        }
    }

    GrayImage::from_raw(width, height, coverage)
        .ok_or_else(|| MaskError::RenderContext(format!("cannot allocate {width}x{height} coverage canvas")))
}

/// Keep `bitmap` colour only where `coverage` is set; transparent elsewhere.
pub fn composite(bitmap: &RgbaImage, coverage: &GrayImage) -> Result<RgbaImage> {
    if bitmap.dimensions() != coverage.dimensions() {
        return Err(MaskError::RenderContext(format!(
            "coverage {:?} does not match bitmap {:?}",
            coverage.dimensions(),
            bitmap.dimensions()
        )));
    }

    Ok(RgbaImage::from_fn(bitmap.width(), bitmap.height(), |x, y| {
        let cover = coverage.get_pixel(x, y)[0];
        if cover == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let Rgba([r, g, b, a]) = *bitmap.get_pixel(x, y);
        Rgba([r, g, b, a.min(cover)])
    }))
}

/// White canvas the size of `composited`, with the `bounds` region recoloured:
/// opaque pixels become black, transparent ones white.
pub fn recolor(composited: &RgbaImage, bounds: BoundingBox) -> RgbaImage {
    let (width, height) = composited.dimensions();
    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

    let region = imageops::crop_imm(composited, bounds.x, bounds.y, bounds.width, bounds.height).to_image();
    let recolored = RgbaImage::from_fn(region.width(), region.height(), |x, y| {
        if region.get_pixel(x, y)[3] > 0 { SUBJECT } else { BACKGROUND }
    });

    imageops::replace(&mut canvas, &recolored, bounds.x as i64, bounds.y as i64);
    canvas
}

/// Stateless renderer from `(bitmap, outline)` to the two-tone cutout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compositor;

impl Compositor {
    /// `Ok(None)` means the outline selects nothing; not an error.
    pub fn render(&self, bitmap: &RgbaImage, outline: &TracedOutline) -> Result<Option<RenderedImage>> {
        let (width, height) = bitmap.dimensions();
        if width == 0 || height == 0 {
            return Err(MaskError::RenderContext(format!(
                "bitmap has no drawable area ({width}x{height})"
            )));
        }

        let coverage = rasterize(outline, width, height)?;
        let composited = composite(bitmap, &coverage)?;

        let Some(bounds) = BoundingBox::of_opaque(&composited) else {
            debug!("outline selects no opaque pixels");
            return Ok(None);
        };

        debug!(?bounds, "trimmed cutout");
        Ok(Some(RenderedImage {
            image: recolor(&composited, bounds),
            bounds,
        }))
    }
}
