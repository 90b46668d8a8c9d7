use std::{
    fs,
    path::{Path, PathBuf},
};

use image::RgbaImage;
use mask::{BoundingBox, Compositor, MaskError, RawMask, RenderedImage, TracedOutline};
use segment::{EmbeddingRequest, ScaleParameters, SessionConfig, SessionError};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum CutoutError {
    #[error(transparent)]
    Mask(#[from] MaskError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Image has no pixels: {0}")]
    EmptyImage(PathBuf),
}

pub type Result<T> = std::result::Result<T, CutoutError>;

/// Default configuration unless a file is given.
pub fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    Ok(match path {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    })
}

pub fn load_bitmap(path: &Path) -> Result<RgbaImage> {
    let bitmap = image::open(path)?.to_rgba8();
    if bitmap.width() == 0 || bitmap.height() == 0 {
        return Err(CutoutError::EmptyImage(path.to_path_buf()));
    }
    Ok(bitmap)
}

/// Read a packed little-endian `f32` mask dump.
pub fn read_mask(path: &Path, width: u32, height: u32) -> Result<RawMask> {
    let bytes = fs::read(path)?;
    Ok(RawMask::from_le_bytes(width, height, &bytes)?)
}

/// Write the raster the embedding collaborator would receive.
pub fn write_upload(bitmap: &RgbaImage, config: &SessionConfig, output: &Path) -> Result<EmbeddingRequest> {
    let scale = config.scale.resolve(bitmap.width(), bitmap.height());
    let request = EmbeddingRequest::from_bitmap(0, bitmap, &scale)?;
    fs::write(output, &request.pixel_bytes)?;
    Ok(request)
}

/// Traced outline and cutout for one mask over one bitmap.
#[derive(Debug)]
pub struct Cutout {
    pub scale: ScaleParameters,
    pub outline: TracedOutline,
    pub rendered: Option<RenderedImage>,
}

#[derive(Debug, Serialize)]
pub struct CutoutSummary {
    pub scale: ScaleParameters,
    pub shapes: usize,
    pub points: usize,
    pub bounds: Option<BoundingBox>,
}

impl Cutout {
    pub fn render(bitmap: &RgbaImage, mask: &RawMask, config: &SessionConfig) -> Result<Self> {
        let scale = config.scale.resolve(bitmap.width(), bitmap.height());
        let expected = scale.upload_dimensions();
        if (mask.width(), mask.height()) != expected {
            warn!(
                mask = ?(mask.width(), mask.height()),
                ?expected,
                "mask size differs from the upload raster; outline may be misaligned"
            );
        }

        let outline = config.tracer.build_tracer().trace(mask, scale.display_scale())?;
        let rendered = Compositor.render(bitmap, &outline)?;
        Ok(Self { scale, outline, rendered })
    }

    pub fn summary(&self) -> CutoutSummary {
        CutoutSummary {
            scale: self.scale,
            shapes: self.outline.shapes.len(),
            points: self.outline.point_count(),
            bounds: self.rendered.as_ref().map(|r| r.bounds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_read_mask_checks_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.bin");
        let bytes: Vec<u8> = [1.0f32, -1.0, 1.0, -1.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(&path, &bytes).unwrap();

        let mask = read_mask(&path, 2, 2).unwrap();
        assert_eq!(mask.foreground_count(0.0), 2);
        assert!(matches!(read_mask(&path, 3, 2), Err(CutoutError::Mask(_))));
    }

    #[test]
    fn test_render_summary() {
        let bitmap = RgbaImage::from_pixel(1024, 256, Rgba([1, 2, 3, 255]));
        let mask = RawMask::from_fn(1024, 256, |x, y| if x < 8 && y < 4 { 1.0 } else { -1.0 });
        let cutout = Cutout::render(&bitmap, &mask, &SessionConfig::default()).unwrap();

        let summary = cutout.summary();
        assert_eq!(summary.shapes, 1);
        assert_eq!(summary.points, 4);
        assert_eq!(summary.bounds, Some(BoundingBox { x: 0, y: 0, width: 8, height: 4 }));
    }

    #[test]
    fn test_render_nothing_selected() {
        let bitmap = RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 255]));
        let mask = RawMask::from_fn(16, 16, |_, _| -1.0);
        let cutout = Cutout::render(&bitmap, &mask, &SessionConfig::default()).unwrap();
        assert!(cutout.rendered.is_none());
        assert!(cutout.summary().bounds.is_none());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), SessionConfig::default());
    }
}
