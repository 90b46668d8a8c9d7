use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::error::{MaskError, Result};

/// Cells with a value strictly above this are foreground.
pub const FOREGROUND_THRESHOLD: f32 = 0.0;

/// Per-cell model output (logits or probabilities) at mask resolution, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMaskParts")]
pub struct RawMask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct RawMaskParts {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl TryFrom<RawMaskParts> for RawMask {
    type Error = MaskError;

    fn try_from(parts: RawMaskParts) -> Result<Self> {
        RawMask::new(parts.width, parts.height, parts.values)
    }
}

impl RawMask {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(MaskError::MaskShape {
                width,
                height,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { width, height, values })
    }

    /// Build a mask by evaluating `f(x, y)` for every cell.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> Self {
        let mut values = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        Self { width, height, values }
    }

    /// Decode a packed little-endian `f32` buffer.
    pub fn from_le_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if bytes.len() != expected * 4 {
            return Err(MaskError::MaskShape {
                width,
                height,
                expected,
                actual: bytes.len() / 4,
            });
        }
        let values = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { width, height, values })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn is_foreground(&self, x: u32, y: u32, threshold: f32) -> bool {
        self.get(x, y).is_some_and(|v| v > threshold)
    }

    pub fn foreground_count(&self, threshold: f32) -> usize {
        self.values.iter().filter(|&&v| v > threshold).count()
    }

    /// Binary image with 255 for foreground cells and 0 elsewhere.
    pub fn to_binary_image(&self, threshold: f32) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.is_foreground(x, y, threshold) {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }
}
