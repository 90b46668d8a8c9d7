use image::GrayImage;
use crate::{error::Result, types::{ComplexShape, Ring}};

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract closed rings, in mask-grid units, from a binary image
    /// where non-zero pixels are foreground
    fn extract_contours(&self, binary: &GrayImage) -> Result<Vec<Ring>>;
}

/// Trait for hole detection algorithms
pub trait HoleDetector: Send + Sync {
    /// Group rings into shapes, attaching holes to their exteriors
    fn detect_holes(&self, rings: Vec<Ring>) -> Result<Vec<ComplexShape>>;
}

/// Trait for shape post-processing algorithms
pub trait ShapePostProcessor: Send + Sync {
    /// Post-process the extracted shapes. Shapes left with an empty
    /// exterior are dropped by the tracer.
    fn process(&self, shapes: &mut [ComplexShape]) -> Result<()>;
}
