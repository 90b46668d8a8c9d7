pub mod builder;

use tracing::debug;
use crate::{
    error::{MaskError, Result},
    raw::RawMask,
    types::TracedOutline,
    traits::{ContourExtractor, HoleDetector, ShapePostProcessor},
};

/// Turns a raw model mask into closed outlines in display coordinates.
///
/// Stages run in order: threshold, contour extraction, hole grouping,
/// post-processing (in mask-grid units), then scaling to display space.
pub struct MaskTracer {
    threshold: f32,
    contour_extractor: Box<dyn ContourExtractor>,
    hole_detector: Box<dyn HoleDetector>,
    postprocessors: Vec<Box<dyn ShapePostProcessor>>,
}

impl MaskTracer {
    /// Create a new tracer builder
    pub fn builder() -> builder::MaskTracerBuilder {
        builder::MaskTracerBuilder::new()
    }

    pub fn new(
        threshold: f32,
        contour_extractor: Box<dyn ContourExtractor>,
        hole_detector: Box<dyn HoleDetector>,
        postprocessors: Vec<Box<dyn ShapePostProcessor>>,
    ) -> Self {
        Self {
            threshold,
            contour_extractor,
            hole_detector,
            postprocessors,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Trace `mask`, mapping mask cells to display pixels by `display_scale`.
    pub fn trace(&self, mask: &RawMask, display_scale: f64) -> Result<TracedOutline> {
        if !display_scale.is_finite() || display_scale <= 0.0 {
            return Err(MaskError::GeometricComputation(format!(
                "display scale must be positive and finite, got {display_scale}"
            )));
        }

        let binary = mask.to_binary_image(self.threshold);
        let rings = self.contour_extractor.extract_contours(&binary)?;
        let mut shapes = self.hole_detector.detect_holes(rings)?;

        for postprocessor in &self.postprocessors {
            postprocessor.process(&mut shapes)?;
        }

        shapes.retain(|shape| !shape.exterior.is_empty());
        for shape in &mut shapes {
            shape.scale(display_scale);
        }

        let outline = TracedOutline {
            shapes,
            mask_width: mask.width(),
            mask_height: mask.height(),
            display_scale,
        };
        debug!(
            shapes = outline.shapes.len(),
            points = outline.point_count(),
            "traced {}x{} mask",
            mask.width(),
            mask.height()
        );
        Ok(outline)
    }

    /// Get information about the tracer configuration
    pub fn info(&self) -> String {
        format!(
            "MaskTracer: threshold {}, 1 contour extractor, 1 hole detector, {} postprocessors",
            self.threshold,
            self.postprocessors.len()
        )
    }
}

impl Default for MaskTracer {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for MaskTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{ImageprocContourExtractor, NoHoleDetector};

    fn square_mask(size: u32, from: u32, to: u32) -> RawMask {
        RawMask::from_fn(size, size, |x, y| {
            if (from..to).contains(&x) && (from..to).contains(&y) { 4.0 } else { -4.0 }
        })
    }

    #[test]
    fn test_all_background_traces_nothing() {
        let mask = RawMask::from_fn(16, 16, |_, _| -1.0);
        let outline = MaskTracer::default().trace(&mask, 2.0).unwrap();
        assert!(outline.is_empty());
        assert_eq!(outline.mask_width, 16);
    }

    #[test]
    fn test_single_square_scaled_to_display() {
        let outline = MaskTracer::default().trace(&square_mask(10, 2, 6), 2.0).unwrap();
        assert_eq!(outline.shapes.len(), 1);
        assert_eq!(
            outline.shapes[0].exterior,
            vec![[4.0, 4.0], [12.0, 4.0], [12.0, 12.0], [4.0, 12.0]]
        );
        assert_eq!(outline.shapes[0].area(), 64.0);
    }

    #[test]
    fn test_ring_with_hole() {
        let mask = RawMask::from_fn(12, 12, |x, y| {
            let outer = (1..11).contains(&x) && (1..11).contains(&y);
            let inner = (4..8).contains(&x) && (4..8).contains(&y);
            if outer && !inner { 1.0 } else { 0.0 }
        });
        let outline = MaskTracer::default().trace(&mask, 1.0).unwrap();
        assert_eq!(outline.shapes.len(), 1);
        assert_eq!(outline.shapes[0].holes.len(), 1);
        assert_eq!(outline.shapes[0].area(), 84.0);
    }

    #[test]
    fn test_disjoint_regions() {
        let mask = RawMask::from_fn(20, 10, |x, y| {
            let left = (1..4).contains(&x) && (1..4).contains(&y);
            let right = (10..15).contains(&x) && (2..8).contains(&y);
            if left || right { 0.9 } else { -0.9 }
        });
        let outline = MaskTracer::default().trace(&mask, 1.0).unwrap();
        assert_eq!(outline.shapes.len(), 2);
    }

    #[test]
    fn test_trace_is_deterministic() {
        let mask = RawMask::from_fn(32, 32, |x, y| {
            let dx = x as f32 - 15.5;
            let dy = y as f32 - 15.5;
            10.0 - (dx * dx + dy * dy).sqrt()
        });
        let tracer = MaskTracer::default();
        assert_eq!(tracer.trace(&mask, 1.5).unwrap(), tracer.trace(&mask, 1.5).unwrap());
    }

    #[test]
    fn test_rejects_bad_scale() {
        let mask = square_mask(4, 1, 3);
        assert!(MaskTracer::default().trace(&mask, 0.0).is_err());
        assert!(MaskTracer::default().trace(&mask, f64::NAN).is_err());
    }

    #[test]
    fn test_alternative_components() {
        let tracer = MaskTracer::builder()
            .set_contour_extractor(ImageprocContourExtractor)
            .set_hole_detector(NoHoleDetector)
            .build();
        let outline = tracer.trace(&square_mask(10, 2, 6), 1.0).unwrap();
        assert_eq!(outline.shapes.len(), 1);
        let (min, max) = outline.shapes[0].bounding_box();
        assert_eq!(min, [2.5, 2.5]);
        assert_eq!(max, [5.5, 5.5]);
    }
}
