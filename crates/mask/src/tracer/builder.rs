use crate::{
    raw::FOREGROUND_THRESHOLD,
    tracer::MaskTracer,
    traits::{ContourExtractor, HoleDetector, ShapePostProcessor},
    algorithms::{
        CrackEdgeContourExtractor,
        ContainmentHoleDetector,
        DouglasPeuckerSimplifier,
        GeometryValidator,
        MinimumAreaFilter,
    },
};

/// Builder for creating mask tracers with a fluent API
pub struct MaskTracerBuilder {
    threshold: f32,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
    hole_detector: Option<Box<dyn HoleDetector>>,
    postprocessors: Vec<Box<dyn ShapePostProcessor>>,
}

impl MaskTracerBuilder {
    pub fn new() -> Self {
        Self {
            threshold: FOREGROUND_THRESHOLD,
            contour_extractor: None,
            hole_detector: None,
            postprocessors: Vec::new(),
        }
    }

    /// Cells with a value strictly above `threshold` count as foreground
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Set the hole detector (replaces any existing one)
    pub fn set_hole_detector<H>(mut self, detector: H) -> Self
    where
        H: HoleDetector + 'static,
    {
        self.hole_detector = Some(Box::new(detector));
        self
    }

    /// Add a post-processor to the tracer
    pub fn add_postprocessor<P>(mut self, postprocessor: P) -> Self
    where
        P: ShapePostProcessor + 'static,
    {
        self.postprocessors.push(Box::new(postprocessor));
        self
    }

    /// Add Douglas-Peucker simplification, tolerance in mask cells
    pub fn with_simplification(self, tolerance: f64) -> Self {
        self.add_postprocessor(DouglasPeuckerSimplifier { tolerance })
    }

    /// Drop specks smaller than `min_area` square cells
    pub fn with_minimum_area(self, min_area: f64) -> Self {
        self.add_postprocessor(MinimumAreaFilter { min_area })
    }

    /// Add geometry validation as a post-processing step
    pub fn with_validation(self) -> Self {
        self.add_postprocessor(GeometryValidator)
    }

    /// Build the tracer with default components if not specified
    pub fn build(self) -> MaskTracer {
        let contour_extractor = self
            .contour_extractor
            .unwrap_or_else(|| Box::new(CrackEdgeContourExtractor));

        let hole_detector = self
            .hole_detector
            .unwrap_or_else(|| Box::new(ContainmentHoleDetector));

        MaskTracer::new(
            self.threshold,
            contour_extractor,
            hole_detector,
            self.postprocessors,
        )
    }
}

impl Default for MaskTracerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
