use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Long edge of the raster sent for embedding extraction.
pub const UPLOAD_SIZE: f64 = 1024.0;
/// Short-edge target of the model's working resolution.
pub const TARGET_SIZE: f64 = 500.0;
/// Cap on the model's working resolution.
pub const MAX_EDGE: f64 = 1333.0;

/// Linear factors between the original bitmap, the upload-resized raster and
/// the model's working resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScaleParameters {
    pub upload_scale: f64,
    pub model_scale: f64,
    pub onnx_scale: f64,
    pub mask_width: f64,
    pub mask_height: f64,
    pub width: u32,
    pub height: u32,
}

impl ScaleParameters {
    /// Resolve with the reference limits.
    pub fn resolve(width: u32, height: u32) -> Self {
        ScaleResolver::default().resolve(width, height)
    }

    /// Display pixels per upload (mask) cell.
    pub fn display_scale(&self) -> f64 {
        1.0 / self.upload_scale
    }

    /// Rounded size of the upload raster, never below 1x1.
    pub fn upload_dimensions(&self) -> (u32, u32) {
        (
            self.mask_width.round().max(1.0) as u32,
            self.mask_height.round().max(1.0) as u32,
        )
    }

    /// Map a display-space point into model space.
    pub fn to_model(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.onnx_scale, y * self.onnx_scale)
    }
}

/// Target sizes used to derive [`ScaleParameters`]. The defaults are the
/// values the inference collaborator expects; change them only together with
/// the model export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScaleResolver {
    pub upload_size: f64,
    pub target_size: f64,
    pub max_edge: f64,
}

impl Default for ScaleResolver {
    fn default() -> Self {
        Self {
            upload_size: UPLOAD_SIZE,
            target_size: TARGET_SIZE,
            max_edge: MAX_EDGE,
        }
    }
}

impl ScaleResolver {
    /// Callers reject zero-sized bitmaps before resolving.
    pub fn resolve(&self, width: u32, height: u32) -> ScaleParameters {
        let (w, h) = (width as f64, height as f64);
        let upload_scale = self.upload_size / w.max(h);

        let d = w.min(h);
        let mut model_scale = self.target_size / d;
        if model_scale * d > self.max_edge {
            model_scale = self.max_edge / d;
        }

        ScaleParameters {
            upload_scale,
            model_scale,
            onnx_scale: model_scale / upload_scale,
            mask_width: w * upload_scale,
            mask_height: h * upload_scale,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_scenario() {
        let scale = ScaleParameters::resolve(2000, 1000);
        assert_eq!(scale.upload_scale, 0.512);
        assert_eq!(scale.model_scale, 0.5);
        assert!((scale.onnx_scale - 0.9765625).abs() < 1e-12);
        assert!((scale.mask_width - 1024.0).abs() < 1e-9);
        assert!((scale.mask_height - 512.0).abs() < 1e-9);
        assert_eq!(scale.upload_dimensions(), (1024, 512));
        assert!((scale.display_scale() - 1.953125).abs() < 1e-12);
    }

    #[test]
    fn test_invariants_over_many_sizes() {
        for &(w, h) in &[(1, 1), (3, 7000), (640, 480), (480, 640), (1333, 1), (4096, 4096), (500, 501)] {
            let s = ScaleParameters::resolve(w, h);
            assert!((s.onnx_scale - s.model_scale / s.upload_scale).abs() < 1e-9);
            assert!(s.model_scale * (w.min(h) as f64) <= MAX_EDGE + 1e-9);
            assert!((w.max(h) as f64 * s.upload_scale - UPLOAD_SIZE).abs() < 1e-9);
        }
    }

    #[test]
    fn test_clamp_applies_when_target_exceeds_cap() {
        let resolver = ScaleResolver { target_size: 2000.0, ..ScaleResolver::default() };
        let s = resolver.resolve(800, 600);
        assert_eq!(s.model_scale, MAX_EDGE / 600.0);
    }

    #[test]
    fn test_to_model() {
        let s = ScaleParameters::resolve(1024, 1024);
        assert_eq!(s.upload_scale, 1.0);
        assert_eq!(s.to_model(100.0, 50.0), (100.0 * s.onnx_scale, 50.0 * s.onnx_scale));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ScaleParameters::resolve(2000, 1000)).unwrap();
        for key in ["uploadScale", "modelScale", "onnxScale", "maskWidth", "maskHeight", "width", "height"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
