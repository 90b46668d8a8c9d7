use std::{fs, path::Path};

use mask::{MaskTracer, algorithms::NoHoleDetector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SessionError},
    scale::ScaleResolver,
};

/// How raw masks are turned into outlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TracerSettings {
    /// Cells strictly above this value are foreground
    pub threshold: f32,
    /// Group nested rings into shapes with holes
    pub detect_holes: bool,
    /// Douglas-Peucker tolerance in mask cells; exact outlines when unset
    #[schemars(range(min = 0.1, max = 10.0))]
    pub simplify_tolerance: Option<f64>,
    /// Drop regions smaller than this many mask cells
    pub min_area: Option<f64>,
}

impl Default for TracerSettings {
    fn default() -> Self {
        Self {
            threshold: mask::FOREGROUND_THRESHOLD,
            detect_holes: true,
            simplify_tolerance: None,
            min_area: None,
        }
    }
}

impl TracerSettings {
    pub fn build_tracer(&self) -> MaskTracer {
        let mut builder = MaskTracer::builder().with_threshold(self.threshold);
        if !self.detect_holes {
            builder = builder.set_hole_detector(NoHoleDetector);
        }
        if let Some(min_area) = self.min_area {
            builder = builder.with_minimum_area(min_area);
        }
        if let Some(tolerance) = self.simplify_tolerance {
            builder = builder.with_simplification(tolerance).with_validation();
        }
        builder.build()
    }
}

/// Session configuration, loadable from TOML or JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    pub scale: ScaleResolver,
    pub tracer: TracerSettings,
}

impl SessionConfig {
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SessionConfig)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path)?),
            Some("json") => Self::from_json(&fs::read_to_string(path)?),
            _ => Err(SessionError::UnsupportedConfigFormat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::{MAX_EDGE, TARGET_SIZE, UPLOAD_SIZE};

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.scale.upload_size, UPLOAD_SIZE);
        assert_eq!(config.scale.target_size, TARGET_SIZE);
        assert_eq!(config.scale.max_edge, MAX_EDGE);
        assert_eq!(config.tracer.threshold, 0.0);
        assert!(config.tracer.detect_holes);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SessionConfig::from_toml(
            r#"
            [tracer]
            simplify_tolerance = 1.5
            detect_holes = false
            "#,
        )
        .unwrap();
        assert_eq!(config.tracer.simplify_tolerance, Some(1.5));
        assert!(!config.tracer.detect_holes);
        assert_eq!(config.scale, ScaleResolver::default());
        assert!(config.tracer.build_tracer().info().contains("2 postprocessors"));
    }

    #[test]
    fn test_json_config() {
        let config = SessionConfig::from_json(r#"{"scale":{"upload_size":512.0}}"#).unwrap();
        assert_eq!(config.scale.upload_size, 512.0);
        assert_eq!(config.scale.max_edge, MAX_EDGE);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(matches!(
            SessionConfig::from_file("session.yaml"),
            Err(SessionError::UnsupportedConfigFormat)
        ));
    }

    #[test]
    fn test_schema_names_sections() {
        let schema = serde_json::to_value(SessionConfig::schema()).unwrap();
        assert!(schema["properties"]["scale"].is_object());
        assert!(schema["properties"]["tracer"].is_object());
    }
}
