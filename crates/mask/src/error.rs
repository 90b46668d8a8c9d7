use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Mask shape mismatch: {width}x{height} needs {expected} values, got {actual}")]
    MaskShape {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Rendering context unavailable: {0}")]
    RenderContext(String),

    #[error("Geometric computation error: {0}")]
    GeometricComputation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, MaskError>;
