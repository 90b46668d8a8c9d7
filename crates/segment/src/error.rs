use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Mask(#[from] mask::MaskError),

    #[error("Malformed embedding: expected {expected} bytes, got {actual}")]
    MalformedEmbedding { expected: usize, actual: usize },

    #[error("Embedding payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("No image loaded")]
    NoImage,

    #[error("Bitmap has no drawable area ({width}x{height})")]
    EmptyBitmap { width: u32, height: u32 },

    #[error("Collaborator failed: {0}")]
    Backend(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Unsupported config format. Please use .toml or .json files")]
    UnsupportedConfigFormat,
}

pub type Result<T> = std::result::Result<T, SessionError>;
