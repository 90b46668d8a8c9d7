use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbaImage, imageops::{self, FilterType}};
use tracing::debug;

use crate::{
    error::{Result, SessionError},
    scale::ScaleParameters,
};

/// Tensor shape of an image embedding.
pub const EMBEDDING_SHAPE: [usize; 4] = [1, 256, 64, 64];
pub const EMBEDDING_LEN: usize = EMBEDDING_SHAPE[0] * EMBEDDING_SHAPE[1] * EMBEDDING_SHAPE[2] * EMBEDDING_SHAPE[3];
pub const EMBEDDING_BYTES: usize = EMBEDDING_LEN * std::mem::size_of::<f32>();

/// Image features computed once per bitmap and shared by every prompt.
#[derive(Clone, PartialEq)]
pub struct Embedding {
    id: u64,
    data: Vec<f32>,
}

impl std::fmt::Debug for Embedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedding")
            .field("id", &self.id)
            .field("shape", &EMBEDDING_SHAPE)
            .finish()
    }
}

impl Embedding {
    /// Decode a packed little-endian `f32` tensor. The length is checked
    /// before anything is allocated.
    pub fn from_le_bytes(id: u64, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != EMBEDDING_BYTES {
            return Err(SessionError::MalformedEmbedding {
                expected: EMBEDDING_BYTES,
                actual: bytes.len(),
            });
        }
        let data = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { id, data })
    }

    /// Decode the base64 payload returned by the embedding collaborator.
    pub fn from_base64(id: u64, payload: &str) -> Result<Self> {
        let bytes = STANDARD.decode(payload.trim())?;
        Self::from_le_bytes(id, &bytes)
    }

    /// Identifier echoed to the inference collaborator.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn shape(&self) -> [usize; 4] {
        EMBEDDING_SHAPE
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at `[0, channel, y, x]`.
    pub fn get(&self, channel: usize, y: usize, x: usize) -> Option<f32> {
        let [_, channels, rows, cols] = EMBEDDING_SHAPE;
        if channel >= channels || y >= rows || x >= cols {
            return None;
        }
        self.data.get((channel * rows + y) * cols + x).copied()
    }
}

/// Encode values the way the embedding collaborator does.
pub fn encode_base64(values: &[f32]) -> String {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

/// Upload-resized raster for the embedding collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRequest {
    /// Image generation the request belongs to
    pub epoch: u64,
    pub pixel_bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl EmbeddingRequest {
    pub fn from_bitmap(epoch: u64, bitmap: &RgbaImage, scale: &ScaleParameters) -> Result<Self> {
        let (width, height) = scale.upload_dimensions();
        let resized = imageops::resize(bitmap, width, height, FilterType::Triangle);

        let mut pixel_bytes = Vec::new();
        resized.write_to(&mut Cursor::new(&mut pixel_bytes), ImageFormat::Png)?;
        debug!(epoch, width, height, bytes = pixel_bytes.len(), "prepared embedding upload");

        Ok(Self {
            epoch,
            pixel_bytes,
            mime_type: ImageFormat::Png.to_mime_type().to_string(),
            width,
            height,
        })
    }
}
