//! # Point-prompt segmentation sessions
//!
//! Holds the state of one interactive cutout: the loaded bitmap and its
//! scale factors, the image embedding, the click history with the masks
//! each click produced, and the current outline and cutout.
//!
//! [`EditorSession`] is synchronous and deterministic. [`SessionDriver`]
//! wraps it in a tokio event loop that forwards prompts to a
//! [`SegmentationBackend`] and applies whatever comes back through the
//! [`ResponseHub`].
//!
//! ```rust,no_run
//! use segment::{EditorSession, PromptOutcome};
//!
//! let mut session = EditorSession::default();
//! let request = session.image_decoded(image::open("photo.jpg")?.to_rgba8())?;
//! // upload `request.pixel_bytes`, then hand back the base64 answer
//! # let payload = String::new();
//! session.embedding_received(request.epoch, &payload)?;
//!
//! if let PromptOutcome::Issued(prompt) = session.add_click(420.0, 310.0)? {
//!     println!("{}", prompt.to_json()?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod driver;
pub mod embedding;
pub mod error;
pub mod history;
pub mod hub;
pub mod prompt;
pub mod scale;
pub mod session;

pub use config::{SessionConfig, TracerSettings};
pub use driver::{SegmentationBackend, SessionCommand, SessionDriver};
pub use embedding::{Embedding, EmbeddingRequest};
pub use error::{Result, SessionError};
pub use history::{Click, ClickHistory, PriorMaskCache};
pub use hub::{InferenceEvent, ResponseHub, Subscription};
pub use prompt::{ClickType, ModelClick, Prompt, PromptBuilder, PromptId};
pub use scale::{ScaleParameters, ScaleResolver};
pub use session::{
    EditorSession, InferenceResponse, PromptOutcome, ResponseOutcome, SessionSnapshot, SessionState,
};
