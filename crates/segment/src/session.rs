//! The editing session: owns the bitmap, embedding, click history and the
//! derived mask, outline and cutout, and recomputes them as events arrive.

use std::{collections::BTreeSet, sync::Arc};

use image::RgbaImage;
use mask::{BoundingBox, Compositor, MaskTracer, RawMask, RenderedImage, TracedOutline};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info, warn};

use crate::{
    config::SessionConfig,
    embedding::{Embedding, EmbeddingRequest},
    error::{Result, SessionError},
    history::ClickHistory,
    prompt::{Prompt, PromptBuilder, PromptId},
    scale::{ScaleParameters, ScaleResolver},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoImage,
    ImageLoading,
    EmbeddingPending,
    Ready,
    Prompting,
}

/// What the caller should do after a click-history mutation.
#[derive(Debug, Clone)]
pub enum PromptOutcome {
    /// Send this prompt to the inference collaborator
    Issued(Prompt),
    /// History is empty; mask and output were cleared
    Cleared,
    /// Recorded; a prompt goes out once the embedding arrives
    Deferred,
    /// Nothing changed (undo with no clicks)
    Unchanged,
}

/// A mask produced by the inference collaborator for one prompt.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub prompt: PromptId,
    pub mask: RawMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Mask applied; `selected` is false when the mask selects nothing
    Applied { selected: bool },
    /// Response belongs to an abandoned click sequence and was dropped
    Stale,
}

/// Summary of the session for observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub clicks: usize,
    pub cached_masks: usize,
    pub outstanding_prompts: usize,
    pub bounds: Option<BoundingBox>,
}

pub struct EditorSession {
    resolver: ScaleResolver,
    tracer: MaskTracer,
    compositor: Compositor,

    image_loading: bool,
    image_epoch: u64,
    click_epoch: u64,

    bitmap: Option<RgbaImage>,
    scale: Option<ScaleParameters>,
    embedding: Option<Arc<Embedding>>,
    history: ClickHistory,
    prompts: PromptBuilder,
    outstanding: BTreeSet<PromptId>,

    raw_mask: Option<Arc<RawMask>>,
    outline: Option<TracedOutline>,
    rendered: Option<RenderedImage>,
}

impl EditorSession {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            resolver: config.scale,
            tracer: config.tracer.build_tracer(),
            compositor: Compositor,
            image_loading: false,
            image_epoch: 0,
            click_epoch: 0,
            bitmap: None,
            scale: None,
            embedding: None,
            history: ClickHistory::new(),
            prompts: PromptBuilder::new(),
            outstanding: BTreeSet::new(),
            raw_mask: None,
            outline: None,
            rendered: None,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.image_loading {
            SessionState::ImageLoading
        } else if self.bitmap.is_none() {
            SessionState::NoImage
        } else if self.embedding.is_none() {
            SessionState::EmbeddingPending
        } else if !self.outstanding.is_empty() {
            SessionState::Prompting
        } else {
            SessionState::Ready
        }
    }

    /// True until both the bitmap and its embedding are available.
    pub fn is_loading(&self) -> bool {
        self.bitmap.is_none() || self.embedding.is_none()
    }

    /// Start loading a new image, discarding everything tied to the old one.
    pub fn begin_image_load(&mut self) {
        self.image_epoch += 1;
        self.bitmap = None;
        self.scale = None;
        self.embedding = None;
        self.history.clear();
        self.abandon_clicks();
        self.image_loading = true;
        info!(image_epoch = self.image_epoch, "loading image");
    }

    /// Accept the decoded bitmap and produce the embedding request for it.
    pub fn image_decoded(&mut self, bitmap: RgbaImage) -> Result<EmbeddingRequest> {
        if !self.image_loading {
            self.begin_image_load();
        }
        self.image_loading = false;

        let (width, height) = bitmap.dimensions();
        if width == 0 || height == 0 {
            warn!(width, height, "rejecting empty bitmap");
            return Err(SessionError::EmptyBitmap { width, height });
        }

        let scale = self.resolver.resolve(width, height);
        let request = EmbeddingRequest::from_bitmap(self.image_epoch, &bitmap, &scale)?;
        self.scale = Some(scale);
        self.bitmap = Some(bitmap);
        info!(width, height, upload_scale = scale.upload_scale, "image decoded, awaiting embedding");
        Ok(request)
    }

    /// Decode and install the embedding payload for image generation `epoch`.
    /// A malformed payload is rejected and the session stays in
    /// `EmbeddingPending`.
    pub fn embedding_received(&mut self, epoch: u64, payload: &str) -> Result<Option<Prompt>> {
        if epoch != self.image_epoch {
            debug!(epoch, current = self.image_epoch, "dropping embedding for a replaced image");
            return Ok(None);
        }
        let embedding = Embedding::from_base64(epoch, payload).inspect_err(|e| {
            warn!(error = %e, "rejecting embedding payload");
        })?;
        self.set_embedding(embedding)
    }

    /// Install a decoded embedding. Clicks recorded while it was pending are
    /// sent as the first prompt.
    pub fn set_embedding(&mut self, embedding: Embedding) -> Result<Option<Prompt>> {
        if embedding.id() != self.image_epoch || self.bitmap.is_none() {
            debug!(id = embedding.id(), "dropping embedding without a matching bitmap");
            return Ok(None);
        }
        self.embedding = Some(Arc::new(embedding));
        info!("embedding ready");

        match self.refresh_prompt() {
            PromptOutcome::Issued(prompt) => Ok(Some(prompt)),
            _ => Ok(None),
        }
    }

    pub fn add_click(&mut self, x: f64, y: f64) -> Result<PromptOutcome> {
        if self.bitmap.is_none() {
            return Err(SessionError::NoImage);
        }
        self.history.add(x, y);
        debug!(x, y, clicks = self.history.len(), "click added");
        Ok(self.refresh_prompt())
    }

    pub fn undo(&mut self) -> PromptOutcome {
        if self.history.undo().is_none() {
            return PromptOutcome::Unchanged;
        }
        debug!(clicks = self.history.len(), "click undone");
        self.refresh_prompt()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.abandon_clicks();
        debug!("clicks cleared");
    }

    /// Apply a mask in arrival order; the newest applied mask wins.
    pub fn apply_response(&mut self, response: InferenceResponse) -> Result<ResponseOutcome> {
        if response.prompt.epoch != self.click_epoch {
            debug!(prompt = ?response.prompt, "dropping response for abandoned clicks");
            return Ok(ResponseOutcome::Stale);
        }
        self.outstanding.remove(&response.prompt);

        let mask = Arc::new(response.mask);
        self.history.record_mask(Arc::clone(&mask));
        self.raw_mask = Some(mask);
        self.recompute()?;

        Ok(ResponseOutcome::Applied {
            selected: self.rendered.is_some(),
        })
    }

    /// The collaborator gave up on `prompt`; nothing is applied.
    pub fn prompt_failed(&mut self, prompt: PromptId) {
        if self.outstanding.remove(&prompt) {
            warn!(?prompt, "inference failed");
        }
    }

    pub fn scale(&self) -> Option<&ScaleParameters> {
        self.scale.as_ref()
    }

    pub fn bitmap(&self) -> Option<&RgbaImage> {
        self.bitmap.as_ref()
    }

    pub fn embedding(&self) -> Option<&Arc<Embedding>> {
        self.embedding.as_ref()
    }

    pub fn history(&self) -> &ClickHistory {
        &self.history
    }

    pub fn raw_mask(&self) -> Option<&RawMask> {
        self.raw_mask.as_deref()
    }

    pub fn outline(&self) -> Option<&TracedOutline> {
        self.outline.as_ref()
    }

    pub fn rendered(&self) -> Option<&RenderedImage> {
        self.rendered.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            clicks: self.history.len(),
            cached_masks: self.history.prior_masks().len(),
            outstanding_prompts: self.outstanding.len(),
            bounds: self.rendered.as_ref().map(|r| r.bounds),
        }
    }

    fn refresh_prompt(&mut self) -> PromptOutcome {
        if self.history.is_empty() {
            self.abandon_clicks();
            return PromptOutcome::Cleared;
        }
        let (Some(embedding), Some(scale)) = (&self.embedding, &self.scale) else {
            return PromptOutcome::Deferred;
        };

        let prior = self.history.prior_masks().latest();
        match self.prompts.build(self.click_epoch, &self.history, embedding, scale, prior) {
            Some(prompt) => {
                self.outstanding.insert(prompt.id);
                debug!(id = ?prompt.id, clicks = prompt.clicks.len(), "prompt issued");
                PromptOutcome::Issued(prompt)
            }
            None => PromptOutcome::Cleared,
        }
    }

    /// Drop the mask-derived state and ignore responses still in flight.
    fn abandon_clicks(&mut self) {
        self.click_epoch += 1;
        self.outstanding.clear();
        self.raw_mask = None;
        self.outline = None;
        self.rendered = None;
    }

    fn recompute(&mut self) -> Result<()> {
        self.outline = None;
        self.rendered = None;

        let (Some(mask), Some(bitmap), Some(scale)) = (&self.raw_mask, &self.bitmap, &self.scale) else {
            return Ok(());
        };

        let outline = self
            .tracer
            .trace(mask, scale.display_scale())
            .inspect_err(|e| warn!(error = %e, "tracing failed"))?;
        let rendered = self
            .compositor
            .render(bitmap, &outline)
            .inspect_err(|e| warn!(error = %e, "compositing failed"));
        self.outline = Some(outline);
        self.rendered = rendered?;

        match &self.rendered {
            Some(r) => debug!(bounds = ?r.bounds, "cutout updated"),
            None => debug!("mask selects nothing"),
        }
        Ok(())
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}
