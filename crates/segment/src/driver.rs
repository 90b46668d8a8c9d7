//! Async event loop that owns an [`EditorSession`] and talks to the
//! embedding and inference collaborators.

use std::{future::Future, sync::Arc};

use image::RgbaImage;
use mask::RawMask;
use strum::AsRefStr;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    embedding::EmbeddingRequest,
    error::Result,
    hub::{InferenceEvent, ResponseHub, Subscription},
    prompt::Prompt,
    session::{EditorSession, InferenceResponse, PromptOutcome, SessionSnapshot},
};

/// The two remote collaborators: embedding extraction and mask inference.
pub trait SegmentationBackend: Send + Sync + 'static {
    /// Returns the base64 embedding payload for the upload raster.
    fn extract_embedding(&self, request: EmbeddingRequest) -> impl Future<Output = Result<String>> + Send;

    /// Returns the raw mask at upload resolution.
    fn infer(&self, prompt: Prompt) -> impl Future<Output = Result<RawMask>> + Send;
}

#[derive(Debug, AsRefStr)]
pub enum SessionCommand {
    LoadImage,
    ImageDecoded(RgbaImage),
    Click { x: f64, y: f64 },
    Undo,
    Clear,
    Shutdown,
}

pub struct SessionDriver<B> {
    session: EditorSession,
    backend: Arc<B>,
    hub: Arc<ResponseHub>,
    subscription: Subscription,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl<B: SegmentationBackend> SessionDriver<B> {
    pub fn new(
        session: EditorSession,
        backend: Arc<B>,
        hub: &Arc<ResponseHub>,
    ) -> (Self, watch::Receiver<SessionSnapshot>) {
        let (snapshots, receiver) = watch::channel(session.snapshot());
        let driver = Self {
            session,
            backend,
            hub: Arc::clone(hub),
            subscription: hub.subscribe(),
            snapshots,
        };
        (driver, receiver)
    }

    /// Runs until `Shutdown` or until every command sender is gone. The
    /// hub registration is released before the session is handed back.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) -> EditorSession {
        info!("session driver started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.subscription.recv() => self.handle_event(event),
            }
            self.publish_snapshot();
        }
        info!("session driver stopped");

        let Self { session, subscription, .. } = self;
        drop(subscription);
        session
    }

    fn handle_command(&mut self, command: SessionCommand) {
        debug!(command = command.as_ref(), "command");
        match command {
            SessionCommand::LoadImage => self.session.begin_image_load(),
            SessionCommand::ImageDecoded(bitmap) => match self.session.image_decoded(bitmap) {
                Ok(request) => self.request_embedding(request),
                Err(e) => warn!(error = %e, "image rejected"),
            },
            SessionCommand::Click { x, y } => match self.session.add_click(x, y) {
                Ok(outcome) => self.dispatch(outcome),
                Err(e) => warn!(error = %e, "click ignored"),
            },
            SessionCommand::Undo => {
                let outcome = self.session.undo();
                self.dispatch(outcome);
            }
            SessionCommand::Clear => self.session.clear(),
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: InferenceEvent) {
        match event {
            InferenceEvent::Embedding { epoch, payload } => {
                match self.session.embedding_received(epoch, &payload) {
                    Ok(Some(prompt)) => self.request_mask(prompt),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "embedding rejected"),
                }
            }
            InferenceEvent::Mask(response) => {
                if let Err(e) = self.session.apply_response(response) {
                    warn!(error = %e, "mask could not be applied");
                }
            }
            InferenceEvent::Failed { prompt, .. } => self.session.prompt_failed(prompt),
        }
    }

    fn dispatch(&self, outcome: PromptOutcome) {
        if let PromptOutcome::Issued(prompt) = outcome {
            self.request_mask(prompt);
        }
    }

    fn request_embedding(&self, request: EmbeddingRequest) {
        let backend = Arc::clone(&self.backend);
        let hub = Arc::clone(&self.hub);
        tokio::spawn(async move {
            let epoch = request.epoch;
            match backend.extract_embedding(request).await {
                Ok(payload) => {
                    hub.publish(InferenceEvent::Embedding { epoch, payload });
                }
                Err(e) => warn!(epoch, error = %e, "embedding extraction failed"),
            }
        });
    }

    fn request_mask(&self, prompt: Prompt) {
        let backend = Arc::clone(&self.backend);
        let hub = Arc::clone(&self.hub);
        tokio::spawn(async move {
            let id = prompt.id;
            let event = match backend.infer(prompt).await {
                Ok(mask) => InferenceEvent::Mask(InferenceResponse { prompt: id, mask }),
                Err(e) => InferenceEvent::Failed {
                    prompt: id,
                    reason: e.to_string(),
                },
            };
            hub.publish(event);
        });
    }

    fn publish_snapshot(&self) {
        let snapshot = self.session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}
