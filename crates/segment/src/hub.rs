//! Fan-out of collaborator results to subscribers.
//!
//! Each subscriber owns a [`Subscription`]; dropping it removes the
//! registration, so a torn-down session can never receive another event.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{prompt::PromptId, session::InferenceResponse};

/// Results delivered by the embedding and inference collaborators.
#[derive(Debug, Clone)]
pub enum InferenceEvent {
    /// Base64 embedding payload for image generation `epoch`
    Embedding { epoch: u64, payload: String },
    Mask(InferenceResponse),
    Failed { prompt: PromptId, reason: String },
}

#[derive(Debug, Default)]
pub struct ResponseHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<InferenceEvent>>>,
}

impl ResponseHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().insert(id, tx);
        debug!(id, "subscriber registered");
        Subscription {
            id,
            hub: Arc::clone(self),
            receiver: rx,
        }
    }

    /// Deliver `event` to every live subscriber. Returns how many received it.
    pub fn publish(&self, event: InferenceEvent) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
        trace!(delivered = subscribers.len(), "event published");
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn unsubscribe(&self, id: u64) {
        if self.lock().remove(&id).is_some() {
            debug!(id, "subscriber removed");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, mpsc::UnboundedSender<InferenceEvent>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live registration with a [`ResponseHub`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    hub: Arc<ResponseHub>,
    receiver: mpsc::UnboundedReceiver<InferenceEvent>,
}

impl Subscription {
    /// Next event. Never `None` while the subscription is registered.
    pub async fn recv(&mut self) -> Option<InferenceEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<InferenceEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
