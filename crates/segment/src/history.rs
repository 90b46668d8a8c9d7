use std::sync::Arc;

use mask::RawMask;
use serde::{Deserialize, Serialize};

/// A user click in display (original image) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Click {
    pub x: f64,
    pub y: f64,
}

/// Masks returned by successive inference calls, newest last. The newest
/// entry is fed back into the next prompt.
#[derive(Debug, Clone, Default)]
pub struct PriorMaskCache {
    masks: Vec<Arc<RawMask>>,
}

impl PriorMaskCache {
    pub fn push(&mut self, mask: Arc<RawMask>) {
        self.masks.push(mask);
    }

    /// No-op on an empty cache.
    pub fn pop(&mut self) -> Option<Arc<RawMask>> {
        self.masks.pop()
    }

    pub fn latest(&self) -> Option<&Arc<RawMask>> {
        self.masks.last()
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    fn clear(&mut self) {
        self.masks.clear();
    }
}

/// Ordered clicks plus the mask cache that is unwound with them.
#[derive(Debug, Clone, Default)]
pub struct ClickHistory {
    clicks: Vec<Click>,
    prior_masks: PriorMaskCache,
}

impl ClickHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: f64, y: f64) {
        self.clicks.push(Click { x, y });
    }

    /// Drop the last click, and the cached masks of responses that arrived
    /// for it. Masks of the remaining clicks are kept.
    pub fn undo(&mut self) -> Option<Click> {
        let click = self.clicks.pop()?;
        while self.prior_masks.len() > self.clicks.len() {
            self.prior_masks.pop();
        }
        Some(click)
    }

    pub fn clear(&mut self) {
        self.clicks.clear();
        self.prior_masks.clear();
    }

    pub fn record_mask(&mut self, mask: Arc<RawMask>) {
        self.prior_masks.push(mask);
    }

    pub fn is_undoable(&self) -> bool {
        !self.clicks.is_empty()
    }

    pub fn clicks(&self) -> &[Click] {
        &self.clicks
    }

    pub fn prior_masks(&self) -> &PriorMaskCache {
        &self.prior_masks
    }

    pub fn len(&self) -> usize {
        self.clicks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clicks.is_empty()
    }
}
