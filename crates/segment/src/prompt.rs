use std::sync::Arc;

use mask::RawMask;
use serde::{Deserialize, Serialize};

use crate::{
    embedding::Embedding,
    error::Result,
    history::ClickHistory,
    scale::ScaleParameters,
};

/// Identifies one inference request. `epoch` changes whenever the click
/// sequence is abandoned (clear, new image, history emptied).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PromptId {
    pub epoch: u64,
    pub sequence: u64,
}

/// Point label understood by the model. Only `Positive` is issued today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ClickType {
    Negative = 0,
    Positive = 1,
}

impl From<ClickType> for u8 {
    fn from(click_type: ClickType) -> Self {
        click_type as u8
    }
}

impl TryFrom<u8> for ClickType {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(ClickType::Negative),
            1 => Ok(ClickType::Positive),
            other => Err(format!("unknown click type {other}")),
        }
    }
}

/// A click in model coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelClick {
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub click_type: ClickType,
}

/// One request for the inference collaborator.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub id: PromptId,
    pub clicks: Vec<ModelClick>,
    pub embedding: Arc<Embedding>,
    pub scale: ScaleParameters,
    pub prior_mask: Option<Arc<RawMask>>,
}

/// Wire shape of a [`Prompt`]; the embedding travels by reference.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptWire<'a> {
    pub clicks: &'a [ModelClick],
    pub embedding_ref: u64,
    pub model_scale: &'a ScaleParameters,
    pub prior_mask: Option<&'a RawMask>,
}

impl Prompt {
    pub fn to_wire(&self) -> PromptWire<'_> {
        PromptWire {
            clicks: &self.clicks,
            embedding_ref: self.embedding.id(),
            model_scale: &self.scale,
            prior_mask: self.prior_mask.as_deref(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }
}

/// Hands out prompt sequence numbers and builds prompts from the history.
#[derive(Debug, Default)]
pub struct PromptBuilder {
    next_sequence: u64,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` for an empty history: the caller clears its derived state
    /// instead of asking the model.
    pub fn build(
        &mut self,
        epoch: u64,
        history: &ClickHistory,
        embedding: &Arc<Embedding>,
        scale: &ScaleParameters,
        prior_mask: Option<&Arc<RawMask>>,
    ) -> Option<Prompt> {
        if history.is_empty() {
            return None;
        }

        let clicks = history
            .clicks()
            .iter()
            .map(|click| {
                let (x, y) = scale.to_model(click.x, click.y);
                ModelClick {
                    x,
                    y,
                    width: None,
                    height: None,
                    click_type: ClickType::Positive,
                }
            })
            .collect();

        let id = PromptId {
            epoch,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        Some(Prompt {
            id,
            clicks,
            embedding: Arc::clone(embedding),
            scale: *scale,
            prior_mask: prior_mask.cloned(),
        })
    }
}
