//! Types shared by both prediction sources.

use data_loader::{ItemId, UserId};
use serde::{Deserialize, Serialize};

/// Where a prediction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionSource {
    /// Per-user ridge regression over item categories
    Content,
    /// Global latent-factor model
    Collaborative,
}

impl PredictionSource {
    pub fn name(&self) -> &'static str {
        match self {
            PredictionSource::Content => "content",
            PredictionSource::Collaborative => "collaborative",
        }
    }
}

/// A single predicted score for a (user, item) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionEntry {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub score: f64,
}

impl PredictionEntry {
    pub fn new(user_id: UserId, item_id: ItemId, score: f64) -> Self {
        Self {
            user_id,
            item_id,
            score,
        }
    }
}
