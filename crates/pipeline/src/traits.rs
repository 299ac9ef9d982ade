//! Core traits for the filtering pipeline.
//!
//! This module defines the Filter trait that allows composable,
//! extensible filters to be applied to a user's prediction candidates.

use anyhow::Result;
use data_loader::{DataIndex, ItemId, UserId};
use models::PredictionEntry;
use std::collections::HashSet;

/// What a filter may know about the user whose candidates it sees
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: UserId,
    /// Items the user has an observed rating for
    pub rated_items: HashSet<ItemId>,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            rated_items: HashSet::new(),
        }
    }

    /// Gather the user's observed items from the index
    pub fn from_index(index: &DataIndex, user_id: UserId) -> Self {
        Self {
            user_id,
            rated_items: index
                .get_user_ratings(user_id)
                .iter()
                .map(|r| r.item_id)
                .collect(),
        }
    }
}

/// Core trait for filtering candidates.
///
/// All filters must implement this trait to be used in the FilterPipeline.
///
/// ## Design Note
/// - `Send + Sync` allows filters to be shared by the per-user rayon tasks
/// - Filters take ownership of the Vec<PredictionEntry> and return a filtered Vec
/// - Filters must keep the relative order of the entries they retain
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to one user's candidates.
    fn apply(
        &self,
        candidates: Vec<PredictionEntry>,
        context: &UserContext,
    ) -> Result<Vec<PredictionEntry>>;
}
