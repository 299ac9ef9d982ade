//! Filter to remove items the user has already rated.
//!
//! Content-based predictions cover the full item grid, so this is what keeps
//! recommendations from repeating items the user has seen.

use crate::traits::{Filter, UserContext};
use anyhow::Result;
use models::PredictionEntry;

/// Removes candidates that the user has already rated.
///
/// Uses the HashSet in UserContext.rated_items for O(1) lookups.
pub struct AlreadyRatedFilter;

impl Filter for AlreadyRatedFilter {
    fn name(&self) -> &str {
        "AlreadyRatedFilter"
    }

    fn apply(
        &self,
        candidates: Vec<PredictionEntry>,
        context: &UserContext,
    ) -> Result<Vec<PredictionEntry>> {
        let filtered: Vec<PredictionEntry> = candidates
            .into_iter()
            .filter(|candidate| !context.rated_items.contains(&candidate.item_id))
            .collect();
        Ok(filtered)
    }
}
