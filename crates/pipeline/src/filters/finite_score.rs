//! Filter to drop candidates whose score is NaN or infinite.
//!
//! Ranking relies on a total order over scores; a non-finite score would
//! otherwise sort to an arbitrary end of the list.

use crate::traits::{Filter, UserContext};
use anyhow::Result;
use models::PredictionEntry;
use tracing::warn;

pub struct FiniteScoreFilter;

impl Filter for FiniteScoreFilter {
    fn name(&self) -> &str {
        "FiniteScoreFilter"
    }

    fn apply(
        &self,
        candidates: Vec<PredictionEntry>,
        context: &UserContext,
    ) -> Result<Vec<PredictionEntry>> {
        let before = candidates.len();
        let filtered: Vec<PredictionEntry> = candidates
            .into_iter()
            .filter(|candidate| candidate.score.is_finite())
            .collect();
        if filtered.len() < before {
            warn!(
                user_id = context.user_id,
                dropped = before - filtered.len(),
                "dropped non-finite scores"
            );
        }
        Ok(filtered)
    }
}
