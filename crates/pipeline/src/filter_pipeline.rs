//! The FilterPipeline orchestrates multiple filters.
//!
//! This module provides the main FilterPipeline struct that chains
//! multiple filters together using the builder pattern.

use crate::filters::{AlreadyRatedFilter, FiniteScoreFilter};
use crate::traits::{Filter, UserContext};
use anyhow::Result;
use models::PredictionEntry;
use tracing;

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(FiniteScoreFilter)
///     .add_filter(AlreadyRatedFilter);
///
/// let filtered = pipeline.apply(candidates, &context)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    /// Create a new empty FilterPipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Filters applied to content-based candidates before ranking
    pub fn for_content() -> Self {
        Self::new()
            .add_filter(FiniteScoreFilter)
            .add_filter(AlreadyRatedFilter)
    }

    /// Filters applied to collaborative candidates before ranking.
    ///
    /// The anti-testset never contains rated items, so only scores are checked.
    pub fn for_collaborative() -> Self {
        Self::new().add_filter(FiniteScoreFilter)
    }

    /// Add a filter to the pipeline (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Apply all filters in sequence to one user's candidates.
    pub fn apply(
        &self,
        candidates: Vec<PredictionEntry>,
        context: &UserContext,
    ) -> Result<Vec<PredictionEntry>> {
        let mut current = candidates;
        for filter in &self.filters {
            let before = current.len();
            current = filter.apply(current, context)?;
            tracing::trace!(
                "Filter {} for user {}: {} -> {}",
                filter.name(),
                context.user_id,
                before,
                current.len()
            );
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}
