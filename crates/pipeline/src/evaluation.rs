//! In-sample evaluation of the content models.
//!
//! Every model is scored on exactly the ratings it was fit on, so the RMSE
//! reported here is optimistic: it measures fit, not generalization. It is
//! useful for spotting broken fits, not for comparing against held-out
//! metrics.
//!
//! Evaluation only visits observed (user, item) pairs. Unobserved pairs are
//! handled by the recommendation pass in [`crate::recommend`].

use data_loader::{DataIndex, ItemId, UserId};
use models::{ContentModels, ItemFeatureMatrix};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Sparse view of the conceptual dense user × item grid.
///
/// Known cells hold the observed rating, unknown cells the user's content
/// prediction. Cells of unmodeled users are undefined.
pub struct CombinedGrid<'a> {
    index: &'a DataIndex,
    models: &'a ContentModels,
    features: &'a ItemFeatureMatrix,
}

impl<'a> CombinedGrid<'a> {
    pub fn new(
        index: &'a DataIndex,
        models: &'a ContentModels,
        features: &'a ItemFeatureMatrix,
    ) -> Self {
        Self {
            index,
            models,
            features,
        }
    }

    /// Observed rating if known, otherwise the model prediction
    pub fn value(&self, user_id: UserId, item_id: ItemId) -> Option<f64> {
        self.index
            .rating_of(user_id, item_id)
            .or_else(|| self.predicted(user_id, item_id))
    }

    /// The model's score for a cell, known or not
    pub fn predicted(&self, user_id: UserId, item_id: ItemId) -> Option<f64> {
        self.models.predict(self.features, user_id, item_id)
    }

    /// Whether the cell holds an observed rating
    pub fn is_known(&self, user_id: UserId, item_id: ItemId) -> bool {
        self.index.is_rated(user_id, item_id)
    }
}

/// Error of one user's model on their own ratings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserEvaluation {
    pub entries: usize,
    pub squared_error: f64,
}

impl UserEvaluation {
    pub fn rmse(&self) -> f64 {
        (self.squared_error / self.entries as f64).sqrt()
    }
}

/// In-sample fit of all content models
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// RMSE over every known entry of every modeled user (None if there are none)
    pub rmse: Option<f64>,
    pub known_entries: usize,
    pub users_evaluated: usize,
    /// Users without a model, reported rather than scored
    pub cold_start_users: Vec<UserId>,
    pub per_user: BTreeMap<UserId, UserEvaluation>,
}

/// Compare each model's self-predictions against the ratings it was trained on
#[instrument(skip_all)]
pub fn evaluate_in_sample(
    index: &DataIndex,
    models: &ContentModels,
    features: &ItemFeatureMatrix,
) -> EvaluationReport {
    let grid = CombinedGrid::new(index, models, features);
    let modeled: Vec<UserId> = models.iter().map(|(user_id, _)| *user_id).collect();

    let per_user: BTreeMap<UserId, UserEvaluation> = modeled
        .par_iter()
        .filter_map(|&user_id| {
            let mut squared_error = 0.0;
            let mut entries = 0;
            for rating in index.get_user_ratings(user_id) {
                let Some(predicted) = grid.predicted(user_id, rating.item_id) else {
                    continue;
                };
                let err = rating.rating - predicted;
                squared_error += err * err;
                entries += 1;
            }
            (entries > 0).then_some((user_id, UserEvaluation { entries, squared_error }))
        })
        .collect();

    let known_entries: usize = per_user.values().map(|e| e.entries).sum();
    let total_error: f64 = per_user.values().map(|e| e.squared_error).sum();
    let rmse = (known_entries > 0).then(|| (total_error / known_entries as f64).sqrt());

    let report = EvaluationReport {
        rmse,
        known_entries,
        users_evaluated: per_user.len(),
        cold_start_users: models.cold_start_users().iter().copied().collect(),
        per_user,
    };
    info!(
        "In-sample content RMSE {:?} over {} ratings of {} users ({} cold-start unscored)",
        report.rmse,
        report.known_entries,
        report.users_evaluated,
        report.cold_start_users.len()
    );
    report
}
