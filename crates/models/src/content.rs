//! Per-user content-based models.
//!
//! Each user with at least one rating gets an independent ridge regression
//! from item category vectors to that user's ratings. Users are trained in
//! parallel: every fit reads only the shared, read-only index and feature
//! matrix, and the results are gathered into one immutable map.
//!
//! Users with no ratings get no model. Their predictions are reported as
//! absent (`None`), never as zeros.

use crate::error::{ModelError, Result};
use crate::features::ItemFeatureMatrix;
use crate::ridge::RidgeRegression;
use crate::selection::{ALPHA_GRID, CV_FOLDS, SearchOutcome, SelectionStrategy, grid_search};
use crate::types::PredictionEntry;
use data_loader::{DataIndex, ItemId, UserId};
use ndarray::Array1;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// One user's fitted model and how it was selected
#[derive(Debug, Clone)]
pub struct UserContentModel {
    pub user_id: UserId,
    pub model: RidgeRegression,
    pub selection: SearchOutcome,
    pub rating_count: usize,
}

impl UserContentModel {
    pub fn alpha(&self) -> f64 {
        self.selection.alpha
    }
}

/// Fits per-user ridge models with a cross-validated alpha
#[derive(Debug, Clone)]
pub struct ContentModelTrainer {
    candidates: Vec<f64>,
    folds: usize,
}

impl ContentModelTrainer {
    pub fn new() -> Self {
        Self {
            candidates: ALPHA_GRID.to_vec(),
            folds: CV_FOLDS,
        }
    }

    /// Replace the alpha grid (mainly for tests and benchmarks)
    pub fn with_candidates(mut self, candidates: Vec<f64>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Configure the requested fold count (default: 3)
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Train one model per user with ratings; cold-start users are collected separately
    #[instrument(skip_all, fields(features = features.num_features()))]
    pub fn train(&self, index: &DataIndex, features: &ItemFeatureMatrix) -> Result<ContentModels> {
        let users: Vec<UserId> = index.users().collect();

        let fitted: Vec<(UserId, Option<UserContentModel>)> = users
            .par_iter()
            .map(|&user_id| {
                self.train_user(index, features, user_id)
                    .map(|model| (user_id, model))
                    .map_err(|source| ModelError::UserFit {
                        user_id,
                        source: Box::new(source),
                    })
            })
            .collect::<Result<_>>()?;

        let mut models = BTreeMap::new();
        let mut cold_start = BTreeSet::new();
        for (user_id, model) in fitted {
            match model {
                Some(model) => {
                    models.insert(user_id, model);
                }
                None => {
                    cold_start.insert(user_id);
                }
            }
        }

        if !cold_start.is_empty() {
            warn!(
                "{} users have no ratings and get no content model",
                cold_start.len()
            );
        }
        let fallbacks = models
            .values()
            .filter(|m| m.selection.strategy == SelectionStrategy::SingleSample)
            .count();
        info!(
            "Trained {} content models ({} single-rating fallbacks)",
            models.len(),
            fallbacks
        );

        Ok(ContentModels { models, cold_start })
    }

    /// Fit a single user on their own ratings only; `None` without ratings
    pub fn train_user(
        &self,
        index: &DataIndex,
        features: &ItemFeatureMatrix,
        user_id: UserId,
    ) -> Result<Option<UserContentModel>> {
        let ratings = index.get_user_ratings(user_id);
        if ratings.is_empty() {
            return Ok(None);
        }

        let item_ids: Vec<ItemId> = ratings.iter().map(|r| r.item_id).collect();
        let x = features.select(&item_ids);
        let y: Array1<f64> = ratings.iter().map(|r| r.rating).collect();

        let selection = grid_search(x.view(), y.view(), &self.candidates, self.folds)?;
        let model = RidgeRegression::fit(x.view(), y.view(), selection.alpha)?;
        debug!(
            user_id,
            alpha = selection.alpha,
            ratings = ratings.len(),
            "fitted content model"
        );

        Ok(Some(UserContentModel {
            user_id,
            model,
            selection,
            rating_count: ratings.len(),
        }))
    }
}

impl Default for ContentModelTrainer {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable mapping from user to fitted content model
#[derive(Debug, Clone, Default)]
pub struct ContentModels {
    models: BTreeMap<UserId, UserContentModel>,
    cold_start: BTreeSet<UserId>,
}

impl ContentModels {
    pub fn get(&self, user_id: UserId) -> Option<&UserContentModel> {
        self.models.get(&user_id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &UserContentModel)> + '_ {
        self.models.iter()
    }

    /// Users that were seen but have no model
    pub fn cold_start_users(&self) -> &BTreeSet<UserId> {
        &self.cold_start
    }

    /// Score of one item for one user; `None` for unmodeled users or unknown items
    pub fn predict(
        &self,
        features: &ItemFeatureMatrix,
        user_id: UserId,
        item_id: ItemId,
    ) -> Option<f64> {
        let model = self.get(user_id)?;
        let vector = features.vector(item_id)?;
        Some(model.model.predict_one(vector))
    }

    /// Score every item for a user, rated items included, in item id order.
    ///
    /// Returns `None` when the user has no model.
    pub fn predict_user(
        &self,
        features: &ItemFeatureMatrix,
        user_id: UserId,
    ) -> Option<Vec<PredictionEntry>> {
        let model = self.get(user_id)?;
        let scores = model.model.predict(features.matrix().view());
        Some(
            features
                .item_ids()
                .iter()
                .zip(scores.iter())
                .map(|(&item_id, &score)| PredictionEntry::new(user_id, item_id, score))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::CategoryVocabulary;
    use data_loader::{Item, Rating};

    fn item(id: ItemId, tags: &[&str]) -> Item {
        Item {
            id,
            title: format!("Item {}", id),
            categories: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// 3 users, 5 items; user 3 has no ratings
    fn create_test_index() -> DataIndex {
        let mut index = DataIndex::default();
        index.insert_item(item(1, &["Action"]));
        index.insert_item(item(2, &["Action", "Comedy"]));
        index.insert_item(item(3, &["Comedy"]));
        index.insert_item(item(4, &["Drama"]));
        index.insert_item(item(5, &["Comedy", "Drama"]));

        for (item_id, rating) in [(1, 5.0), (2, 4.0), (3, 2.0), (4, 1.0)] {
            index.insert_rating(Rating { user_id: 1, item_id, rating });
        }
        index.insert_rating(Rating { user_id: 2, item_id: 4, rating: 4.5 });
        index.insert_user(3);
        index
    }

    fn features(index: &DataIndex) -> ItemFeatureMatrix {
        ItemFeatureMatrix::build(index, &CategoryVocabulary::from_items(index.items()))
    }

    #[test]
    fn test_one_model_per_rated_user() {
        let index = create_test_index();
        let features = features(&index);
        let models = ContentModelTrainer::new().train(&index, &features).unwrap();

        assert_eq!(models.len(), 2);
        assert!(models.get(1).is_some());
        assert!(models.get(2).is_some());
        assert!(models.get(3).is_none());
        assert!(models.cold_start_users().contains(&3));
    }

    #[test]
    fn test_cold_start_predictions_are_absent() {
        let index = create_test_index();
        let features = features(&index);
        let models = ContentModelTrainer::new().train(&index, &features).unwrap();

        assert!(models.predict_user(&features, 3).is_none());
        assert_eq!(models.predict(&features, 3, 1), None);
    }

    #[test]
    fn test_full_grid_covers_every_item() {
        let index = create_test_index();
        let features = features(&index);
        let models = ContentModelTrainer::new().train(&index, &features).unwrap();

        let predictions = models.predict_user(&features, 1).unwrap();
        let ids: Vec<ItemId> = predictions.iter().map(|p| p.item_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(predictions.iter().all(|p| p.user_id == 1 && p.score.is_finite()));
    }

    #[test]
    fn test_single_rating_user_uses_fallback() {
        let index = create_test_index();
        let features = features(&index);
        let models = ContentModelTrainer::new().train(&index, &features).unwrap();

        let user2 = models.get(2).unwrap();
        assert_eq!(user2.selection.strategy, SelectionStrategy::SingleSample);
        assert_eq!(user2.rating_count, 1);
        let score = models.predict(&features, 2, 1).unwrap();
        assert!((score - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_models_only_see_own_ratings() {
        let index = create_test_index();
        let features = features(&index);
        let trainer = ContentModelTrainer::new();

        let mut other = index.clone();
        other.insert_rating(Rating { user_id: 2, item_id: 1, rating: 0.5 });

        let a = trainer.train(&index, &features).unwrap();
        let b = trainer.train(&other, &features).unwrap();
        assert_eq!(a.get(1).unwrap().model, b.get(1).unwrap().model);
    }

    #[test]
    fn test_training_is_deterministic() {
        let index = create_test_index();
        let features = features(&index);
        let trainer = ContentModelTrainer::new();
        let a = trainer.train(&index, &features).unwrap();
        let b = trainer.train(&index, &features).unwrap();
        for (user_id, model) in a.iter() {
            assert_eq!(model.model, b.get(*user_id).unwrap().model);
        }
    }
}
