//! Collaborative filtering with a biased latent-factor model.
//!
//! One global model is trained over every observed rating: a global mean,
//! a bias per user and per item, and a latent vector per user and per item.
//! Parameters are fit by stochastic gradient descent over the ratings in
//! (user, item) order, one pass per epoch.
//!
//! ## Estimate
//! `r̂(u, i) = μ + b_u + b_i + q_i · p_u`, where unknown users or items
//! contribute neither bias nor factors. When `clamp_predictions` is set
//! (the default) the estimate is clipped to the rating scale.
//!
//! Unlike the content models, parameters are shared across all users, so
//! training is a single sequential optimization.

use crate::error::{ModelError, Result};
use crate::types::PredictionEntry;
use data_loader::{DataIndex, ItemId, RatingScale, UserId};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Hyperparameters of the factorization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvdConfig {
    /// Latent dimension
    pub factors: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty on biases and factors
    pub regularization: f64,
    /// Standard deviation of the initial factor values
    pub init_std: f64,
    pub seed: u64,
    /// Clip estimates into the rating scale
    pub clamp_predictions: bool,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            factors: 100,
            epochs: 20,
            learning_rate: 0.005,
            regularization: 0.02,
            init_std: 0.1,
            seed: 42,
            clamp_predictions: true,
        }
    }
}

impl SvdConfig {
    pub fn with_factors(mut self, factors: usize) -> Self {
        self.factors = factors;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp_predictions = clamp;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.factors == 0 {
            return Err(ModelError::InvalidHyperparameter { name: "factors", value: 0.0 });
        }
        let positive = [
            ("learning_rate", self.learning_rate),
            ("init_std", self.init_std),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ModelError::InvalidHyperparameter { name, value });
            }
        }
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(ModelError::InvalidHyperparameter {
                name: "regularization",
                value: self.regularization,
            });
        }
        Ok(())
    }
}

/// Trains a [`FactorizationModel`] from the full rating set
#[derive(Debug, Clone, Default)]
pub struct SvdTrainer {
    config: SvdConfig,
}

impl SvdTrainer {
    pub fn new(config: SvdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SvdConfig {
        &self.config
    }

    #[instrument(skip_all, fields(factors = self.config.factors, epochs = self.config.epochs))]
    pub fn fit(&self, index: &DataIndex) -> Result<FactorizationModel> {
        self.config.validate()?;

        let mut user_index: HashMap<UserId, usize> = HashMap::new();
        let mut item_index: HashMap<ItemId, usize> = HashMap::new();
        let mut user_ids = Vec::new();
        let mut item_ids = Vec::new();
        let mut triples: Vec<(usize, usize, f64)> = Vec::new();

        for rating in index.all_ratings() {
            let u = *user_index.entry(rating.user_id).or_insert_with(|| {
                user_ids.push(rating.user_id);
                user_ids.len() - 1
            });
            let i = *item_index.entry(rating.item_id).or_insert_with(|| {
                item_ids.push(rating.item_id);
                item_ids.len() - 1
            });
            triples.push((u, i, rating.rating));
        }

        let k = self.config.factors;
        if triples.is_empty() {
            warn!("No ratings to factorize; the model knows no users or items");
            return Ok(FactorizationModel {
                scale: index.rating_scale(),
                clamp: self.config.clamp_predictions,
                global_mean: index.rating_scale().midpoint(),
                user_index,
                item_index,
                candidate_items: Vec::new(),
                user_bias: Array1::zeros(0),
                item_bias: Array1::zeros(0),
                user_factors: Array2::zeros((0, k)),
                item_factors: Array2::zeros((0, k)),
            });
        }
        let mut candidate_items = item_ids.clone();
        candidate_items.sort_unstable();

        let global_mean = triples.iter().map(|t| t.2).sum::<f64>() / triples.len() as f64;

        // Uniform on [-a, a] has standard deviation a / sqrt(3)
        let bound = self.config.init_std * 3f64.sqrt();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut user_factors =
            Array2::from_shape_simple_fn((user_ids.len(), k), || rng.random_range(-bound..=bound));
        let mut item_factors =
            Array2::from_shape_simple_fn((item_ids.len(), k), || rng.random_range(-bound..=bound));
        let mut user_bias = Array1::<f64>::zeros(user_ids.len());
        let mut item_bias = Array1::<f64>::zeros(item_ids.len());

        let lr = self.config.learning_rate;
        let reg = self.config.regularization;

        for epoch in 0..self.config.epochs {
            let mut squared_error = 0.0;
            for &(u, i, r) in &triples {
                let dot: f64 = user_factors.row(u).dot(&item_factors.row(i));
                let err = r - (global_mean + user_bias[u] + item_bias[i] + dot);
                squared_error += err * err;

                user_bias[u] += lr * (err - reg * user_bias[u]);
                item_bias[i] += lr * (err - reg * item_bias[i]);

                for f in 0..k {
                    let puf = user_factors[[u, f]];
                    let qif = item_factors[[i, f]];
                    user_factors[[u, f]] += lr * (err * qif - reg * puf);
                    item_factors[[i, f]] += lr * (err * puf - reg * qif);
                }
            }
            debug!(
                epoch,
                rmse = (squared_error / triples.len() as f64).sqrt(),
                "factorization epoch"
            );
        }

        info!(
            "Trained factorization over {} users, {} items, {} ratings",
            user_ids.len(),
            item_ids.len(),
            triples.len()
        );

        Ok(FactorizationModel {
            scale: index.rating_scale(),
            clamp: self.config.clamp_predictions,
            global_mean,
            user_index,
            item_index,
            candidate_items,
            user_bias,
            item_bias,
            user_factors,
            item_factors,
        })
    }
}

/// A trained latent-factor model
#[derive(Debug, Clone)]
pub struct FactorizationModel {
    scale: RatingScale,
    clamp: bool,
    global_mean: f64,
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<ItemId, usize>,
    /// Every item with at least one rating, ascending
    candidate_items: Vec<ItemId>,
    user_bias: Array1<f64>,
    item_bias: Array1<f64>,
    user_factors: Array2<f64>,
    item_factors: Array2<f64>,
}

impl FactorizationModel {
    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn num_users(&self) -> usize {
        self.user_index.len()
    }

    pub fn num_items(&self) -> usize {
        self.candidate_items.len()
    }

    pub fn knows_user(&self, user_id: UserId) -> bool {
        self.user_index.contains_key(&user_id)
    }

    /// Estimated rating for any pair
    pub fn predict(&self, user_id: UserId, item_id: ItemId) -> f64 {
        let u = self.user_index.get(&user_id).copied();
        let i = self.item_index.get(&item_id).copied();
        let mut estimate = self.global_mean;
        if let Some(u) = u {
            estimate += self.user_bias[u];
        }
        if let Some(i) = i {
            estimate += self.item_bias[i];
        }
        if let (Some(u), Some(i)) = (u, i) {
            estimate += self.user_factors.row(u).dot(&self.item_factors.row(i));
        }
        if self.clamp {
            self.scale.clamp(estimate)
        } else {
            estimate
        }
    }

    /// Scores for every model item the user has not rated.
    ///
    /// Users unknown to the model (no ratings) get an empty list.
    pub fn anti_testset_for(&self, index: &DataIndex, user_id: UserId) -> Vec<PredictionEntry> {
        if !self.knows_user(user_id) {
            return Vec::new();
        }
        self.candidate_items
            .iter()
            .filter(|&&item_id| !index.is_rated(user_id, item_id))
            .map(|&item_id| PredictionEntry::new(user_id, item_id, self.predict(user_id, item_id)))
            .collect()
    }

    /// Every unrated (user, item) pair, scored, in user order
    pub fn anti_testset(&self, index: &DataIndex) -> Vec<PredictionEntry> {
        let users: Vec<UserId> = index.users().collect();
        users
            .par_iter()
            .flat_map_iter(|&user_id| self.anti_testset_for(index, user_id))
            .collect()
    }

    /// RMSE of the model on the ratings it was trained on
    pub fn training_rmse(&self, index: &DataIndex) -> Option<f64> {
        let (sum, count) = index
            .all_ratings()
            .fold((0.0, 0usize), |(sum, count), rating| {
                let err = rating.rating - self.predict(rating.user_id, rating.item_id);
                (sum + err * err, count + 1)
            });
        (count > 0).then(|| (sum / count as f64).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Item, Rating};

    fn create_test_index() -> DataIndex {
        let mut index = DataIndex::default();
        for id in 1..=4 {
            index.insert_item(Item {
                id,
                title: format!("Item {}", id),
                categories: ["Drama".to_string()].into_iter().collect(),
            });
        }
        let ratings = [
            (1, 1, 5.0),
            (1, 2, 4.0),
            (2, 1, 4.5),
            (2, 3, 1.0),
            (3, 2, 3.5),
            (3, 3, 1.5),
            (3, 4, 2.0),
        ];
        for (user_id, item_id, rating) in ratings {
            index.insert_rating(Rating { user_id, item_id, rating });
        }
        index.insert_user(4);
        index
    }

    fn small_config() -> SvdConfig {
        SvdConfig::default().with_factors(4).with_epochs(50)
    }

    #[test]
    fn test_anti_testset_excludes_rated_pairs() {
        let index = create_test_index();
        let model = SvdTrainer::new(small_config()).fit(&index).unwrap();

        let entries = model.anti_testset(&index);
        // 3 modeled users x 4 items - 7 observed
        assert_eq!(entries.len(), 5);
        assert!(entries.iter().all(|e| !index.is_rated(e.user_id, e.item_id)));
    }

    #[test]
    fn test_cold_start_user_gets_nothing() {
        let index = create_test_index();
        let model = SvdTrainer::new(small_config()).fit(&index).unwrap();
        assert!(!model.knows_user(4));
        assert!(model.anti_testset_for(&index, 4).is_empty());
    }

    #[test]
    fn test_clamped_predictions_stay_on_scale() {
        let index = create_test_index();
        let clamped = SvdTrainer::new(small_config()).fit(&index).unwrap();
        let raw = SvdTrainer::new(small_config().with_clamp(false)).fit(&index).unwrap();
        let scale = index.rating_scale();
        for user_id in 1..=3 {
            for item_id in 1..=4 {
                let p = clamped.predict(user_id, item_id);
                assert!((0.5..=5.0).contains(&p));
                assert_eq!(p, scale.clamp(raw.predict(user_id, item_id)));
            }
        }
    }

    #[test]
    fn test_unknown_pair_falls_back_to_mean() {
        let index = create_test_index();
        let model = SvdTrainer::new(small_config().with_clamp(false)).fit(&index).unwrap();
        assert_eq!(model.predict(99, 99), model.global_mean());
    }

    #[test]
    fn test_training_reduces_error() {
        let index = create_test_index();
        let short = SvdTrainer::new(small_config().with_epochs(1)).fit(&index).unwrap();
        let long = SvdTrainer::new(small_config().with_epochs(200)).fit(&index).unwrap();
        assert!(long.training_rmse(&index).unwrap() < short.training_rmse(&index).unwrap());
    }

    #[test]
    fn test_same_seed_same_model() {
        let index = create_test_index();
        let a = SvdTrainer::new(small_config()).fit(&index).unwrap();
        let b = SvdTrainer::new(small_config()).fit(&index).unwrap();
        assert_eq!(a.predict(1, 3), b.predict(1, 3));
    }

    #[test]
    fn test_empty_index_gives_empty_model() {
        let mut index = DataIndex::default();
        index.insert_user(1);
        let model = SvdTrainer::new(small_config()).fit(&index).unwrap();

        assert_eq!(model.num_users(), 0);
        assert_eq!(model.num_items(), 0);
        assert!(!model.knows_user(1));
        assert!(model.anti_testset(&index).is_empty());
        assert_eq!(model.training_rmse(&index), None);
        assert_eq!(model.predict(1, 1), index.rating_scale().midpoint());
    }

    #[test]
    fn test_invalid_config() {
        assert!(SvdConfig::default().with_factors(0).validate().is_err());
        assert!(SvdConfig::default().with_learning_rate(-1.0).validate().is_err());
    }
}
