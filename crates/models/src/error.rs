//! Error types for model fitting.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Fitting was asked to run on zero samples
    #[error("Cannot fit {model} on an empty training set")]
    EmptyTrainingSet { model: &'static str },

    /// Feature matrix and targets disagree in length
    #[error("Dimension mismatch: {rows} feature rows but {targets} targets")]
    DimensionMismatch { rows: usize, targets: usize },

    /// The regularized normal equations could not be factorized
    #[error("Normal equations are not positive definite (pivot {pivot})")]
    NotPositiveDefinite { pivot: usize },

    /// A hyperparameter was out of its valid range
    #[error("Invalid hyperparameter {name}: {value}")]
    InvalidHyperparameter { name: &'static str, value: f64 },

    /// The candidate grid was empty
    #[error("Hyperparameter grid is empty")]
    EmptyGrid,

    /// Per-user training failed
    #[error("Training failed for user {user_id}: {source}")]
    UserFit {
        user_id: u32,
        #[source]
        source: Box<ModelError>,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;
