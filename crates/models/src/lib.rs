//! # Models Crate
//!
//! The two independent prediction sources of the batch pipeline.
//!
//! ## Components
//!
//! ### Content-based (per user)
//! - **features**: frozen, sorted category vocabulary and binary item vectors
//! - **ridge**: closed-form ridge regression with an unpenalized intercept
//! - **selection**: 3-fold grid search over a fixed alpha grid
//! - **content**: one model per rated user, trained in parallel
//!
//! ### Collaborative (global)
//! - **collaborative**: biased latent-factor model fit by SGD, scored on
//!   every unrated (user, item) pair
//!
//! ## Example Usage
//!
//! ```ignore
//! use models::{CategoryVocabulary, ContentModelTrainer, ItemFeatureMatrix, SvdConfig, SvdTrainer};
//!
//! let vocabulary = CategoryVocabulary::from_items(index.items());
//! let features = ItemFeatureMatrix::build(&index, &vocabulary);
//!
//! let content = ContentModelTrainer::new().train(&index, &features)?;
//! let collaborative = SvdTrainer::new(SvdConfig::default()).fit(&index)?;
//!
//! let scores = content.predict_user(&features, 1);        // None for cold-start users
//! let unrated = collaborative.anti_testset_for(&index, 1);
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod features;
pub mod ridge;
pub mod selection;
pub mod content;
pub mod collaborative;

// Re-export commonly used types
pub use error::{ModelError, Result};
pub use types::{PredictionEntry, PredictionSource};
pub use features::{CategoryVector, CategoryVocabulary, ItemFeatureMatrix};
pub use ridge::RidgeRegression;
pub use selection::{ALPHA_GRID, CV_FOLDS, FALLBACK_ALPHA, KFold, SearchOutcome, SelectionStrategy, grid_search};
pub use content::{ContentModelTrainer, ContentModels, UserContentModel};
pub use collaborative::{FactorizationModel, SvdConfig, SvdTrainer};
