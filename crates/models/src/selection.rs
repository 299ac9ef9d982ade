//! Regularization search by k-fold cross-validation.

use crate::error::{ModelError, Result};
use crate::ridge::RidgeRegression;
use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// L2 strengths tried for every user, in priority order for ties
pub const ALPHA_GRID: [f64; 5] = [0.01, 0.1, 1.0, 10.0, 100.0];

/// Requested number of cross-validation folds
pub const CV_FOLDS: usize = 3;

/// Used when there are too few ratings to cross-validate at all
pub const FALLBACK_ALPHA: f64 = 1.0;

/// Contiguous, unshuffled k-fold splitter.
///
/// The first `n % k` folds hold one extra sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    n_samples: usize,
    n_folds: usize,
}

impl KFold {
    pub fn new(n_samples: usize, n_folds: usize) -> Result<Self> {
        if n_folds < 2 || n_folds > n_samples {
            return Err(ModelError::InvalidHyperparameter {
                name: "n_folds",
                value: n_folds as f64,
            });
        }
        Ok(Self { n_samples, n_folds })
    }

    /// Held-out index range of every fold
    pub fn test_ranges(&self) -> Vec<Range<usize>> {
        let base = self.n_samples / self.n_folds;
        let extra = self.n_samples % self.n_folds;
        let mut start = 0;
        (0..self.n_folds)
            .map(|fold| {
                let len = base + usize::from(fold < extra);
                let range = start..start + len;
                start += len;
                range
            })
            .collect()
    }
}

/// How the regularization strength was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Grid search with this many folds (fewer than requested for small users)
    CrossValidated { folds: usize },
    /// One rating only: no split possible, [`FALLBACK_ALPHA`] used
    SingleSample,
}

/// Result of a grid search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub alpha: f64,
    /// Mean held-out squared error of the chosen alpha (None without CV)
    pub cv_mse: Option<f64>,
    pub strategy: SelectionStrategy,
}

/// Pick the candidate with the lowest mean held-out MSE.
///
/// Folds are clamped to `min(requested, n)`. Below two folds the search is
/// skipped and [`FALLBACK_ALPHA`] is returned. Ties keep the earliest candidate.
pub fn grid_search(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    candidates: &[f64],
    requested_folds: usize,
) -> Result<SearchOutcome> {
    if candidates.is_empty() {
        return Err(ModelError::EmptyGrid);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::DimensionMismatch {
            rows: x.nrows(),
            targets: y.len(),
        });
    }
    let n = y.len();
    if n == 0 {
        return Err(ModelError::EmptyTrainingSet { model: "grid search" });
    }

    let folds = requested_folds.min(n);
    if folds < 2 {
        return Ok(SearchOutcome {
            alpha: FALLBACK_ALPHA,
            cv_mse: None,
            strategy: SelectionStrategy::SingleSample,
        });
    }

    let splits = KFold::new(n, folds)?.test_ranges();
    let mut best: Option<(f64, f64)> = None;
    for &alpha in candidates {
        let mse = cross_validated_mse(x, y, &splits, alpha)?;
        if best.is_none_or(|(_, best_mse)| mse < best_mse) {
            best = Some((alpha, mse));
        }
    }

    let (alpha, mse) = best.ok_or(ModelError::EmptyGrid)?;
    Ok(SearchOutcome {
        alpha,
        cv_mse: Some(mse),
        strategy: SelectionStrategy::CrossValidated { folds },
    })
}

/// Mean over folds of the held-out mean squared error
fn cross_validated_mse(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    splits: &[Range<usize>],
    alpha: f64,
) -> Result<f64> {
    let n = y.len();
    let mut total = 0.0;
    for test in splits {
        let train: Vec<usize> = (0..n).filter(|i| !test.contains(i)).collect();
        let model = RidgeRegression::fit(
            x.select(Axis(0), &train).view(),
            y.select(Axis(0), &train).view(),
            alpha,
        )?;
        let predicted = model.predict(x.slice(ndarray::s![test.clone(), ..]));
        let actual = y.slice(ndarray::s![test.clone()]);
        let fold_mse = (&predicted - &actual).mapv(|e| e * e).mean().unwrap_or(0.0);
        total += fold_mse;
    }
    Ok(total / splits.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2, array};

    #[test]
    fn test_fold_sizes() {
        let ranges = KFold::new(7, 3).unwrap().test_ranges();
        assert_eq!(ranges, vec![0..3, 3..5, 5..7]);
        assert!(KFold::new(2, 3).is_err());
        assert!(KFold::new(5, 1).is_err());
    }

    #[test]
    fn test_single_sample_falls_back() {
        let x = array![[1.0, 0.0]];
        let y = array![4.0];
        let outcome = grid_search(x.view(), y.view(), &ALPHA_GRID, CV_FOLDS).unwrap();
        assert_eq!(outcome.strategy, SelectionStrategy::SingleSample);
        assert_eq!(outcome.alpha, FALLBACK_ALPHA);
        assert_eq!(outcome.cv_mse, None);
    }

    #[test]
    fn test_two_samples_use_two_folds() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![5.0, 1.0];
        let outcome = grid_search(x.view(), y.view(), &ALPHA_GRID, CV_FOLDS).unwrap();
        assert_eq!(outcome.strategy, SelectionStrategy::CrossValidated { folds: 2 });
        assert!(outcome.cv_mse.is_some());
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        // Constant targets: every alpha predicts perfectly, all errors are zero
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = Array1::from_elem(6, 3.0);
        let outcome = grid_search(x.view(), y.view(), &ALPHA_GRID, CV_FOLDS).unwrap();
        assert_eq!(outcome.alpha, 0.01);
    }

    #[test]
    fn test_linear_signal_prefers_weak_regularization() {
        // rating = 1 + 2*a + 1*b, exactly linear and repeated
        let rows: Vec<[f64; 2]> = (0..30).map(|i| [(i % 2) as f64, ((i / 2) % 2) as f64]).collect();
        let x = Array2::from_shape_fn((rows.len(), 2), |(r, c)| rows[r][c]);
        let y = x.column(0).mapv(|a| 2.0 * a) + &x.column(1) + 1.0;
        let outcome = grid_search(x.view(), y.view(), &ALPHA_GRID, CV_FOLDS).unwrap();
        assert_eq!(outcome.alpha, 0.01);
        assert!(outcome.cv_mse.unwrap() < 1e-3);
    }

    #[test]
    fn test_empty_grid() {
        let x = array![[1.0]];
        let y = array![1.0];
        assert_eq!(
            grid_search(x.view(), y.view(), &[], CV_FOLDS),
            Err(ModelError::EmptyGrid)
        );
    }
}
