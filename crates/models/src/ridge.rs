//! Closed-form ridge regression.
//!
//! The intercept is fitted by centering features and targets, so it is not
//! penalized. Coefficients solve `(XcᵀXc + αI) w = Xcᵀyc`; with α > 0 the
//! system is symmetric positive definite and is solved by Cholesky.

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// A fitted ridge regression model
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeRegression {
    alpha: f64,
    coefficients: Array1<f64>,
    intercept: f64,
}

impl RidgeRegression {
    /// Fit on rows of `x` against targets `y` with L2 strength `alpha`
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, alpha: f64) -> Result<Self> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(ModelError::InvalidHyperparameter { name: "alpha", value: alpha });
        }
        if x.nrows() != y.len() {
            return Err(ModelError::DimensionMismatch {
                rows: x.nrows(),
                targets: y.len(),
            });
        }
        let n = x.nrows();
        if n == 0 {
            return Err(ModelError::EmptyTrainingSet { model: "ridge" });
        }

        let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let y_mean = y.sum() / n as f64;
        let xc = &x - &x_mean;
        let yc = &y - y_mean;

        let mut gram = xc.t().dot(&xc);
        for i in 0..gram.nrows() {
            gram[[i, i]] += alpha;
        }
        let rhs = xc.t().dot(&yc);
        let coefficients = cholesky_solve(&gram, &rhs)?;
        let intercept = y_mean - x_mean.dot(&coefficients);

        Ok(Self {
            alpha,
            coefficients,
            intercept,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn predict_one(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.intercept + x.dot(&self.coefficients)
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }
}

/// Solve `a · x = b` for symmetric positive definite `a`
pub(crate) fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return Err(ModelError::NotPositiveDefinite { pivot: i });
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(&a, &b).unwrap();
        let back = a.dot(&x);
        assert!((back[0] - 2.0).abs() < 1e-12);
        assert!((back[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_not_positive_definite() {
        let a = array![[0.0, 0.0], [0.0, 1.0]];
        let b = array![1.0, 1.0];
        assert_eq!(
            cholesky_solve(&a, &b),
            Err(ModelError::NotPositiveDefinite { pivot: 0 })
        );
    }

    #[test]
    fn test_recovers_linear_relationship() {
        // rating = 1 + 3*a + 0.5*b
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let y = array![4.0, 1.5, 4.5, 1.0, 4.0, 1.5];
        let model = RidgeRegression::fit(x.view(), y.view(), 1e-6).unwrap();

        assert!((model.coefficients()[0] - 3.0).abs() < 1e-3);
        assert!((model.coefficients()[1] - 0.5).abs() < 1e-3);
        assert!((model.intercept() - 1.0).abs() < 1e-3);
        assert!((model.predict_one(array![1.0, 1.0].view()) - 4.5).abs() < 1e-3);
    }

    #[test]
    fn test_two_item_example() {
        // A=[1,0] rated 5.0, B=[0,1] rated 1.0, predict C=[1,1]
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![5.0, 1.0];
        let strong = RidgeRegression::fit(x.view(), y.view(), 100.0).unwrap();
        let weak = RidgeRegression::fit(x.view(), y.view(), 0.01).unwrap();

        let c = array![1.0, 1.0];
        let c_strong = strong.predict_one(c.view());
        let c_weak = weak.predict_one(c.view());
        assert!(c_strong > 1.0 && c_strong < 5.0);
        assert!((c_strong - 3.0).abs() <= (c_weak - 3.0).abs() + 1e-12);

        // Shrinkage pulls the rated item's own prediction toward the midpoint
        let a = array![1.0, 0.0];
        let a_strong = strong.predict_one(a.view());
        let a_weak = weak.predict_one(a.view());
        assert!((a_strong - 3.0).abs() < (a_weak - 3.0).abs());
        assert!(a_weak > 4.9);
    }

    #[test]
    fn test_single_sample_predicts_its_rating() {
        let x = array![[1.0, 0.0, 1.0]];
        let y = array![3.5];
        let model = RidgeRegression::fit(x.view(), y.view(), 1.0).unwrap();
        assert!((model.predict_one(array![0.0, 1.0, 0.0].view()) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let x = array![[1.0], [0.0]];
        let y = array![1.0];
        assert!(matches!(
            RidgeRegression::fit(x.view(), y.view(), 1.0),
            Err(ModelError::DimensionMismatch { .. })
        ));
        let y = array![1.0, 2.0];
        assert!(matches!(
            RidgeRegression::fit(x.view(), y.view(), 0.0),
            Err(ModelError::InvalidHyperparameter { .. })
        ));
    }
}
