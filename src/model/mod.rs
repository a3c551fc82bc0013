//! Regression models fitted per fold
//!
//! The validator fits one fresh model per fold through a [`ModelFactory`].
//! The default family is ordinary least squares; other families can be
//! plugged in, but only linear-coefficient models support coefficient
//! extraction.

use nalgebra::{DMatrix, DVector};

use crate::{Error, Result};

/// A fitted regression model, owned by the fold that produced it.
pub trait Model: Send {
    /// Predict the response for one feature row (feature-column order).
    fn predict(&self, features: &[f64]) -> f64;

    /// Linear coefficients (in feature-column order) and intercept.
    ///
    /// `None` for model families without a linear-coefficient view;
    /// callers translate that into [`Error::UnsupportedModel`].
    fn linear_coefficients(&self) -> Option<(&[f64], f64)>;
}

/// Fits fresh [`Model`] instances, one per fold.
pub trait ModelFactory: Send + Sync {
    /// Minimum training rows required to fit with `num_features` features.
    fn min_train_rows(&self, num_features: usize) -> usize;

    /// Fit a model on `x` (rows = samples, columns = features) against `y`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFit`] when the design matrix is numerically
    /// unfittable (e.g. rank-deficient).
    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Box<dyn Model>>;
}

/// Ordinary least squares with an intercept.
#[derive(Debug, Clone, Copy, Default)]
pub struct OlsFactory;

/// A fitted linear model: `y = coefficients · x + intercept`.
#[derive(Debug, Clone)]
pub struct LinearModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    /// The fitted coefficients, in feature-column order.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// The fitted intercept.
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Model for LinearModel {
    fn predict(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(features.len(), self.coefficients.len());
        self.coefficients
            .iter()
            .zip(features)
            .map(|(c, x)| c * x)
            .sum::<f64>()
            + self.intercept
    }

    fn linear_coefficients(&self) -> Option<(&[f64], f64)> {
        Some((&self.coefficients, self.intercept))
    }
}

// Relative singular-value cutoff for rank detection.
const RANK_EPS: f64 = 1e-10;

impl ModelFactory for OlsFactory {
    fn min_train_rows(&self, num_features: usize) -> usize {
        // One row per estimated parameter, intercept included.
        num_features + 1
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Box<dyn Model>> {
        let (n, p) = x.shape();
        if n == 0 {
            return Err(Error::ModelFit("no training rows".to_string()));
        }
        if n != y.len() {
            return Err(Error::ModelFit(format!(
                "design matrix has {n} rows but target has {} values",
                y.len()
            )));
        }

        // Augment with a ones column for the intercept.
        let design = DMatrix::from_fn(n, p + 1, |r, c| if c < p { x[(r, c)] } else { 1.0 });

        let svd = design.svd(true, true);
        let max_sv = svd.singular_values.max();
        if svd.rank(RANK_EPS * max_sv) < p + 1 {
            return Err(Error::ModelFit(format!(
                "singular design matrix ({n} rows, {p} features)"
            )));
        }

        let beta = svd
            .solve(y, RANK_EPS * max_sv)
            .map_err(|e| Error::ModelFit(e.to_string()))?;

        let mut coefficients: Vec<f64> = beta.iter().copied().collect();
        let intercept = coefficients.pop().unwrap_or(0.0);

        Ok(Box::new(LinearModel {
            coefficients,
            intercept,
        }))
    }
}
