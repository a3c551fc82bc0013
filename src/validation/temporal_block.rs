//! The windowed leave-one-out engine

use nalgebra::{DMatrix, DVector};

use crate::model::{Model, ModelFactory};
use crate::table::Table;
use crate::{Error, Result};

/// One train/held-out split with its fitted model and predictions.
pub struct Fold {
    held_out_year: i32,
    train_years: Vec<i32>,
    train_truth: Vec<f64>,
    train_predictions: Vec<f64>,
    test_prediction: f64,
    model: Box<dyn Model>,
}

impl Fold {
    /// The year held out of training.
    #[must_use]
    pub const fn held_out_year(&self) -> i32 {
        self.held_out_year
    }

    /// Years the model was trained on, in index order.
    #[must_use]
    pub fn train_years(&self) -> &[i32] {
        &self.train_years
    }

    /// Target values of the training rows.
    #[must_use]
    pub fn train_truth(&self) -> &[f64] {
        &self.train_truth
    }

    /// In-fold predictions over the training rows.
    #[must_use]
    pub fn train_predictions(&self) -> &[f64] {
        &self.train_predictions
    }

    /// Prediction for the held-out row.
    #[must_use]
    pub const fn test_prediction(&self) -> f64 {
        self.test_prediction
    }

    /// The model fitted for this fold.
    #[must_use]
    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }
}

/// Result of one temporal-block leave-one-out pass over a table.
///
/// For every row `i` (in index order) the training set is the full table
/// minus every row whose year lies within `window / 2` (integer division)
/// of row `i`'s year. The held-out row itself always falls inside that
/// window, so `window == 0` degenerates to classic leave-one-out. Near the
/// first and last year the window simply overlaps the domain edge and
/// excludes fewer rows.
pub struct TemporalBlockValidation {
    folds: Vec<Fold>,
    real_y: Vec<f64>,
    predictions_test: Vec<f64>,
    num_features: usize,
}

impl TemporalBlockValidation {
    /// Run one validation pass.
    ///
    /// Fold order follows index order; there is no randomness.
    ///
    /// # Errors
    ///
    /// - [`Error::Table`] if the table is empty or a column is missing.
    /// - [`Error::InsufficientData`] if any fold's training set falls below
    ///   the model's minimum (the window is too wide for the data).
    /// - [`Error::ModelFit`] if a fold's design matrix cannot be fitted.
    pub fn evaluate(
        table: &Table,
        window: usize,
        feature_columns: &[String],
        target_column: &str,
        factory: &dyn ModelFactory,
    ) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::Table("cannot evaluate an empty table".to_string()));
        }

        let features = table.select(feature_columns)?;
        let target = table.column_values(target_column)?;
        let years = table.index();
        let p = feature_columns.len();
        let half_window = window / 2;
        let needed = factory.min_train_rows(p);

        let mut folds = Vec::with_capacity(years.len());
        let mut predictions_test = Vec::with_capacity(years.len());

        for (i, &year) in years.iter().enumerate() {
            let train_rows: Vec<usize> = (0..years.len())
                .filter(|&j| (years[j] - year).unsigned_abs() as usize > half_window)
                .collect();

            if train_rows.len() < needed {
                return Err(Error::InsufficientData {
                    year,
                    remaining: train_rows.len(),
                    needed,
                    half_window,
                });
            }

            let x = DMatrix::from_fn(train_rows.len(), p, |r, c| features.row(train_rows[r])[c]);
            let y = DVector::from_iterator(
                train_rows.len(),
                train_rows.iter().map(|&r| target[r]),
            );

            let model = factory.fit(&x, &y)?;

            let train_predictions: Vec<f64> = train_rows
                .iter()
                .map(|&r| model.predict(features.row(r)))
                .collect();
            let test_prediction = model.predict(features.row(i));
            predictions_test.push(test_prediction);

            folds.push(Fold {
                held_out_year: year,
                train_years: train_rows.iter().map(|&r| years[r]).collect(),
                train_truth: train_rows.iter().map(|&r| target[r]).collect(),
                train_predictions,
                test_prediction,
                model,
            });
        }

        Ok(Self {
            folds,
            real_y: target,
            predictions_test,
            num_features: p,
        })
    }

    /// The folds, one per row, in index order.
    #[must_use]
    pub fn folds(&self) -> &[Fold] {
        &self.folds
    }

    /// Real target values over the full table, in index order.
    #[must_use]
    pub fn real_y(&self) -> &[f64] {
        &self.real_y
    }

    /// Held-out predictions, aligned with [`Self::real_y`].
    #[must_use]
    pub fn predictions_test(&self) -> &[f64] {
        &self.predictions_test
    }

    /// Mean per-fold coefficient vector: `[coef_1, .., coef_p, intercept]`,
    /// averaged element-wise across folds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedModel`] if any fold's model family does
    /// not expose linear coefficients.
    pub fn mean_coefficients(&self) -> Result<Vec<f64>> {
        let mut acc = vec![0.0; self.num_features + 1];
        for fold in &self.folds {
            let (coeffs, intercept) = fold.model.linear_coefficients().ok_or_else(|| {
                Error::UnsupportedModel(
                    "coefficient extraction requires a linear-coefficient model".to_string(),
                )
            })?;
            for (a, c) in acc.iter_mut().zip(coeffs.iter().chain(Some(&intercept))) {
                *a += c;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.folds.len() as f64;
        for a in &mut acc {
            *a /= n;
        }
        Ok(acc)
    }
}
