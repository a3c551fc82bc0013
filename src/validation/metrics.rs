//! Metric functions and fold-level aggregation
//!
//! Metric functions are plain `(truth, prediction) -> scalar` callables;
//! the aggregator is agnostic to their semantics. Test metrics are pooled
//! over all held-out predictions, train metrics are summarized across
//! folds with mean and population standard deviation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::TemporalBlockValidation;

/// A metric callable: `(truth, prediction) -> scalar`.
pub type MetricFn = fn(&[f64], &[f64]) -> f64;

/// Aggregate values of one metric over a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Metric over the pooled (real, held-out prediction) pairs.
    pub test: f64,
    /// Mean of the per-fold train metric values.
    pub train_mean: f64,
    /// Population standard deviation of the per-fold train metric values.
    pub train_std: f64,
}

/// Arithmetic mean. Returns `NaN` on an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

/// Population standard deviation. Returns `NaN` on an empty slice.
#[must_use]
pub fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt()
}

/// Coefficient of determination.
///
/// Constant truth is handled with the usual convention: `1.0` when the
/// residuals are all zero, `0.0` otherwise.
#[must_use]
pub fn r_squared(truth: &[f64], prediction: &[f64]) -> f64 {
    debug_assert_eq!(truth.len(), prediction.len());
    let truth_mean = mean(truth);
    let ss_res: f64 = truth
        .iter()
        .zip(prediction)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - truth_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Mean squared error.
#[must_use]
pub fn mean_squared_error(truth: &[f64], prediction: &[f64]) -> f64 {
    debug_assert_eq!(truth.len(), prediction.len());
    #[allow(clippy::cast_precision_loss)]
    let n = truth.len() as f64;
    truth
        .iter()
        .zip(prediction)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n
}

/// Aggregate each named metric over a validation pass.
///
/// The test value applies the metric once to the full pooled vectors of
/// real values and held-out predictions (not a mean of per-fold test
/// metrics); train mean/std are taken across the per-fold train values.
#[must_use]
pub fn aggregate_metrics(
    validation: &TemporalBlockValidation,
    metrics: &[(&str, MetricFn)],
) -> BTreeMap<String, MetricSummary> {
    let mut out = BTreeMap::new();
    for (name, metric) in metrics {
        let test = metric(validation.real_y(), validation.predictions_test());
        let per_fold: Vec<f64> = validation
            .folds()
            .iter()
            .map(|fold| metric(fold.train_truth(), fold.train_predictions()))
            .collect();
        out.insert(
            (*name).to_string(),
            MetricSummary {
                test,
                train_mean: mean(&per_fold),
                train_std: population_std(&per_fold),
            },
        );
    }
    out
}
