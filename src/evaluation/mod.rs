//! Per-target evaluation workers
//!
//! One worker evaluates one climate target column against a fixed feature
//! matrix and temporal window. Workers are pure functions of their inputs
//! and mutate no shared state, so the driver can fan them out freely.

use serde::Serialize;

use crate::model::OlsFactory;
use crate::sources::DayOfYear;
use crate::table::Table;
use crate::validation::{
    aggregate_metrics, mean_squared_error, r_squared, MetricSummary, TemporalBlockValidation,
};
use crate::Result;

/// Outcome of evaluating one target column at one grid point.
///
/// Immutable once produced; consumed only by the result store.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    /// The evaluated target column.
    pub target: DayOfYear,
    /// Coefficient of determination summary.
    pub r2: MetricSummary,
    /// Mean squared error summary.
    pub mse: MetricSummary,
    /// Mean per-fold coefficients: `[coef_1, .., coef_p, intercept]`.
    pub coefficients: Vec<f64>,
    /// Held-out predictions, in year order.
    pub predictions_test: Vec<f64>,
    /// Real target values, in year order.
    pub real_y: Vec<f64>,
}

/// Evaluate one target column.
///
/// Restricts `joint` to `feature_columns` plus the target, runs a
/// temporal-block validation pass with the OLS factory, and aggregates
/// R² and MSE.
///
/// # Errors
///
/// Any validator or fit error is returned as-is; the caller attributes it
/// to this (grid point, target) pair.
pub fn evaluate_target(
    target: DayOfYear,
    joint: &Table,
    window: usize,
    feature_columns: &[String],
) -> Result<EvaluationResult> {
    let target_column = target.column_name();
    let mut columns = feature_columns.to_vec();
    columns.push(target_column.clone());
    let restricted = joint.select(&columns)?;

    let validation = TemporalBlockValidation::evaluate(
        &restricted,
        window,
        feature_columns,
        &target_column,
        &OlsFactory,
    )?;

    let metrics = aggregate_metrics(
        &validation,
        &[("R2", r_squared), ("MSE", mean_squared_error)],
    );
    let coefficients = validation.mean_coefficients()?;

    Ok(EvaluationResult {
        target,
        r2: metrics["R2"],
        mse: metrics["MSE"],
        coefficients,
        predictions_test: validation.predictions_test().to_vec(),
        real_y: validation.real_y().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::pca_column_names;

    #[test]
    fn test_evaluate_target_on_exact_relation() {
        // target = PCA1 - PCA2, exactly.
        let years: Vec<i32> = (2000..2012).collect();
        let mut values = Vec::new();
        for i in 0..years.len() {
            #[allow(clippy::cast_precision_loss)]
            let x1 = i as f64;
            let x2 = (x1 * 0.7).sin();
            values.extend([x1, x2, x1 - x2]);
        }
        let mut columns = pca_column_names(2);
        columns.push("06-15".to_string());
        let table = Table::new(years, columns, values).unwrap();

        let target = DayOfYear::new(6, 15).unwrap();
        let result = evaluate_target(target, &table, 2, &pca_column_names(2)).unwrap();

        assert_eq!(result.target, target);
        assert!((result.r2.test - 1.0).abs() < 1e-9);
        assert!(result.mse.test < 1e-12);
        // [1, -1, 0] generating coefficients.
        assert!((result.coefficients[0] - 1.0).abs() < 1e-9);
        assert!((result.coefficients[1] + 1.0).abs() < 1e-9);
        assert!(result.coefficients[2].abs() < 1e-9);
        assert_eq!(result.predictions_test.len(), result.real_y.len());
    }
}
