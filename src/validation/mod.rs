//! Temporal-block cross-validation
//!
//! Leave-one-out resampling where a symmetric window of temporally
//! adjacent samples is excluded from training along with the held-out
//! sample, preventing leakage through autocorrelation.

mod metrics;
mod temporal_block;

pub use metrics::{
    aggregate_metrics, mean, mean_squared_error, population_std, r_squared, MetricFn,
    MetricSummary,
};
pub use temporal_block::{Fold, TemporalBlockValidation};
