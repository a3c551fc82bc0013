//! Error types for dendro-eval
//!
//! Every failure mode carries enough context to attribute it to the
//! (grid point, target column) that produced it.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// dendro-eval error types
#[derive(Error, Debug)]
pub enum Error {
    /// Training set for a fold is empty or too small to fit the model
    #[error("insufficient training data for held-out year {year}: {remaining} rows remain after excluding the ±{half_window} year window (need at least {needed})")]
    InsufficientData {
        /// Held-out year whose fold could not be trained
        year: i32,
        /// Training rows remaining after window exclusion
        remaining: usize,
        /// Minimum training rows required by the model
        needed: usize,
        /// Years excluded on each side of the held-out year
        half_window: usize,
    },

    /// Numerically singular or otherwise unfittable design matrix
    #[error("model fit failed: {0}")]
    ModelFit(String),

    /// Coefficient extraction requested on a model family without linear coefficients
    #[error("unsupported model family: {0}")]
    UnsupportedModel(String),

    /// Worker task did not complete before the configured deadline
    #[error("evaluation of target column {target} timed out after {timeout:?}")]
    TaskTimeout {
        /// Target column whose task was abandoned
        target: String,
        /// Configured per-grid-point deadline
        timeout: std::time::Duration,
    },

    /// Upstream data-acquisition failure (climate or feature collaborator)
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// Table shape, index, or column error
    #[error("table error: {0}")]
    Table(String),

    /// Store write/read failure
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// Details payload serialization failure
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
