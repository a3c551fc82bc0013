//! # dendro-eval: grid-searched climate response models
//!
//! dendro-eval evaluates linear models relating component-reduced
//! tree-ring tracheid features to daily climate statistics, sweeping a
//! hyperparameter grid (temporal window × retained components) with
//! temporally-blocked leave-one-out cross-validation and persisting one
//! result row per (grid point, target day).
//!
//! ## Design
//!
//! - **Temporal-block validation**: every held-out year also excludes a
//!   symmetric window of neighboring years from training, preventing
//!   leakage through autocorrelation.
//! - **Owned-input workers**: each per-target task receives its own copy
//!   of the joined table; no shared mutable state, no data races.
//! - **All-or-nothing persistence**: a grid point's rows are committed in
//!   one transaction after every task completes.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dendro_eval::grid::{GridSearchConfig, GridSearchDriver};
//! use dendro_eval::store::ResultStore;
//! # use dendro_eval::sources::{ClimateSource, FeatureSource};
//!
//! # fn run(climate: &dyn ClimateSource, features: &dyn FeatureSource)
//! #     -> dendro_eval::Result<()> {
//! let config = GridSearchConfig::default();
//! let mut store = ResultStore::open("results.sqlite", &config.table_name)?;
//!
//! let report = GridSearchDriver::new(config).run(climate, features, &mut store)?;
//! println!(
//!     "{} rows written, {} targets failed",
//!     report.rows_written,
//!     report.failures.len()
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod evaluation;
pub mod grid;
pub mod model;
pub mod sources;
pub mod store;
pub mod table;
pub mod validation;

pub use error::{Error, Result};
