//! Grid-search driver
//!
//! Enumerates the (temporal window × component count) hyperparameter grid,
//! acquires inputs from the climate and feature collaborators at each grid
//! point, fans one evaluation task per target column out to a bounded
//! worker pool, and persists each grid point's results in one transaction.
//!
//! The driver runs single-threaded and is the only writer to the store.
//! Per-task failures are collected alongside successes at the fan-in
//! barrier: a failing target column never aborts its siblings, and the
//! report names exactly which (grid point, target) pairs failed.

mod pool;

pub use pool::WorkerPool;

use std::ops::Range;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::evaluation::evaluate_target;
use crate::sources::{ClimateSource, DayOfYear, FeatureSource};
use crate::store::{ResultRow, ResultStore};
use crate::{Error, Result};

/// Grid-search configuration with documented per-field defaults.
#[derive(Debug, Clone)]
pub struct GridSearchConfig {
    /// Temporal-window widths to sweep (half-open). Default `1..15`.
    pub year_window_range: Range<usize>,
    /// Retained component counts to sweep (half-open). Default `2..10`.
    pub component_range: Range<usize>,
    /// Day-window passed to the climate collaborator. Default `1`.
    pub day_window: usize,
    /// Significance threshold passed to the climate collaborator.
    /// Default `0.001`.
    pub p_threshold: f64,
    /// Run label tagging every persisted row. Default `"REAL"`.
    pub run_label: String,
    /// Destination table name, used when opening the result store.
    /// Default `"results"`.
    pub table_name: String,
    /// Worker pool size. Default `6`.
    pub max_workers: usize,
    /// Target statistic name requested from the climate collaborator.
    /// Default `"Temperature"`.
    pub stat: String,
    /// Per-grid-point deadline for worker tasks; a straggler becomes a
    /// reported [`Error::TaskTimeout`] for its target only. Default `None`
    /// (wait indefinitely).
    pub task_timeout: Option<Duration>,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            year_window_range: 1..15,
            component_range: 2..10,
            day_window: 1,
            p_threshold: 0.001,
            run_label: "REAL".to_string(),
            table_name: "results".to_string(),
            max_workers: 6,
            stat: "Temperature".to_string(),
            task_timeout: None,
        }
    }
}

/// One per-target failure, attributed to its grid point.
#[derive(Debug)]
pub struct TaskFailure {
    /// Temporal window of the failing grid point.
    pub year_window: usize,
    /// Component count of the failing grid point.
    pub components: usize,
    /// Target column whose evaluation failed.
    pub target: String,
    /// The failure itself, propagated unmodified.
    pub error: Error,
}

/// Summary of one grid-search run.
#[derive(Debug)]
pub struct GridSearchReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Rows persisted across all grid points.
    pub rows_written: u64,
    /// Per-target failures; successes were persisted regardless.
    pub failures: Vec<TaskFailure>,
}

/// Drives one grid-search pass over the configured hyperparameter grid.
pub struct GridSearchDriver {
    config: GridSearchConfig,
}

impl GridSearchDriver {
    /// Create a driver for the given configuration.
    #[must_use]
    pub const fn new(config: GridSearchConfig) -> Self {
        Self { config }
    }

    /// The driver's configuration.
    #[must_use]
    pub const fn config(&self) -> &GridSearchConfig {
        &self.config
    }

    /// Run the full grid, writing results into `store`.
    ///
    /// Traversal is outer temporal-window, inner component-count. A grid
    /// point whose joined feature/target table is empty persists zero rows
    /// and the run continues. Per-target failures are collected into the
    /// report; collaborator and store errors abort the run.
    ///
    /// # Errors
    ///
    /// - [`Error::Collaborator`] (or whatever a collaborator returns),
    ///   propagated unmodified.
    /// - [`Error::Persistence`] on store failure; the current grid point is
    ///   left uncommitted (all-or-nothing per point).
    pub fn run(
        &self,
        climate: &dyn ClimateSource,
        features: &dyn FeatureSource,
        store: &mut ResultStore,
    ) -> Result<GridSearchReport> {
        let pool = WorkerPool::new(self.config.max_workers)?;
        let started_at = Utc::now();
        let mut rows_written = 0u64;
        let mut failures = Vec::new();

        for year_window in self.config.year_window_range.clone() {
            let climate_table = climate.get_climate(
                &self.config.stat,
                self.config.day_window,
                year_window,
                self.config.p_threshold,
            )?;
            info!(
                year_window,
                targets = climate_table.num_cols(),
                "acquired climate targets"
            );

            for components in self.config.component_range.clone() {
                let feature_table = features.get_pca_features(components, year_window)?;
                let feature_columns = feature_table.columns().to_vec();
                let joint = feature_table.inner_join(&climate_table)?;

                if joint.is_empty() {
                    warn!(
                        year_window,
                        components, "features and targets share no years, skipping grid point"
                    );
                    continue;
                }

                // One task per target column; each owns its copy of the
                // joined table, so workers share no mutable state.
                let mut tasks: Vec<(String, _)> = Vec::with_capacity(climate_table.num_cols());
                for column in climate_table.columns() {
                    // Column naming is the climate collaborator's contract;
                    // a malformed name fails that column only.
                    let Ok(target) = DayOfYear::parse(column) else {
                        let error = Error::Collaborator(format!(
                            "climate column {column} is not a day-of-year name"
                        ));
                        warn!(year_window, components, target = %column, %error, "skipping target");
                        failures.push(TaskFailure {
                            year_window,
                            components,
                            target: column.clone(),
                            error,
                        });
                        continue;
                    };
                    let joint = joint.clone();
                    let feature_columns = feature_columns.clone();
                    tasks.push((column.clone(), move || {
                        evaluate_target(target, &joint, year_window, &feature_columns)
                    }));
                }

                // Fan-in barrier: nothing is persisted until every task of
                // this grid point has completed (or hit the deadline).
                let results = pool.run_tasks(tasks, self.config.task_timeout);

                let mut rows = Vec::new();
                for (label, result) in results {
                    match result {
                        Ok(evaluation) => rows.push(ResultRow::from_evaluation(
                            &self.config.run_label,
                            self.config.day_window,
                            year_window,
                            components,
                            &self.config.stat,
                            evaluation,
                        )),
                        Err(error) => {
                            warn!(
                                year_window,
                                components,
                                target = %label,
                                %error,
                                "target evaluation failed"
                            );
                            failures.push(TaskFailure {
                                year_window,
                                components,
                                target: label,
                                error,
                            });
                        }
                    }
                }

                let written = store.insert_batch(&rows)?;
                rows_written += written as u64;
                info!(year_window, components, rows = written, "grid point persisted");
            }
        }

        Ok(GridSearchReport {
            started_at,
            finished_at: Utc::now(),
            rows_written,
            failures,
        })
    }
}
