//! Result persistence
//!
//! One append-only SQLite table captures one evaluation outcome per row.
//! The grid driver is the only writer; every grid point is committed in a
//! single transaction, so a reader never observes a point half-persisted.

use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::evaluation::EvaluationResult;
use crate::sources::DayOfYear;
use crate::validation::MetricSummary;
use crate::{Error, Result};

/// Raw per-target payload stored as `details_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDetails {
    /// Mean per-fold coefficients, intercept last.
    pub coeffs: Vec<f64>,
    /// Held-out predictions, in year order.
    pub predictions_test: Vec<f64>,
    /// Real target values, in year order.
    pub real_y: Vec<f64>,
}

/// One persisted evaluation outcome: a flattened [`EvaluationResult`]
/// plus its grid-point tag and run label.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Free-text tag distinguishing this grid-search execution's rows.
    pub run_label: String,
    /// Day-window hyperparameter of the grid point.
    pub day_window: usize,
    /// Temporal-window hyperparameter of the grid point.
    pub year_window: usize,
    /// Component-count hyperparameter of the grid point.
    pub components: usize,
    /// Target statistic name (e.g. `"Temperature"`).
    pub stat: String,
    /// The evaluated target column.
    pub target: DayOfYear,
    /// Coefficient of determination summary.
    pub r2: MetricSummary,
    /// Mean squared error summary.
    pub mse: MetricSummary,
    /// Raw coefficient/prediction payload.
    pub details: ResultDetails,
}

impl ResultRow {
    /// Flatten one worker result into a persistable row.
    #[must_use]
    pub fn from_evaluation(
        run_label: &str,
        day_window: usize,
        year_window: usize,
        components: usize,
        stat: &str,
        result: EvaluationResult,
    ) -> Self {
        Self {
            run_label: run_label.to_string(),
            day_window,
            year_window,
            components,
            stat: stat.to_string(),
            target: result.target,
            r2: result.r2,
            mse: result.mse,
            details: ResultDetails {
                coeffs: result.coefficients,
                predictions_test: result.predictions_test,
                real_y: result.real_y,
            },
        }
    }
}

/// Append-only store for evaluation results, backed by SQLite.
pub struct ResultStore {
    conn: Connection,
    table_name: String,
}

fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::Other(format!("invalid table name: {name:?}")))
    }
}

impl ResultStore {
    /// Open (or create) a store file and ensure the result table exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] for a non-identifier table name, or
    /// [`Error::Persistence`] on SQLite failure.
    pub fn open<P: AsRef<Path>>(path: P, table_name: &str) -> Result<Self> {
        validate_table_name(table_name)?;
        let conn = Connection::open(path)?;
        Self::with_connection(conn, table_name)
    }

    /// Open an in-memory store (tests, dry runs).
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::open`].
    pub fn open_in_memory(table_name: &str) -> Result<Self> {
        validate_table_name(table_name)?;
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, table_name)
    }

    fn with_connection(conn: Connection, table_name: &str) -> Result<Self> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    run_label TEXT NOT NULL,
                    day_window INTEGER NOT NULL,
                    temporal_window INTEGER NOT NULL,
                    component_count INTEGER NOT NULL,
                    stat_name TEXT NOT NULL,
                    day_of_year_month INTEGER NOT NULL,
                    day_of_year_day INTEGER NOT NULL,
                    r2_test REAL NOT NULL,
                    r2_train_mean REAL NOT NULL,
                    r2_train_std REAL NOT NULL,
                    mse_test REAL NOT NULL,
                    mse_train_mean REAL NOT NULL,
                    mse_train_std REAL NOT NULL,
                    details_json TEXT NOT NULL
                )"
            ),
            [],
        )?;
        Ok(Self {
            conn,
            table_name: table_name.to_string(),
        })
    }

    /// Insert all rows in one transaction; all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] on SQLite failure (nothing is
    /// committed) or [`Error::Json`] if a details payload cannot be
    /// serialized.
    pub fn insert_batch(&mut self, rows: &[ResultRow]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                self.table_name
            ))?;
            for row in rows {
                let details_json = serde_json::to_string(&row.details)?;
                stmt.execute(rusqlite::params![
                    row.run_label,
                    i64::try_from(row.day_window).unwrap_or(i64::MAX),
                    i64::try_from(row.year_window).unwrap_or(i64::MAX),
                    i64::try_from(row.components).unwrap_or(i64::MAX),
                    row.stat,
                    row.target.month,
                    row.target.day,
                    row.r2.test,
                    row.r2.train_mean,
                    row.r2.train_std,
                    row.mse.test,
                    row.mse.train_mean,
                    row.mse.train_std,
                    details_json,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Total number of persisted rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] on SQLite failure.
    pub fn count(&self) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table_name),
            [],
            |r| r.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Number of persisted rows carrying a run label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] on SQLite failure.
    pub fn count_for_label(&self, run_label: &str) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE run_label = ?1",
                self.table_name
            ),
            [run_label],
            |r| r.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Read back every row, ordered by grid-point tag and target.
    ///
    /// Row order in the file is not meaningful; this imposes a canonical
    /// order so two runs over identical inputs compare equal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] on SQLite failure or [`Error::Json`]
    /// if a stored details payload is corrupt.
    pub fn fetch_all(&self) -> Result<Vec<ResultRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT run_label, day_window, temporal_window, component_count, stat_name,
                    day_of_year_month, day_of_year_day,
                    r2_test, r2_train_mean, r2_train_std,
                    mse_test, mse_train_mean, mse_train_std,
                    details_json
             FROM {}
             ORDER BY run_label, day_window, temporal_window, component_count,
                      stat_name, day_of_year_month, day_of_year_day",
            self.table_name
        ))?;

        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, i64>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, u32>(5)?,
                r.get::<_, u32>(6)?,
                [
                    r.get::<_, f64>(7)?,
                    r.get::<_, f64>(8)?,
                    r.get::<_, f64>(9)?,
                    r.get::<_, f64>(10)?,
                    r.get::<_, f64>(11)?,
                    r.get::<_, f64>(12)?,
                ],
                r.get::<_, String>(13)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (run_label, day_window, year_window, components, stat, month, day, m, details) =
                row?;
            out.push(ResultRow {
                run_label,
                day_window: usize::try_from(day_window).unwrap_or(0),
                year_window: usize::try_from(year_window).unwrap_or(0),
                components: usize::try_from(components).unwrap_or(0),
                stat,
                target: DayOfYear { month, day },
                r2: MetricSummary {
                    test: m[0],
                    train_mean: m[1],
                    train_std: m[2],
                },
                mse: MetricSummary {
                    test: m[3],
                    train_mean: m[4],
                    train_std: m[5],
                },
                details: serde_json::from_str(&details)?,
            });
        }
        Ok(out)
    }
}
