//! Collaborator contracts
//!
//! The grid driver acquires its inputs from two external collaborators:
//! a climate source producing one target column per calendar day-of-year,
//! and a feature source producing component-reduced feature tables. Both
//! are consumed through traits so that the upstream pipelines (rolling
//! means, pivoting, significance filtering, PCA) stay outside this crate.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::table::Table;
use crate::{Error, Result};

/// Identity of one climate target column: a calendar day of year.
///
/// Rendered as zero-padded `"MM-DD"` in table column names. February 29
/// never occurs; the climate pipeline drops it before pivoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DayOfYear {
    /// Calendar month, 1-12.
    pub month: u32,
    /// Day of month, 1-31.
    pub day: u32,
}

impl DayOfYear {
    /// Create a day-of-year, rejecting out-of-range values and Feb 29.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Table`] for invalid month/day combinations.
    pub fn new(month: u32, day: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || (month == 2 && day == 29) {
            return Err(Error::Table(format!(
                "invalid day of year: month {month}, day {day}"
            )));
        }
        Ok(Self { month, day })
    }

    /// The table column name for this day: `"MM-DD"`.
    #[must_use]
    pub fn column_name(self) -> String {
        self.to_string()
    }

    /// Parse a `"MM-DD"` column name back into a day-of-year.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Table`] if the name is not of that form.
    pub fn parse(name: &str) -> Result<Self> {
        let (m, d) = name
            .split_once('-')
            .ok_or_else(|| Error::Table(format!("not a day-of-year column: {name}")))?;
        let month = m
            .parse()
            .map_err(|_| Error::Table(format!("not a day-of-year column: {name}")))?;
        let day = d
            .parse()
            .map_err(|_| Error::Table(format!("not a day-of-year column: {name}")))?;
        Self::new(month, day)
    }
}

impl fmt::Display for DayOfYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// Produces climate target tables: indexed by year, one column per
/// day-of-year (named `"MM-DD"`), values smoothed and filtered for
/// significance upstream.
pub trait ClimateSource: Send + Sync {
    /// Acquire the target table for one grid point.
    ///
    /// # Errors
    ///
    /// Implementations report acquisition failures as
    /// [`Error::Collaborator`]; the driver propagates them unmodified.
    fn get_climate(
        &self,
        stat: &str,
        day_window: usize,
        year_window: usize,
        p_threshold: f64,
    ) -> Result<Table>;
}

/// Produces component-reduced feature tables: indexed by year, columns
/// named `PCA1..PCAn`.
pub trait FeatureSource: Send + Sync {
    /// Acquire the feature table for one grid point.
    ///
    /// # Errors
    ///
    /// Implementations report acquisition failures as
    /// [`Error::Collaborator`].
    fn get_pca_features(&self, components: usize, year_window: usize) -> Result<Table>;
}

/// Column names `PCA1..PCAn`.
#[must_use]
pub fn pca_column_names(components: usize) -> Vec<String> {
    (1..=components).map(|i| format!("PCA{i}")).collect()
}

/// A [`FeatureSource`] over precomputed component tables, one per
/// temporal-window width.
///
/// Mirrors the precomputed-PCA workflow: components are fitted offline
/// once per window, and a request for `n` components selects the first
/// `n` columns of the stored table.
#[derive(Debug, Default)]
pub struct PrecomputedPcaFeatures {
    by_window: FxHashMap<usize, Table>,
}

impl PrecomputedPcaFeatures {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the component table for one temporal-window width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collaborator`] if the table's columns are not
    /// `PCA1..PCAn` or the window is already registered.
    pub fn insert_window(&mut self, year_window: usize, table: Table) -> Result<()> {
        let expected = pca_column_names(table.num_cols());
        if table.columns() != expected.as_slice() {
            return Err(Error::Collaborator(format!(
                "precomputed table for window {year_window} must have columns PCA1..PCA{}",
                table.num_cols()
            )));
        }
        if self.by_window.insert(year_window, table).is_some() {
            return Err(Error::Collaborator(format!(
                "window {year_window} registered twice"
            )));
        }
        Ok(())
    }
}

impl FeatureSource for PrecomputedPcaFeatures {
    fn get_pca_features(&self, components: usize, year_window: usize) -> Result<Table> {
        let table = self.by_window.get(&year_window).ok_or_else(|| {
            Error::Collaborator(format!(
                "no precomputed components for year window {year_window}"
            ))
        })?;
        if components > table.num_cols() {
            return Err(Error::Collaborator(format!(
                "requested {components} components, only {} precomputed for window {year_window}",
                table.num_cols()
            )));
        }
        table.select(&pca_column_names(components))
    }
}
