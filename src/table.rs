//! Year-indexed numeric frames
//!
//! [`Table`] is the tabular currency of the crate: collaborators produce
//! them, the validator consumes them. Rows are keyed by a strictly
//! increasing integer year; values are stored row-major.

use rustc_hash::FxHashMap;

use crate::{Error, Result};

/// A dense numeric table indexed by year.
///
/// Invariants enforced at construction:
/// - index values are unique and strictly increasing,
/// - column names are unique,
/// - `values.len() == index.len() * columns.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index: Vec<i32>,
    columns: Vec<String>,
    lookup: FxHashMap<String, usize>,
    values: Vec<f64>,
}

impl Table {
    /// Create a table from a year index, column names, and row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Table`] if the index is not strictly increasing,
    /// a column name repeats, or the value buffer does not match the shape.
    pub fn new(index: Vec<i32>, columns: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != index.len() * columns.len() {
            return Err(Error::Table(format!(
                "value buffer has {} entries, expected {} ({} rows x {} columns)",
                values.len(),
                index.len() * columns.len(),
                index.len(),
                columns.len()
            )));
        }
        if let Some(w) = index.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::Table(format!(
                "index must be strictly increasing, found {} before {}",
                w[0], w[1]
            )));
        }
        let mut lookup = FxHashMap::default();
        for (i, name) in columns.iter().enumerate() {
            if lookup.insert(name.clone(), i).is_some() {
                return Err(Error::Table(format!("duplicate column name: {name}")));
            }
        }
        Ok(Self {
            index,
            columns,
            lookup,
            values,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// True if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The year index, in increasing order.
    #[must_use]
    pub fn index(&self) -> &[i32] {
        &self.index
    }

    /// Column names, in storage order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Row position of a year, if present.
    #[must_use]
    pub fn position(&self, year: i32) -> Option<usize> {
        self.index.binary_search(&year).ok()
    }

    /// One row of values, in column order.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        let w = self.columns.len();
        &self.values[row * w..(row + 1) * w]
    }

    fn col_index(&self, name: &str) -> Result<usize> {
        self.lookup
            .get(name)
            .copied()
            .ok_or_else(|| Error::Table(format!("no such column: {name}")))
    }

    /// All values of one column, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Table`] if the column does not exist.
    pub fn column_values(&self, name: &str) -> Result<Vec<f64>> {
        let c = self.col_index(name)?;
        let w = self.columns.len();
        Ok(self
            .values
            .chunks_exact(w)
            .map(|row| row[c])
            .collect())
    }

    /// A new table with only the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Table`] if any name is missing.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        let cols: Vec<usize> = names
            .iter()
            .map(|n| self.col_index(n))
            .collect::<Result<_>>()?;
        let w = self.columns.len();
        let mut values = Vec::with_capacity(self.index.len() * cols.len());
        for row in self.values.chunks_exact(w) {
            values.extend(cols.iter().map(|&c| row[c]));
        }
        Self::new(self.index.clone(), names.to_vec(), values)
    }

    /// Inner join with another table on the year index.
    ///
    /// Keeps rows whose year appears in both tables; the result carries
    /// `self`'s columns followed by `other`'s.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Table`] if the two tables share a column name.
    pub fn inner_join(&self, other: &Self) -> Result<Self> {
        if let Some(dup) = other.columns.iter().find(|c| self.lookup.contains_key(*c)) {
            return Err(Error::Table(format!(
                "cannot join: column {dup} present on both sides"
            )));
        }

        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        // Both indices are sorted; a merge walk finds the intersection.
        let mut index = Vec::new();
        let mut values = Vec::new();
        let (mut a, mut b) = (0, 0);
        while a < self.index.len() && b < other.index.len() {
            match self.index[a].cmp(&other.index[b]) {
                std::cmp::Ordering::Less => a += 1,
                std::cmp::Ordering::Greater => b += 1,
                std::cmp::Ordering::Equal => {
                    index.push(self.index[a]);
                    values.extend_from_slice(self.row(a));
                    values.extend_from_slice(other.row(b));
                    a += 1;
                    b += 1;
                }
            }
        }

        Self::new(index, columns, values)
    }
}
