//! Datetime-indexed tabular values.
//!
//! [`Table`] is the shape persisted by data-source stores: rows keyed by
//! timestamp whose cells may be numeric, textual, or missing. [`Frame`] is
//! the purely numeric shape exchanged with oracles, where missing values are
//! represented as `NaN`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while building tables and frames.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// A row did not provide one value per column.
    #[error("row has {found} values but the table has {expected} columns")]
    RowLengthMismatch {
        /// Number of declared columns.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
}

/// A single stored cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Numeric observation.
    Number(f64),
    /// Categorical or label value.
    Text(String),
    /// Absent observation.
    Missing,
}

impl Cell {
    /// Returns the numeric value, treating text and missing cells as absent.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) | Self::Missing => None,
        }
    }

    /// Returns the text value when the cell is textual.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Number(_) | Self::Missing => None,
        }
    }
}

/// One row of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Row timestamp.
    pub timestamp: NaiveDateTime,
    /// One cell per table column.
    pub cells: Vec<Cell>,
}

/// Datetime-indexed table as persisted by data-source stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl Table {
    /// Creates an empty table with the given columns.
    #[must_use]
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::RowLengthMismatch`] when `cells` does not hold
    /// exactly one value per column.
    pub fn push_row(
        &mut self,
        timestamp: NaiveDateTime,
        cells: Vec<Cell>,
    ) -> Result<(), FrameError> {
        if cells.len() != self.columns.len() {
            return Err(FrameError::RowLengthMismatch {
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        self.rows.push(TableRow { timestamp, cells });
        Ok(())
    }

    /// Returns the column names in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Returns the position of a column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Returns `true` when the table holds no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Numeric, datetime-indexed frame with ordered columns.
///
/// Missing observations are stored as `NaN`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    index: Vec<NaiveDateTime>,
    values: Vec<Vec<f64>>,
}

impl Frame {
    /// Creates an empty frame with the given columns.
    #[must_use]
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            index: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Appends a row of values.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::RowLengthMismatch`] when `values` does not hold
    /// exactly one value per column.
    pub fn push_row(
        &mut self,
        timestamp: NaiveDateTime,
        values: Vec<f64>,
    ) -> Result<(), FrameError> {
        if values.len() != self.columns.len() {
            return Err(FrameError::RowLengthMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.index.push(timestamp);
        self.values.push(values);
        Ok(())
    }

    /// Builder-style variant of [`Frame::push_row`].
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::RowLengthMismatch`] on a column count mismatch.
    pub fn with_row(
        mut self,
        timestamp: NaiveDateTime,
        values: Vec<f64>,
    ) -> Result<Self, FrameError> {
        self.push_row(timestamp, values)?;
        Ok(self)
    }

    /// Returns the column names in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the row timestamps in insertion order.
    #[must_use]
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// Iterates `(timestamp, row values)` pairs in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDateTime, &[f64])> {
        self.index
            .iter()
            .copied()
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Returns the value at `timestamp` for `column`, if both exist.
    #[must_use]
    pub fn get(&self, timestamp: NaiveDateTime, column: &str) -> Option<f64> {
        let row = self.index.iter().position(|ts| *ts == timestamp)?;
        let col = self.columns.iter().position(|name| name == column)?;
        self.values.get(row).and_then(|values| values.get(col)).copied()
    }

    /// Returns all values of `column` in row order.
    #[must_use]
    pub fn column(&self, column: &str) -> Option<Vec<f64>> {
        let col = self.columns.iter().position(|name| name == column)?;
        Some(
            self.values
                .iter()
                .map(|row| row.get(col).copied().unwrap_or(f64::NAN))
                .collect(),
        )
    }

    /// Returns the number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` when the frame holds no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
