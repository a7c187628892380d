//! Conversion of stored tables into oracle input.

use crate::{
    frame::{Cell, Frame, FrameError, Table},
    oracle::OracleInput,
};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use thiserror::Error;

/// Errors returned while converting a table into oracle input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataSourceInterpretError {
    /// A column the interpreter relies on is absent.
    #[error("table has no `{0}` column")]
    MissingColumn(String),

    /// A frame could not be assembled.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Converts a company's stored table into the dict-of-series shape oracles
/// consume.
pub trait DataSourceInterpreter: Send + Sync + fmt::Debug {
    /// Returns the registry name of the interpreter.
    fn name(&self) -> &'static str;

    /// Converts `table` into oracle input.
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceInterpretError`] when the table does not have the
    /// expected shape.
    fn interpret(&self, table: &Table) -> Result<OracleInput, DataSourceInterpretError>;
}

/// Wide-format interpreter for single-site series.
///
/// Every numeric column becomes a one-column frame named after the series.
/// Duplicate timestamps keep their first row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GymInterpreter {
    series_name: String,
}

impl GymInterpreter {
    /// Registry name.
    pub const NAME: &'static str = "GymDataSourceInterpreter";

    /// Series name used when none is configured.
    pub const DEFAULT_SERIES: &'static str = "UCBerkeley";

    /// Creates an interpreter that labels every frame with `series_name`.
    #[must_use]
    pub fn new(series_name: impl Into<String>) -> Self {
        Self {
            series_name: series_name.into(),
        }
    }
}

impl Default for GymInterpreter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SERIES)
    }
}

impl DataSourceInterpreter for GymInterpreter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interpret(&self, table: &Table) -> Result<OracleInput, DataSourceInterpretError> {
        let mut seen = HashSet::new();
        let rows: Vec<_> = table
            .rows()
            .iter()
            .filter(|row| seen.insert(row.timestamp))
            .collect();

        let mut input = OracleInput::new();
        for (position, column) in table.columns().iter().enumerate() {
            let is_textual = rows
                .iter()
                .any(|row| matches!(row.cells.get(position), Some(Cell::Text(_))));
            if is_textual {
                continue;
            }

            let mut frame = Frame::new([self.series_name.as_str()]);
            for row in &rows {
                let value = row
                    .cells
                    .get(position)
                    .and_then(Cell::as_number)
                    .unwrap_or(f64::NAN);
                frame.push_row(row.timestamp, vec![value])?;
            }
            input.insert(column.clone(), frame);
        }
        Ok(input)
    }
}

/// Long-format interpreter for multi-symbol market data.
///
/// Rows carry a ticker column; every other column is pivoted into one frame
/// per feature with one column per ticker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockInterpreter;

impl StockInterpreter {
    /// Registry name.
    pub const NAME: &'static str = "StockDataSourceInterpreter";

    /// Column holding the symbol of each row.
    pub const TICKER_COLUMN: &'static str = "Ticker";
}

impl DataSourceInterpreter for StockInterpreter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interpret(&self, table: &Table) -> Result<OracleInput, DataSourceInterpretError> {
        let ticker_position = table
            .column_index(Self::TICKER_COLUMN)
            .ok_or_else(|| DataSourceInterpretError::MissingColumn(Self::TICKER_COLUMN.to_owned()))?;

        let mut tickers = BTreeSet::new();
        let mut timestamps = BTreeSet::new();
        for row in table.rows() {
            if let Some(ticker) = row.cells.get(ticker_position).and_then(Cell::as_text) {
                tickers.insert(ticker.to_owned());
                timestamps.insert(row.timestamp);
            }
        }

        let mut input = OracleInput::new();
        for (position, feature) in table.columns().iter().enumerate() {
            if position == ticker_position {
                continue;
            }
            let mut cells: BTreeMap<(NaiveDateTime, &str), f64> = BTreeMap::new();
            for row in table.rows() {
                let Some(ticker) = row.cells.get(ticker_position).and_then(Cell::as_text) else {
                    continue;
                };
                if let Some(value) = row.cells.get(position).and_then(Cell::as_number) {
                    cells.insert((row.timestamp, ticker), value);
                }
            }

            let mut frame = Frame::new(tickers.iter().map(String::as_str));
            for timestamp in &timestamps {
                let values = tickers
                    .iter()
                    .map(|ticker| {
                        cells
                            .get(&(*timestamp, ticker.as_str()))
                            .copied()
                            .unwrap_or(f64::NAN)
                    })
                    .collect();
                frame.push_row(*timestamp, values)?;
            }
            input.insert(feature.clone(), frame);
        }
        Ok(input)
    }
}
