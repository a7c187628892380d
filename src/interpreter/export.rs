//! Tabular projection of stored results for CSV export.

use super::canonical::{CanonicalResult, SymbolPrediction};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while rendering an export table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A record could not be written.
    #[error("failed to write CSV record: {0}")]
    Write(#[from] csv::Error),

    /// The buffered output could not be flushed.
    #[error("failed to flush CSV output: {0}")]
    Flush(std::io::Error),

    /// The rendered output was not UTF-8.
    #[error("CSV output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// One export row: a timestamp and one `lower;value;upper` cell per symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    /// Datapoint timestamp as stored.
    pub timestamp: String,
    /// Formatted cells keyed by symbol.
    pub cells: BTreeMap<String, String>,
}

/// Timestamp-indexed export view of a result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    symbols: Vec<String>,
    rows: Vec<ExportRow>,
}

impl ExportTable {
    /// Returns the symbol columns in first-seen order.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Returns the rows in datapoint order.
    #[must_use]
    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }

    /// Renders the table as CSV with a `timestamp` column first.
    ///
    /// Symbols absent from a row leave an empty cell.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when the CSV writer rejects a record or the
    /// output is not valid UTF-8.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(
            std::iter::once("timestamp").chain(self.symbols.iter().map(String::as_str)),
        )?;
        for row in &self.rows {
            let cells = self
                .symbols
                .iter()
                .map(|symbol| row.cells.get(symbol).map_or("", String::as_str));
            writer.write_record(std::iter::once(row.timestamp.as_str()).chain(cells))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| ExportError::Flush(err.into_error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

fn format_bound(value: Option<f64>, placeholder: &str) -> String {
    value.map_or_else(|| placeholder.to_owned(), |number| format!("{number:.2}"))
}

fn format_cell(prediction: &SymbolPrediction, placeholder: &str) -> String {
    format!(
        "{};{};{}",
        format_bound(prediction.lower, placeholder),
        format_bound(prediction.value, placeholder),
        format_bound(prediction.upper, placeholder)
    )
}

/// Projects a canonical result into an export table.
///
/// Missing values render as `placeholder`. The projection is pure: the same
/// result always yields the same table.
#[must_use]
pub fn prediction_result_to_table(result: &CanonicalResult, placeholder: &str) -> ExportTable {
    let mut symbols: Vec<String> = Vec::new();
    let rows = result
        .datapoints
        .iter()
        .map(|datapoint| {
            let cells = datapoint
                .prediction
                .iter()
                .map(|prediction| {
                    if !symbols.contains(&prediction.symbol) {
                        symbols.push(prediction.symbol.clone());
                    }
                    (prediction.symbol.clone(), format_cell(prediction, placeholder))
                })
                .collect();
            ExportRow {
                timestamp: datapoint.timestamp.clone(),
                cells,
            }
        })
        .collect();
    ExportTable { symbols, rows }
}
