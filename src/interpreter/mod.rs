//! Normalisation of oracle forecasts into the canonical result document.
//!
//! Every oracle family is converted into the same
//! `{datapoints: [...], factors: {...}}` shape, which is persisted per task
//! and projected into export tables.

mod canonical;
mod export;
mod factors;
mod prediction;

pub use canonical::{CanonicalResult, Datapoint, Factor, FactorBreakdown, Factors, SymbolPrediction};
pub use export::{ExportError, ExportRow, ExportTable, prediction_result_to_table};
pub use factors::aggregate_factors;
pub use prediction::{InterpretError, ResultInterpreter, format_timestamp};
