//! Result interpreters for each oracle family.

use super::canonical::{CanonicalResult, Datapoint, Factors, SymbolPrediction};
use super::factors::aggregate_factors;
use crate::frame::Frame;
use crate::oracle::{OracleFamily, OracleOutput, Series};
use chrono::{NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Errors raised while interpreting an oracle forecast.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterpretError {
    /// The interpreter does not understand the forecast's family.
    #[error("unsupported result type: interpreter `{interpreter}` cannot read {family} output")]
    UnsupportedResultType {
        /// Registry name of the interpreter.
        interpreter: &'static str,
        /// Family of the rejected forecast.
        family: OracleFamily,
    },

    /// A sensitivity symbol uses a name reserved by the factor breakdown.
    #[error("symbol `{0}` clashes with the factor breakdown's average key")]
    ReservedSymbol(String),
}

/// Named result interpreter selected per company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultInterpreter {
    /// Reads Cromulon forecasts.
    Cromulon,
    /// Reads Crocubot forecasts.
    Crocubot,
    /// Reads Meta-Crocubot forecasts, including factors.
    MetaCrocubot,
    /// Reads any known family.
    Auto,
}

impl ResultInterpreter {
    /// Every interpreter, in registration order.
    pub const ALL: [Self; 4] = [Self::Cromulon, Self::Crocubot, Self::MetaCrocubot, Self::Auto];

    /// Returns the registry name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cromulon => "cromulon",
            Self::Crocubot => "crocubot",
            Self::MetaCrocubot => "metacrocubot",
            Self::Auto => "auto",
        }
    }

    const fn accepts(self, family: OracleFamily) -> bool {
        match self {
            Self::Auto => true,
            Self::Cromulon => matches!(family, OracleFamily::Cromulon),
            Self::Crocubot => matches!(family, OracleFamily::Crocubot),
            Self::MetaCrocubot => matches!(family, OracleFamily::MetaCrocubot),
        }
    }

    /// Converts a raw forecast into the canonical result document.
    ///
    /// # Errors
    ///
    /// Returns [`InterpretError::UnsupportedResultType`] when the forecast
    /// comes from a family this interpreter does not read and
    /// [`InterpretError::ReservedSymbol`] when factor symbols cannot be
    /// serialised.
    pub fn interpret(self, output: &OracleOutput) -> Result<CanonicalResult, InterpretError> {
        let family = output.family();
        if !self.accepts(family) {
            return Err(InterpretError::UnsupportedResultType {
                interpreter: self.name(),
                family,
            });
        }

        Ok(match output {
            OracleOutput::Cromulon {
                mean_forecast,
                lower_bound,
                upper_bound,
                ..
            } => from_frames(mean_forecast, lower_bound, upper_bound),
            OracleOutput::Crocubot {
                mean_vector,
                lower_bound,
                upper_bound,
                ..
            } => from_frames(mean_vector, lower_bound, upper_bound),
            OracleOutput::MetaCrocubot {
                mean_vector,
                lower_bound,
                upper_bound,
                feature_sensitivity,
                target_timestamp,
            } => CanonicalResult {
                datapoints: vec![Datapoint {
                    timestamp: format_timestamp(*target_timestamp),
                    prediction: from_series(mean_vector, lower_bound, upper_bound),
                }],
                factors: aggregate_factors(feature_sensitivity)?,
            },
        })
    }
}

/// Renders a forecast timestamp: `YYYY-MM-DD` at midnight, otherwise
/// `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    if timestamp.time() == NaiveTime::MIN {
        timestamp.format("%Y-%m-%d").to_string()
    } else {
        timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[expect(clippy::float_arithmetic, reason = "rounding to two decimals")]
fn round2(value: Option<f64>) -> Option<f64> {
    value
        .filter(|raw| raw.is_finite())
        .map(|raw| (raw * 100.0).round() / 100.0)
}

fn from_frames(mean: &Frame, lower: &Frame, upper: &Frame) -> CanonicalResult {
    let datapoints = mean
        .rows()
        .map(|(timestamp, values)| Datapoint {
            timestamp: format_timestamp(timestamp),
            prediction: mean
                .columns()
                .iter()
                .zip(values)
                .map(|(symbol, value)| SymbolPrediction {
                    symbol: symbol.clone(),
                    value: round2(Some(*value)),
                    lower: round2(lower.get(timestamp, symbol)),
                    upper: round2(upper.get(timestamp, symbol)),
                })
                .collect(),
        })
        .collect();
    CanonicalResult {
        datapoints,
        factors: Factors::default(),
    }
}

fn from_series(mean: &Series, lower: &Series, upper: &Series) -> Vec<SymbolPrediction> {
    mean.iter()
        .map(|(symbol, value)| SymbolPrediction {
            symbol: symbol.to_owned(),
            value: round2(Some(value)),
            lower: round2(lower.get(symbol)),
            upper: round2(upper.get(symbol)),
        })
        .collect()
}
