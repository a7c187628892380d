//! Family-tagged oracle forecasts.

use crate::frame::Frame;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Symbol-keyed values for a single timestamp, in oracle order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    entries: Vec<(String, f64)>,
}

impl Series {
    /// Creates an empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a value, replacing an earlier value for the same symbol.
    #[must_use]
    pub fn with(mut self, symbol: impl Into<String>, value: f64) -> Self {
        self.insert(symbol, value);
        self
    }

    /// Sets the value of `symbol`.
    pub fn insert(&mut self, symbol: impl Into<String>, value: f64) {
        let key = symbol.into();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value of `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == symbol)
            .map(|(_, value)| *value)
    }

    /// Iterates `(symbol, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    /// Returns the number of symbols.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the series holds no symbols.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Feature sensitivities reported alongside a forecast.
///
/// Feature names are mangled as `<feature>_<suffix>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSensitivity {
    /// Raw sensitivity per symbol, keyed by mangled feature name.
    pub per_symbol: BTreeMap<String, BTreeMap<String, f64>>,
    /// Raw sensitivity averaged across symbols, when the oracle provides it.
    pub average: Option<BTreeMap<String, f64>>,
}

/// Oracle family that produced a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleFamily {
    /// Multi-step forecasts with explicit bounds.
    Cromulon,
    /// Forecasts from a mean vector.
    Crocubot,
    /// Single-datapoint forecasts with feature sensitivities.
    MetaCrocubot,
}

impl OracleFamily {
    /// Returns the family name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cromulon => "cromulon",
            Self::Crocubot => "crocubot",
            Self::MetaCrocubot => "metacrocubot",
        }
    }
}

impl fmt::Display for OracleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw oracle forecast, one variant per oracle family.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleOutput {
    /// Cromulon forecast: timestamp-indexed frames.
    Cromulon {
        /// Mean forecast per timestamp and symbol.
        mean_forecast: Frame,
        /// Lower confidence bound.
        lower_bound: Frame,
        /// Upper confidence bound.
        upper_bound: Frame,
        /// Time the forecast was made.
        current_timestamp: NaiveDateTime,
    },
    /// Crocubot forecast: timestamp-indexed frames.
    Crocubot {
        /// Mean forecast per timestamp and symbol.
        mean_vector: Frame,
        /// Lower confidence bound.
        lower_bound: Frame,
        /// Upper confidence bound.
        upper_bound: Frame,
        /// Time the forecast was made.
        prediction_timestamp: DateTime<Utc>,
        /// Time the forecast refers to.
        target_timestamp: DateTime<Utc>,
    },
    /// Meta-Crocubot forecast: one datapoint plus feature sensitivities.
    MetaCrocubot {
        /// Mean forecast per symbol.
        mean_vector: Series,
        /// Lower confidence bound per symbol.
        lower_bound: Series,
        /// Upper confidence bound per symbol.
        upper_bound: Series,
        /// Sensitivity of the forecast to each input feature.
        feature_sensitivity: FeatureSensitivity,
        /// Time the forecast refers to.
        target_timestamp: NaiveDateTime,
    },
}

impl OracleOutput {
    /// Returns the family that produced the forecast.
    #[must_use]
    pub const fn family(&self) -> OracleFamily {
        match self {
            Self::Cromulon { .. } => OracleFamily::Cromulon,
            Self::Crocubot { .. } => OracleFamily::Crocubot,
            Self::MetaCrocubot { .. } => OracleFamily::MetaCrocubot,
        }
    }
}
