//! Persistence-forecast reference oracle.

use super::{Oracle, OracleError, OracleInput, OracleOutput, OracleSettings};
use crate::frame::Frame;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct NaiveParameters {
    horizon_days: u32,
    target_feature: Option<String>,
}

impl Default for NaiveParameters {
    fn default() -> Self {
        Self {
            horizon_days: 1,
            target_feature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FittedSeries {
    symbol: String,
    last: f64,
    spread: f64,
}

/// Oracle that repeats the last observation of every series.
///
/// Bounds are one population standard deviation either side of the last
/// value. Forecast rows start at the prediction time and step daily for
/// `horizon_days` (default 1). Trains on `target_feature`, or on the first
/// feature when none is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct NaiveOracle {
    parameters: NaiveParameters,
    fitted: Option<Vec<FittedSeries>>,
}

impl NaiveOracle {
    /// Registry name.
    pub const NAME: &'static str = "NaiveOracle";

    /// Builds the oracle from its construction parameters.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::InvalidInput`] when the `oracle` parameters do
    /// not parse or request a zero-day horizon.
    pub fn from_settings(settings: &OracleSettings) -> Result<Self, OracleError> {
        let parameters = if settings.oracle.is_null() {
            NaiveParameters::default()
        } else {
            NaiveParameters::deserialize(&settings.oracle)
                .map_err(|err| OracleError::InvalidInput(err.to_string()))?
        };
        if parameters.horizon_days == 0 {
            return Err(OracleError::InvalidInput(
                "horizon_days must be positive".to_owned(),
            ));
        }
        Ok(Self {
            parameters,
            fitted: None,
        })
    }

    fn training_frame<'a>(&self, data: &'a OracleInput) -> Result<&'a Frame, OracleError> {
        match &self.parameters.target_feature {
            Some(feature) => data.get(feature).ok_or_else(|| {
                OracleError::InvalidInput(format!("no series for target feature `{feature}`"))
            }),
            None => data
                .values()
                .next()
                .ok_or_else(|| OracleError::InvalidInput("no series to train on".to_owned())),
        }
    }
}

fn as_count(len: usize) -> f64 {
    u32::try_from(len).map_or(f64::from(u32::MAX), f64::from)
}

#[expect(
    clippy::float_arithmetic,
    reason = "population statistics over observed values"
)]
fn fit(symbol: &str, values: &[f64]) -> Option<FittedSeries> {
    let observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let last = *observed.last()?;
    let count = as_count(observed.len());
    let mean = observed.iter().sum::<f64>() / count;
    let variance = observed
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / count;
    Some(FittedSeries {
        symbol: symbol.to_owned(),
        last,
        spread: variance.sqrt(),
    })
}

impl Oracle for NaiveOracle {
    fn train(&mut self, data: &OracleInput, _as_of: DateTime<Utc>) -> Result<(), OracleError> {
        let frame = self.training_frame(data)?;
        let fitted: Vec<FittedSeries> = frame
            .columns()
            .iter()
            .filter_map(|symbol| fit(symbol, &frame.column(symbol).unwrap_or_default()))
            .collect();
        if fitted.is_empty() {
            return Err(OracleError::InvalidInput(
                "training series holds no observations".to_owned(),
            ));
        }
        self.fitted = Some(fitted);
        Ok(())
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "bounds are the last value plus or minus the spread"
    )]
    fn predict(
        &mut self,
        _data: &OracleInput,
        as_of: DateTime<Utc>,
        _target_timestamp: Option<DateTime<Utc>>,
    ) -> Result<OracleOutput, OracleError> {
        let fitted = self.fitted.as_ref().ok_or(OracleError::NotTrained)?;
        let symbols: Vec<&str> = fitted.iter().map(|series| series.symbol.as_str()).collect();
        let mut mean_forecast = Frame::new(symbols.iter().copied());
        let mut lower_bound = Frame::new(symbols.iter().copied());
        let mut upper_bound = Frame::new(symbols.iter().copied());

        let start = as_of.naive_utc();
        for step in 0..self.parameters.horizon_days {
            let timestamp = start + TimeDelta::days(i64::from(step));
            let invalid = |err: crate::frame::FrameError| OracleError::Failed(err.to_string());
            mean_forecast
                .push_row(timestamp, fitted.iter().map(|s| s.last).collect())
                .map_err(invalid)?;
            lower_bound
                .push_row(timestamp, fitted.iter().map(|s| s.last - s.spread).collect())
                .map_err(invalid)?;
            upper_bound
                .push_row(timestamp, fitted.iter().map(|s| s.last + s.spread).collect())
                .map_err(invalid)?;
        }

        Ok(OracleOutput::Cromulon {
            mean_forecast,
            lower_bound,
            upper_bound,
            current_timestamp: start,
        })
    }
}
