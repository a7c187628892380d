//! Forecasting oracle capability.
//!
//! Oracles are black boxes that train on, and predict from, a map of named
//! series frames. Each oracle family reports its forecast in its own shape,
//! captured by the variants of [`OracleOutput`].

mod naive;
mod output;

pub use naive::NaiveOracle;
pub use output::{FeatureSensitivity, OracleFamily, OracleOutput, Series};

use crate::frame::Frame;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Oracle input: named series frames, one per feature.
pub type OracleInput = BTreeMap<String, Frame>;

/// Errors raised by oracle implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// `predict` was called before a successful `train`.
    #[error("oracle has not been trained")]
    NotTrained,

    /// The input data or parameters cannot be used.
    #[error("invalid oracle input: {0}")]
    InvalidInput(String),

    /// The oracle failed internally.
    #[error("{0}")]
    Failed(String),
}

/// Construction parameters handed to oracle factories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Trading or business calendar name.
    #[serde(default)]
    pub calendar_name: Option<String>,
    /// Scheduling parameters, opaque to the core.
    #[serde(default)]
    pub scheduling: Value,
    /// Model parameters, opaque to the core.
    #[serde(default)]
    pub oracle: Value,
}

/// A trainable forecasting engine.
///
/// Calls are blocking and may run for a long time; async callers run them on
/// a blocking thread.
#[cfg_attr(test, mockall::automock)]
pub trait Oracle: Send {
    /// Trains the oracle on `data` as of `as_of`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when training fails.
    fn train(&mut self, data: &OracleInput, as_of: DateTime<Utc>) -> Result<(), OracleError>;

    /// Produces a forecast from `data` as of `as_of`.
    ///
    /// The oracle chooses the target timestamp when `target_timestamp` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when prediction fails.
    fn predict(
        &mut self,
        data: &OracleInput,
        as_of: DateTime<Utc>,
        target_timestamp: Option<DateTime<Utc>>,
    ) -> Result<OracleOutput, OracleError>;
}
