//! Configuration documents and their typed view.

use crate::{company::domain::CompanyId, oracle::OracleError, oracle::OracleSettings};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::ports::ConfigurationRepositoryError;

/// Identifier of one configuration version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationId(Uuid);

impl ConfigurationId {
    /// Creates a new random configuration identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ConfigurationId {
    fn default() -> Self {
        Self::new()
    }
}

/// One stored configuration version of a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyConfiguration {
    id: ConfigurationId,
    company_id: CompanyId,
    configuration: Value,
    created_at: DateTime<Utc>,
}

impl CompanyConfiguration {
    /// Creates a configuration version stamped with the current time.
    #[must_use]
    pub fn new<C: Clock + ?Sized>(company_id: CompanyId, configuration: Value, clock: &C) -> Self {
        Self {
            id: ConfigurationId::new(),
            company_id,
            configuration,
            created_at: clock.utc(),
        }
    }

    /// Returns the version identifier.
    #[must_use]
    pub const fn id(&self) -> ConfigurationId {
        self.id
    }

    /// Returns the owning company.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the raw configuration document.
    #[must_use]
    pub const fn configuration(&self) -> &Value {
        &self.configuration
    }

    /// Returns when the version was recorded.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Parses the typed view of the document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfiguration`] when required
    /// keys are missing or mistyped.
    pub fn settings(&self) -> Result<ConfigurationSettings, ConfigurationError> {
        ConfigurationSettings::deserialize(&self.configuration)
            .map_err(|err| ConfigurationError::InvalidConfiguration(err.to_string()))
    }
}

/// Typed view of a configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSettings {
    /// Registry name of the oracle.
    pub oracle_class: String,
    /// Registry name of the data source interpreter.
    pub datasource_interpreter: String,
    /// Registry name of the result interpreter.
    pub prediction_result_interpreter: String,
    /// Registry name of the upload strategy; on-demand when absent.
    #[serde(default)]
    pub upload_strategy: Option<String>,
    /// Feature forecast by upload-triggered predictions.
    #[serde(default)]
    pub target_feature: Option<String>,
    /// Calendar handed to the oracle.
    #[serde(default)]
    pub calendar_name: Option<String>,
    /// Forecast horizon of upload-triggered predictions, in days.
    #[serde(default)]
    pub max_forecast_days: Option<u32>,
    /// Oracle model parameters.
    #[serde(default)]
    pub oracle: Value,
    /// Oracle scheduling parameters.
    #[serde(default)]
    pub scheduling: Value,
}

impl ConfigurationSettings {
    /// Returns the parameters handed to the oracle factory.
    #[must_use]
    pub fn oracle_settings(&self) -> OracleSettings {
        OracleSettings {
            calendar_name: self.calendar_name.clone(),
            scheduling: self.scheduling.clone(),
            oracle: self.oracle.clone(),
        }
    }
}

/// Kind of component resolved by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Forecasting oracle.
    Oracle,
    /// Data source interpreter.
    DataSourceInterpreter,
    /// Result interpreter.
    ResultInterpreter,
    /// Upload strategy.
    UploadStrategy,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Oracle => "oracle",
            Self::DataSourceInterpreter => "datasource interpreter",
            Self::ResultInterpreter => "result interpreter",
            Self::UploadStrategy => "upload strategy",
        })
    }
}

/// Errors raised while resolving a company's configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// The company has never been configured.
    #[error("company {0} has no configuration")]
    MissingConfiguration(CompanyId),

    /// The configuration document does not parse.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The configuration names a component the registry does not know.
    #[error("unknown {kind}: {name}")]
    Unknown {
        /// Kind of component looked up.
        kind: ComponentKind,
        /// Name that failed to resolve.
        name: String,
    },

    /// The oracle factory rejected its parameters.
    #[error("oracle construction failed: {0}")]
    OracleConstruction(#[from] OracleError),

    /// Configuration storage failed.
    #[error(transparent)]
    Repository(#[from] ConfigurationRepositoryError),
}
