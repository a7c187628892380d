//! Runtime settings.
//!
//! Settings come from built-in defaults, an optional TOML file, and
//! `AUGUR_*` environment overrides, applied in that order and then
//! validated.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "AUGUR_";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Read {
        /// File that failed to load.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings document does not parse.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override holds an unusable value.
    #[error("invalid value for {key}: {value}")]
    InvalidOverride {
        /// Environment variable name.
        key: String,
        /// Rejected value.
        value: String,
    },

    /// A setting is out of range.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        /// Offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// Service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Horizon of upload-triggered forecasts when a company sets none.
    pub max_forecast_days: u32,
    /// Text exported in place of missing forecast values.
    pub missing_value_placeholder: String,
    /// Age after which a non-terminal task is considered stalled.
    pub stalled_task_timeout_secs: u64,
    /// Root directory of the upload table store; in-memory when unset.
    pub store_root: Option<Utf8PathBuf>,
    /// Log output format.
    pub log_format: LogFormat,
    /// Deployment environment, used to pick the default log level.
    pub environment: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_forecast_days: 30,
            missing_value_placeholder: "N/A".to_owned(),
            stalled_task_timeout_secs: 3600,
            store_root: None,
            log_format: LogFormat::Pretty,
            environment: "development".to_owned(),
        }
    }
}

impl Settings {
    /// Parses settings from a TOML document; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] for malformed documents or unknown
    /// keys.
    pub fn from_toml_str(document: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(document)?)
    }

    /// Loads settings from `path`, or defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the file cannot be read or parsed.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, SettingsError> {
        let Some(file) = path else {
            return Ok(Self::default());
        };
        let document = std::fs::read_to_string(file).map_err(|source| SettingsError::Read {
            path: file.to_owned(),
            source,
        })?;
        Self::from_toml_str(&document)
    }

    /// Applies `AUGUR_*` overrides from `vars`.
    ///
    /// Pass `std::env::vars()` in production. Unrelated variables are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidOverride`] when a value does not
    /// parse.
    pub fn with_env_overrides<I, K, V>(mut self, vars: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (raw_key, raw_value) in vars {
            let Some(name) = raw_key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value: String = raw_value.into();
            let invalid = || SettingsError::InvalidOverride {
                key: raw_key.as_ref().to_owned(),
                value: value.clone(),
            };
            match name {
                "MAX_FORECAST_DAYS" => {
                    self.max_forecast_days = value.parse().map_err(|_| invalid())?;
                }
                "MISSING_VALUE_PLACEHOLDER" => self.missing_value_placeholder = value.clone(),
                "STALLED_TASK_TIMEOUT_SECS" => {
                    self.stalled_task_timeout_secs = value.parse().map_err(|_| invalid())?;
                }
                "STORE_ROOT" => self.store_root = Some(Utf8PathBuf::from(value.as_str())),
                "LOG_FORMAT" => {
                    self.log_format = match value.to_ascii_lowercase().as_str() {
                        "pretty" => LogFormat::Pretty,
                        "json" => LogFormat::Json,
                        _ => return Err(invalid()),
                    };
                }
                "ENV" => self.environment = value.clone(),
                _ => {}
            }
        }
        Ok(self)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for a zero horizon or timeout.
    pub fn validate(self) -> Result<Self, SettingsError> {
        if self.max_forecast_days == 0 {
            return Err(SettingsError::Invalid {
                field: "max_forecast_days",
                reason: "must be positive",
            });
        }
        if self.stalled_task_timeout_secs == 0 {
            return Err(SettingsError::Invalid {
                field: "stalled_task_timeout_secs",
                reason: "must be positive",
            });
        }
        Ok(self)
    }

    /// Returns the stalled-task timeout.
    #[must_use]
    pub fn stalled_task_timeout(&self) -> TimeDelta {
        i64::try_from(self.stalled_task_timeout_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}
