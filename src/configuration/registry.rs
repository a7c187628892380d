//! Name-to-component registry.

use super::domain::{ComponentKind, ConfigurationError};
use crate::{
    datasource::interpreter::{DataSourceInterpreter, GymInterpreter, StockInterpreter},
    interpreter::ResultInterpreter,
    oracle::{NaiveOracle, Oracle, OracleError, OracleSettings},
    upload::UploadStrategyKind,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds an oracle from its construction parameters.
pub type OracleFactory =
    Arc<dyn Fn(&OracleSettings) -> Result<Box<dyn Oracle>, OracleError> + Send + Sync>;

/// Components addressable by the names stored in configuration documents.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    oracles: HashMap<String, OracleFactory>,
    datasource_interpreters: HashMap<String, Arc<dyn DataSourceInterpreter>>,
    result_interpreters: HashMap<String, ResultInterpreter>,
    upload_strategies: HashMap<String, UploadStrategyKind>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in component.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new()
            .with_oracle(NaiveOracle::NAME, |settings: &OracleSettings| {
                NaiveOracle::from_settings(settings).map(|oracle| Box::new(oracle) as Box<dyn Oracle>)
            })
            .with_datasource_interpreter(Arc::new(GymInterpreter::default()))
            .with_datasource_interpreter(Arc::new(StockInterpreter));
        let with_results = ResultInterpreter::ALL
            .into_iter()
            .fold(registry, |acc, interpreter| {
                acc.with_result_interpreter(interpreter.name(), interpreter)
            });
        UploadStrategyKind::ALL
            .into_iter()
            .fold(with_results, |acc, kind| acc.with_upload_strategy(kind.name(), kind))
    }

    /// Registers an oracle factory under `name`.
    #[must_use]
    pub fn with_oracle<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&OracleSettings) -> Result<Box<dyn Oracle>, OracleError> + Send + Sync + 'static,
    {
        self.oracles.insert(name.into(), Arc::new(factory));
        self
    }

    /// Registers a data source interpreter under its own name.
    #[must_use]
    pub fn with_datasource_interpreter(mut self, interpreter: Arc<dyn DataSourceInterpreter>) -> Self {
        self.datasource_interpreters
            .insert(interpreter.name().to_owned(), interpreter);
        self
    }

    /// Registers a result interpreter under `name`.
    #[must_use]
    pub fn with_result_interpreter(
        mut self,
        name: impl Into<String>,
        interpreter: ResultInterpreter,
    ) -> Self {
        self.result_interpreters.insert(name.into(), interpreter);
        self
    }

    /// Registers an upload strategy under `name`.
    #[must_use]
    pub fn with_upload_strategy(mut self, name: impl Into<String>, kind: UploadStrategyKind) -> Self {
        self.upload_strategies.insert(name.into(), kind);
        self
    }

    /// Builds the oracle registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Unknown`] for unregistered names and
    /// [`ConfigurationError::OracleConstruction`] when the factory fails.
    pub fn oracle(
        &self,
        name: &str,
        settings: &OracleSettings,
    ) -> Result<Box<dyn Oracle>, ConfigurationError> {
        let factory = self
            .oracles
            .get(name)
            .ok_or_else(|| unknown(ComponentKind::Oracle, name))?;
        Ok(factory(settings)?)
    }

    /// Returns the data source interpreter registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Unknown`] for unregistered names.
    pub fn datasource_interpreter(
        &self,
        name: &str,
    ) -> Result<Arc<dyn DataSourceInterpreter>, ConfigurationError> {
        self.datasource_interpreters
            .get(name)
            .cloned()
            .ok_or_else(|| unknown(ComponentKind::DataSourceInterpreter, name))
    }

    /// Returns the result interpreter registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Unknown`] for unregistered names.
    pub fn result_interpreter(&self, name: &str) -> Result<ResultInterpreter, ConfigurationError> {
        self.result_interpreters
            .get(name)
            .copied()
            .ok_or_else(|| unknown(ComponentKind::ResultInterpreter, name))
    }

    /// Returns the upload strategy registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Unknown`] for unregistered names.
    pub fn upload_strategy(&self, name: &str) -> Result<UploadStrategyKind, ConfigurationError> {
        self.upload_strategies
            .get(name)
            .copied()
            .ok_or_else(|| unknown(ComponentKind::UploadStrategy, name))
    }
}

fn unknown(kind: ComponentKind, name: &str) -> ConfigurationError {
    ConfigurationError::Unknown {
        kind,
        name: name.to_owned(),
    }
}

fn sorted_names<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("oracles", &sorted_names(&self.oracles))
            .field(
                "datasource_interpreters",
                &sorted_names(&self.datasource_interpreters),
            )
            .field("result_interpreters", &sorted_names(&self.result_interpreters))
            .field("upload_strategies", &sorted_names(&self.upload_strategies))
            .finish()
    }
}
