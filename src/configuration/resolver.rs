//! Company configuration resolution service.

use super::{
    domain::{CompanyConfiguration, ConfigurationError, ConfigurationSettings},
    ports::ConfigurationRepository,
    registry::ComponentRegistry,
};
use crate::{
    company::domain::CompanyId,
    datasource::interpreter::DataSourceInterpreter,
    interpreter::ResultInterpreter,
    oracle::Oracle,
    upload::{UploadStrategy, UploadStrategyKind},
};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Resolves a company's latest configuration into concrete components.
pub struct ConfigurationResolver<R, C>
where
    R: ConfigurationRepository + ?Sized,
    C: Clock + Send + Sync + ?Sized,
{
    repository: Arc<R>,
    registry: Arc<ComponentRegistry>,
    clock: Arc<C>,
    default_horizon_days: u32,
}

impl<R, C> Clone for ConfigurationResolver<R, C>
where
    R: ConfigurationRepository + ?Sized,
    C: Clock + Send + Sync + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
            default_horizon_days: self.default_horizon_days,
        }
    }
}

impl<R, C> ConfigurationResolver<R, C>
where
    R: ConfigurationRepository + ?Sized,
    C: Clock + Send + Sync + ?Sized,
{
    /// Forecast horizon used when a configuration sets no `max_forecast_days`.
    pub const DEFAULT_HORIZON_DAYS: u32 = 30;

    /// Creates a resolver backed by `repository` and `registry`.
    #[must_use]
    pub const fn new(repository: Arc<R>, registry: Arc<ComponentRegistry>, clock: Arc<C>) -> Self {
        Self {
            repository,
            registry,
            clock,
            default_horizon_days: Self::DEFAULT_HORIZON_DAYS,
        }
    }

    /// Overrides the default upload forecast horizon.
    #[must_use]
    pub const fn with_default_horizon(mut self, days: u32) -> Self {
        self.default_horizon_days = days;
        self
    }

    /// Validates and appends a new configuration version.
    ///
    /// Every component the document names must resolve; the oracle is
    /// constructed once to check its parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the document is malformed, names
    /// an unknown component, or cannot be stored.
    pub async fn record_configuration(
        &self,
        company_id: CompanyId,
        document: Value,
    ) -> Result<CompanyConfiguration, ConfigurationError> {
        let configuration = CompanyConfiguration::new(company_id, document, &*self.clock);
        let settings = configuration.settings()?;
        self.check_components(&settings)?;
        self.repository.append(&configuration).await?;
        info!(
            company_id = %company_id,
            oracle = %settings.oracle_class,
            "company configuration recorded"
        );
        Ok(configuration)
    }

    fn check_components(&self, settings: &ConfigurationSettings) -> Result<(), ConfigurationError> {
        self.registry
            .oracle(&settings.oracle_class, &settings.oracle_settings())?;
        self.registry
            .datasource_interpreter(&settings.datasource_interpreter)?;
        self.registry
            .result_interpreter(&settings.prediction_result_interpreter)?;
        if let Some(name) = &settings.upload_strategy {
            self.registry.upload_strategy(name)?;
        }
        Ok(())
    }

    /// Returns the company's latest configuration, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Repository`] when storage fails.
    pub async fn current_configuration(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<CompanyConfiguration>, ConfigurationError> {
        Ok(self.repository.latest_for_company(company_id).await?)
    }

    /// Returns the company's latest configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingConfiguration`] when the company
    /// has never been configured.
    pub async fn require_configuration(
        &self,
        company_id: CompanyId,
    ) -> Result<CompanyConfiguration, ConfigurationError> {
        self.current_configuration(company_id)
            .await?
            .ok_or(ConfigurationError::MissingConfiguration(company_id))
    }

    /// Returns every configuration version of the company, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Repository`] when storage fails.
    pub async fn history(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<CompanyConfiguration>, ConfigurationError> {
        Ok(self.repository.history_for_company(company_id).await?)
    }

    /// Resolves the data source interpreter a configuration names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the document is malformed or the
    /// name is unknown.
    pub fn datasource_interpreter_for(
        &self,
        configuration: &CompanyConfiguration,
    ) -> Result<Arc<dyn DataSourceInterpreter>, ConfigurationError> {
        let settings = configuration.settings()?;
        self.registry
            .datasource_interpreter(&settings.datasource_interpreter)
    }

    /// Resolves the result interpreter a configuration names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the document is malformed or the
    /// name is unknown.
    pub fn result_interpreter_for(
        &self,
        configuration: &CompanyConfiguration,
    ) -> Result<ResultInterpreter, ConfigurationError> {
        let settings = configuration.settings()?;
        self.registry
            .result_interpreter(&settings.prediction_result_interpreter)
    }

    /// Resolves the upload strategy of a configuration.
    ///
    /// Defaults to on-demand prediction. Upload-triggered forecasts span
    /// `max_forecast_days`, or the resolver's default horizon.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the document is malformed or the
    /// name is unknown.
    pub fn upload_strategy_for(
        &self,
        configuration: &CompanyConfiguration,
    ) -> Result<UploadStrategy, ConfigurationError> {
        let settings = configuration.settings()?;
        let Some(name) = settings.upload_strategy.as_deref() else {
            return Ok(UploadStrategy::OnDemandPrediction);
        };
        Ok(match self.registry.upload_strategy(name)? {
            UploadStrategyKind::OnDemandPrediction => UploadStrategy::OnDemandPrediction,
            UploadStrategyKind::TrainAndPredictOnUpload => UploadStrategy::TrainAndPredictOnUpload {
                horizon_days: settings
                    .max_forecast_days
                    .unwrap_or(self.default_horizon_days),
            },
        })
    }

    /// Builds a fresh oracle from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the oracle name is unknown or the
    /// factory rejects its parameters.
    pub fn oracle_for(
        &self,
        configuration: &CompanyConfiguration,
    ) -> Result<Box<dyn Oracle>, ConfigurationError> {
        let settings = configuration.settings()?;
        self.registry
            .oracle(&settings.oracle_class, &settings.oracle_settings())
    }
}
