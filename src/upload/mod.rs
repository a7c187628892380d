//! Policies deciding what happens after an upload is confirmed.
//!
//! The on-demand strategy does nothing. The train-and-predict strategy
//! synthesises a prediction request covering the days after the upload and
//! hands it to a [`PredictionScheduler`], which creates the task and queues
//! the pipeline job.

use crate::{
    company::domain::CompanyId,
    configuration::CompanyConfiguration,
    datasource::domain::{DataSource, DataSourceId, UploadCode},
    task::domain::TaskCode,
};
use async_trait::async_trait;
use chrono::{SecondsFormat, TimeDelta};
use mockable::Clock;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Name prefix of upload-triggered prediction tasks.
pub const UPLOAD_PREDICTION_PREFIX: &str = "ON-UPLOAD-PREDICTION-";

/// Errors raised while running an upload strategy.
#[derive(Debug, Clone, Error)]
pub enum UploadStrategyError {
    /// The follow-up prediction could not be scheduled.
    #[error("failed to schedule upload prediction: {0}")]
    Scheduling(Arc<dyn std::error::Error + Send + Sync>),
}

impl UploadStrategyError {
    /// Wraps a scheduling error.
    pub fn scheduling(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Scheduling(Arc::new(err))
    }
}

/// A prediction to create and queue on behalf of an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledPrediction {
    /// Task name.
    pub name: String,
    /// Owning company.
    pub company_id: CompanyId,
    /// Data source to predict from.
    pub datasource_id: DataSourceId,
    /// Upload code of the data source.
    pub upload_code: UploadCode,
    /// Unvalidated prediction request document.
    pub prediction_request: Value,
}

/// Creates a queued task and enqueues its train-and-predict job.
#[async_trait]
pub trait PredictionScheduler: Send + Sync {
    /// Schedules `prediction` and returns the code of the created task.
    ///
    /// # Errors
    ///
    /// Returns [`UploadStrategyError::Scheduling`] when the task cannot be
    /// created or queued.
    async fn schedule_prediction(
        &self,
        prediction: ScheduledPrediction,
    ) -> Result<TaskCode, UploadStrategyError>;
}

/// Registered upload strategy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStrategyKind {
    /// Do nothing after an upload.
    OnDemandPrediction,
    /// Train and predict right after an upload.
    TrainAndPredictOnUpload,
}

impl UploadStrategyKind {
    /// Every strategy, in registration order.
    pub const ALL: [Self; 2] = [Self::OnDemandPrediction, Self::TrainAndPredictOnUpload];

    /// Returns the registry name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OnDemandPrediction => "OnDemandPredictionStrategy",
            Self::TrainAndPredictOnUpload => "TrainAndPredictOnUploadStrategy",
        }
    }
}

/// Upload strategy resolved for a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// Predictions happen only on request.
    OnDemandPrediction,
    /// Every upload triggers a prediction from its last day.
    TrainAndPredictOnUpload {
        /// Days forecast past the end of the upload.
        horizon_days: u32,
    },
}

impl UploadStrategy {
    /// Returns the registered kind of the strategy.
    #[must_use]
    pub const fn kind(self) -> UploadStrategyKind {
        match self {
            Self::OnDemandPrediction => UploadStrategyKind::OnDemandPrediction,
            Self::TrainAndPredictOnUpload { .. } => UploadStrategyKind::TrainAndPredictOnUpload,
        }
    }

    /// Runs the strategy for a freshly confirmed upload.
    ///
    /// Returns the code of the scheduled task, if any. An upload without an
    /// end date cannot anchor a forecast and is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`UploadStrategyError`] when scheduling fails.
    pub async fn run<S, C>(
        self,
        datasource: &DataSource,
        configuration: &CompanyConfiguration,
        scheduler: &S,
        clock: &C,
    ) -> Result<Option<TaskCode>, UploadStrategyError>
    where
        S: PredictionScheduler + ?Sized,
        C: Clock + Send + Sync + ?Sized,
    {
        let Self::TrainAndPredictOnUpload { horizon_days } = self else {
            return Ok(None);
        };
        let Some(end_date) = datasource.end_date() else {
            warn!(
                upload_code = %datasource.upload_code(),
                "upload has no end date; skipping upload-triggered prediction"
            );
            return Ok(None);
        };

        let now = clock.utc().to_rfc3339_opts(SecondsFormat::Secs, true);
        let name = format!("{UPLOAD_PREDICTION_PREFIX}{now}");
        let end_time = end_date + TimeDelta::days(i64::from(horizon_days));
        let prediction_request = json!({
            "name": name,
            "features": [datasource.target_feature()],
            "start_time": end_date.format("%Y-%m-%d").to_string(),
            "end_time": end_time.format("%Y-%m-%d").to_string(),
        });

        let company_id = configuration.company_id();
        let task_code = scheduler
            .schedule_prediction(ScheduledPrediction {
                name,
                company_id,
                datasource_id: datasource.id(),
                upload_code: datasource.upload_code().clone(),
                prediction_request,
            })
            .await?;
        debug!(
            task_code = %task_code,
            company_id = %company_id,
            "upload-triggered prediction scheduled"
        );
        Ok(Some(task_code))
    }
}
