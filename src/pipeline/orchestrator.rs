//! Background execution of pipeline jobs.

use super::{
    context::PipelineContext,
    job::{JobKind, PipelineJob},
    request::{PredictionRequest, ValidationErrors},
};
use crate::{
    configuration::ConfigurationError,
    datasource::{
        domain::DataSource,
        interpreter::DataSourceInterpretError,
        ports::{DataSourceRepositoryError, FrameStoreError},
    },
    interpreter::InterpretError,
    oracle::{Oracle, OracleError, OracleInput, OracleOutput},
    task::{
        domain::{TaskDomainError, TaskState},
        ports::TaskRepositoryError,
        services::TaskLifecycleError,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use mockable::Clock;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Status message recorded while the oracle trains.
pub const TRAINING_MESSAGE: &str = "Training machine learning model";

/// Status message recorded while the oracle predicts.
pub const PREDICTION_MESSAGE: &str = "Prediction in progress";

/// Errors that abort a pipeline run.
///
/// The display text becomes the message of the task's `FAILED` status.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The prediction request failed validation.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// Task bookkeeping failed.
    #[error(transparent)]
    Task(#[from] TaskLifecycleError),

    /// The company configuration could not be resolved.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Data source lookup failed.
    #[error(transparent)]
    DataSource(#[from] DataSourceRepositoryError),

    /// The upload table could not be read.
    #[error(transparent)]
    FrameStore(#[from] FrameStoreError),

    /// The upload table could not be converted into oracle input.
    #[error(transparent)]
    DataSourceInterpretation(#[from] DataSourceInterpretError),

    /// The oracle raised.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// The forecast could not be interpreted.
    #[error(transparent)]
    ResultInterpretation(#[from] InterpretError),

    /// The blocking oracle call panicked or was aborted.
    #[error("oracle worker terminated: {0}")]
    Worker(String),
}

/// Executes pipeline jobs on behalf of a job queue.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Runs the job to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when any phase fails.
    async fn run(&self, job: &PipelineJob) -> Result<(), PipelineError>;

    /// Error callback invoked after `run` fails.
    async fn on_failure(&self, job: &PipelineJob, error: &PipelineError);

    /// Runs the job and routes failures through [`JobRunner::on_failure`].
    ///
    /// # Errors
    ///
    /// Returns the error `run` produced, after the callback has handled it.
    async fn execute(&self, job: PipelineJob) -> Result<(), PipelineError> {
        let outcome = self.run(&job).await;
        if let Err(err) = &outcome {
            self.on_failure(&job, err).await;
        }
        outcome
    }
}

/// Sequential train, predict, interpret, and persist pipeline.
pub struct Orchestrator<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    context: PipelineContext<C>,
}

impl<C> Clone for Orchestrator<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<C> Orchestrator<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    /// Creates an orchestrator over `context`.
    #[must_use]
    pub const fn new(context: PipelineContext<C>) -> Self {
        Self { context }
    }

    async fn set_status(
        &self,
        job: &PipelineJob,
        state: TaskState,
        message: Option<&str>,
    ) -> Result<(), PipelineError> {
        self.context
            .tasks
            .set_status(&job.task_code, state, message.map(str::to_owned))
            .await?;
        Ok(())
    }

    /// Validates the request of a prediction job and records it on the task.
    ///
    /// Training jobs forecast nothing and train as of the end of the upload.
    async fn prepare(
        &self,
        job: &PipelineJob,
        datasource: &DataSource,
    ) -> Result<(DateTime<Utc>, bool), PipelineError> {
        let JobKind::TrainAndPredict { prediction_request } = &job.kind else {
            let as_of = datasource
                .end_date()
                .map_or_else(|| self.context.clock.utc(), |date| {
                    date.and_time(NaiveTime::MIN).and_utc()
                });
            return Ok((as_of, false));
        };

        let request = match PredictionRequest::validate(prediction_request) {
            Ok(request) => request,
            Err(errors) => {
                warn!(task_code = %job.task_code, errors = %errors, "prediction request rejected");
                self.set_status(job, TaskState::Failed, Some(&errors.to_string()))
                    .await?;
                return Err(PipelineError::Validation(errors));
            }
        };
        self.context
            .tasks
            .record_prediction_request(&job.task_code, request.to_value())
            .await?;
        Ok((request.as_of(), true))
    }
}

async fn train_blocking(
    mut oracle: Box<dyn Oracle>,
    data: OracleInput,
    as_of: DateTime<Utc>,
) -> Result<(Box<dyn Oracle>, OracleInput), PipelineError> {
    let (oracle_back, data_back, outcome) = tokio::task::spawn_blocking(move || {
        let trained = oracle.train(&data, as_of);
        (oracle, data, trained)
    })
    .await
    .map_err(|err| PipelineError::Worker(err.to_string()))?;
    outcome?;
    Ok((oracle_back, data_back))
}

async fn predict_blocking(
    mut oracle: Box<dyn Oracle>,
    data: OracleInput,
    as_of: DateTime<Utc>,
) -> Result<OracleOutput, PipelineError> {
    let forecast = tokio::task::spawn_blocking(move || oracle.predict(&data, as_of, None))
        .await
        .map_err(|err| PipelineError::Worker(err.to_string()))??;
    Ok(forecast)
}

#[async_trait]
impl<C> JobRunner for Orchestrator<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    async fn run(&self, job: &PipelineJob) -> Result<(), PipelineError> {
        let Some(datasource) = self
            .context
            .datasources
            .find_by_upload_code(&job.upload_code)
            .await?
        else {
            warn!(
                task_code = %job.task_code,
                upload_code = %job.upload_code,
                "data source not found; skipping pipeline run"
            );
            return Ok(());
        };
        if self.context.tasks.find_by_code(&job.task_code).await?.is_none() {
            warn!(task_code = %job.task_code, "task not found; skipping pipeline run");
            return Ok(());
        }

        let (as_of, predicts) = self.prepare(job, &datasource).await?;
        self.set_status(job, TaskState::Started, None).await?;
        info!(
            task_code = %job.task_code,
            company_id = %job.company_id,
            upload_code = %job.upload_code,
            "pipeline started"
        );

        let configuration = self
            .context
            .configurations
            .require_configuration(job.company_id)
            .await?;
        let resolver = &self.context.configurations;
        let table = self.context.frames.get_table(datasource.location()).await?;
        let data = resolver
            .datasource_interpreter_for(&configuration)?
            .interpret(&table)?;
        let oracle = resolver.oracle_for(&configuration)?;

        self.set_status(job, TaskState::InProgress, Some(TRAINING_MESSAGE))
            .await?;
        let (trained, data_back) = train_blocking(oracle, data, as_of).await?;
        if !predicts {
            self.set_status(job, TaskState::Successful, None).await?;
            info!(task_code = %job.task_code, "training finished");
            return Ok(());
        }

        self.set_status(job, TaskState::InProgress, Some(PREDICTION_MESSAGE))
            .await?;
        let forecast = predict_blocking(trained, data_back, as_of).await?;
        let result = resolver
            .result_interpreter_for(&configuration)?
            .interpret(&forecast)?;

        self.context
            .tasks
            .store_result(&job.task_code, job.company_id, result)
            .await?;
        self.set_status(job, TaskState::Successful, None).await?;
        info!(task_code = %job.task_code, "prediction finished");
        Ok(())
    }

    async fn on_failure(&self, job: &PipelineJob, error: &PipelineError) {
        let message = error.to_string();
        match self
            .context
            .tasks
            .set_status(&job.task_code, TaskState::Failed, Some(message.clone()))
            .await
        {
            Ok(_) => warn!(task_code = %job.task_code, error = %message, "task failed"),
            Err(TaskLifecycleError::Domain(TaskDomainError::TaskAlreadyCompleted { state, .. })) => {
                debug!(
                    task_code = %job.task_code,
                    state = state.as_str(),
                    "task already completed; failure not recorded"
                );
            }
            Err(TaskLifecycleError::Repository(TaskRepositoryError::NotFound(_))) => {
                warn!(task_code = %job.task_code, error = %message, "failed job has no task");
            }
            Err(err) => {
                error!(
                    task_code = %job.task_code,
                    error = %message,
                    cause = %err,
                    "could not mark task as failed"
                );
            }
        }
    }
}
