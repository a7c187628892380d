//! Submission and query facade used by the web tier.

use super::{
    context::PipelineContext,
    job::PipelineJob,
    queue::{JobQueue, JobQueueError},
};
use crate::{
    company::{
        domain::{ActionKind, CompanyId, CustomerAction},
        ports::ActionLogError,
    },
    configuration::{CompanyConfiguration, ConfigurationError},
    datasource::{
        domain::{DataSource, DataSourceDraft, UploadCode},
        ports::{DataSourceRepositoryError, FrameStoreError},
    },
    frame::Table,
    interpreter::{ExportError, prediction_result_to_table},
    settings::Settings,
    task::{
        domain::{Task, TaskCode, TaskKind, TaskResult, TaskState, TaskStatus},
        services::{CreateTaskRequest, TaskLifecycleError},
    },
    upload::{
        PredictionScheduler, ScheduledPrediction, UPLOAD_PREDICTION_PREFIX, UploadStrategyError,
    },
};
use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by [`ForecastService`].
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The upload code is unknown to the company.
    #[error("unknown upload code: {0}")]
    UnknownUpload(UploadCode),

    /// Original uploads cannot be deleted.
    #[error("data source {0} is the company's original upload and cannot be deleted")]
    OriginalDataSource(UploadCode),

    /// The company configuration could not be resolved.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Task bookkeeping failed.
    #[error(transparent)]
    Task(#[from] TaskLifecycleError),

    /// Data source storage failed.
    #[error(transparent)]
    DataSource(#[from] DataSourceRepositoryError),

    /// Upload table storage failed.
    #[error(transparent)]
    FrameStore(#[from] FrameStoreError),

    /// The audit log rejected an action.
    #[error(transparent)]
    ActionLog(#[from] ActionLogError),

    /// The job could not be queued.
    #[error(transparent)]
    Queue(#[from] JobQueueError),

    /// The upload strategy failed.
    #[error(transparent)]
    UploadStrategy(#[from] UploadStrategyError),

    /// The stored result could not be rendered for export.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Read model of a task for status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    /// Task code.
    pub task_code: TaskCode,
    /// Task name.
    pub name: String,
    /// Kind of work tracked.
    pub kind: TaskKind,
    /// Current state.
    pub status: Option<TaskState>,
    /// Status log in append order.
    pub statuses: Vec<TaskStatus>,
    /// Validated prediction request, once recorded.
    pub prediction_request: Option<Value>,
    /// Whether the task reached a terminal state.
    pub is_completed: bool,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            task_code: task.task_code().clone(),
            name: task.name().to_owned(),
            kind: task.kind(),
            status: task.status(),
            is_completed: task.is_completed(),
            statuses: task.statuses().to_vec(),
            prediction_request: task.prediction_request().cloned(),
        }
    }
}

/// Outcome of confirming an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedUpload {
    /// Stored data source.
    pub datasource: DataSource,
    /// Task scheduled by the company's upload strategy, if any.
    pub scheduled_task: Option<TaskCode>,
}

struct Submission<'a> {
    name: String,
    kind: TaskKind,
    action: ActionKind,
    datasource: &'a DataSource,
    request: Option<Value>,
}

/// Entry point for submitting work and reading task outcomes.
pub struct ForecastService<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    context: PipelineContext<C>,
    queue: Arc<dyn JobQueue>,
    missing_value_placeholder: String,
    stalled_task_timeout: TimeDelta,
}

impl<C> Clone for ForecastService<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            queue: Arc::clone(&self.queue),
            missing_value_placeholder: self.missing_value_placeholder.clone(),
            stalled_task_timeout: self.stalled_task_timeout,
        }
    }
}

impl<C> ForecastService<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    /// Creates a service that queues jobs on `queue`.
    #[must_use]
    pub fn new(context: PipelineContext<C>, queue: Arc<dyn JobQueue>) -> Self {
        let defaults = Settings::default();
        Self {
            context,
            queue,
            missing_value_placeholder: defaults.missing_value_placeholder.clone(),
            stalled_task_timeout: defaults.stalled_task_timeout(),
        }
    }

    /// Applies the export placeholder and stalled-task timeout of `settings`.
    #[must_use]
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.missing_value_placeholder
            .clone_from(&settings.missing_value_placeholder);
        self.stalled_task_timeout = settings.stalled_task_timeout();
        self
    }

    /// Returns the service context.
    #[must_use]
    pub const fn context(&self) -> &PipelineContext<C> {
        &self.context
    }

    /// Creates a prediction task and queues its train-and-predict job.
    ///
    /// The request document is validated by the job itself; a malformed
    /// request yields a `FAILED` task carrying the validation errors.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Configuration`] when the company has no
    /// configuration and [`ForecastError::UnknownUpload`] for unknown upload
    /// codes. Neither creates a task.
    pub async fn submit_prediction(
        &self,
        company_id: CompanyId,
        upload_code: &UploadCode,
        prediction_request: Value,
    ) -> Result<TaskCode, ForecastError> {
        let datasource = self.admit(company_id, upload_code).await?;
        let name = prediction_request
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .map_or_else(|| format!("PREDICTION-{upload_code}"), str::to_owned);
        self.submit(Submission {
            name,
            kind: TaskKind::Prediction,
            action: ActionKind::PredictionStarted,
            datasource: &datasource,
            request: Some(prediction_request),
        })
        .await
    }

    /// Creates a training task and queues its training job.
    ///
    /// # Errors
    ///
    /// Same as [`ForecastService::submit_prediction`].
    pub async fn submit_training(
        &self,
        company_id: CompanyId,
        upload_code: &UploadCode,
    ) -> Result<TaskCode, ForecastError> {
        let datasource = self.admit(company_id, upload_code).await?;
        self.submit(Submission {
            name: format!("TRAINING-{upload_code}"),
            kind: TaskKind::Training,
            action: ActionKind::TrainingStarted,
            datasource: &datasource,
            request: None,
        })
        .await
    }

    /// Checks the company is configured and owns the upload.
    async fn admit(
        &self,
        company_id: CompanyId,
        upload_code: &UploadCode,
    ) -> Result<DataSource, ForecastError> {
        self.context
            .configurations
            .require_configuration(company_id)
            .await?;
        self.find_datasource(company_id, upload_code).await
    }

    async fn find_datasource(
        &self,
        company_id: CompanyId,
        upload_code: &UploadCode,
    ) -> Result<DataSource, ForecastError> {
        self.context
            .datasources
            .find_by_upload_code(upload_code)
            .await?
            .filter(|datasource| datasource.company_id() == company_id)
            .ok_or_else(|| ForecastError::UnknownUpload(upload_code.clone()))
    }

    async fn submit(&self, submission: Submission<'_>) -> Result<TaskCode, ForecastError> {
        let Submission {
            name,
            kind,
            action,
            datasource,
            request,
        } = submission;
        let company_id = datasource.company_id();
        let task = self
            .context
            .tasks
            .create_task(
                CreateTaskRequest::new(name, TaskCode::generate(), company_id, datasource.id())
                    .with_kind(kind),
            )
            .await?;
        let task_code = task.task_code().clone();
        self.context
            .actions
            .record(&CustomerAction::new(company_id, action, &*self.context.clock))
            .await?;

        let upload_code = datasource.upload_code().clone();
        let job = request.map_or_else(
            || PipelineJob::train(task_code.clone(), company_id, upload_code.clone()),
            |prediction_request| {
                PipelineJob::train_and_predict(
                    task_code.clone(),
                    company_id,
                    upload_code.clone(),
                    prediction_request,
                )
            },
        );
        if let Err(err) = self.queue.enqueue(job).await {
            warn!(task_code = %task_code, error = %err, "job could not be queued");
            self.context
                .tasks
                .set_status(&task_code, TaskState::Failed, Some(err.to_string()))
                .await?;
            return Err(err.into());
        }
        info!(
            task_code = %task_code,
            company_id = %company_id,
            kind = kind.as_str(),
            "task submitted"
        );
        Ok(task_code)
    }

    /// Returns the polling view of a task.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Task`] when lookup fails.
    pub async fn get_task(&self, task_code: &TaskCode) -> Result<Option<TaskView>, ForecastError> {
        Ok(self
            .context
            .tasks
            .find_by_code(task_code)
            .await?
            .map(TaskView::from))
    }

    /// Returns the stored result of a task, or `None` when it has none.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Task`] when lookup fails.
    pub async fn get_result(&self, task_code: &TaskCode) -> Result<Option<TaskResult>, ForecastError> {
        Ok(self.context.tasks.find_result(task_code).await?)
    }

    /// Renders the stored result of a task as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Task`] when lookup fails and
    /// [`ForecastError::Export`] when the result cannot be rendered.
    pub async fn export_result_csv(
        &self,
        task_code: &TaskCode,
    ) -> Result<Option<String>, ForecastError> {
        self.get_result(task_code)
            .await?
            .map(|stored| {
                prediction_result_to_table(stored.result(), &self.missing_value_placeholder)
                    .to_csv()
                    .map_err(ForecastError::from)
            })
            .transpose()
    }

    /// Stores an upload and runs the company's upload strategy.
    ///
    /// The company's first upload is its original data source. Companies
    /// without a configuration keep the upload but schedule nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError`] when storage, auditing, or the strategy
    /// fails.
    pub async fn confirm_upload(
        &self,
        draft: DataSourceDraft,
        table: &Table,
    ) -> Result<ConfirmedUpload, ForecastError> {
        let company_id = draft.company_id;
        self.context.frames.put_table(&draft.location, table).await?;
        let is_original = self
            .context
            .datasources
            .list_for_company(company_id)
            .await?
            .is_empty();
        let datasource = DataSource::new(draft, is_original, &*self.context.clock);
        self.context.datasources.store(&datasource).await?;
        self.context
            .actions
            .record(&CustomerAction::new(
                company_id,
                ActionKind::FileUpload,
                &*self.context.clock,
            ))
            .await?;
        info!(
            upload_code = %datasource.upload_code(),
            company_id = %company_id,
            is_original,
            "upload confirmed"
        );

        let scheduled_task = match self
            .context
            .configurations
            .current_configuration(company_id)
            .await?
        {
            Some(configuration) => self.run_upload_strategy(&datasource, &configuration).await?,
            None => {
                debug!(company_id = %company_id, "company has no configuration; no upload strategy");
                None
            }
        };
        Ok(ConfirmedUpload {
            datasource,
            scheduled_task,
        })
    }

    /// Runs the upload strategy of `configuration` for `datasource`.
    ///
    /// Re-running for a data source that already has an upload-triggered
    /// task schedules nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError`] when the strategy cannot be resolved or
    /// scheduling fails.
    pub async fn run_upload_strategy(
        &self,
        datasource: &DataSource,
        configuration: &CompanyConfiguration,
    ) -> Result<Option<TaskCode>, ForecastError> {
        let strategy = self.context.configurations.upload_strategy_for(configuration)?;
        let already_scheduled = self
            .context
            .tasks
            .find_by_datasource(datasource.id())
            .await?
            .iter()
            .any(|task| task.name().starts_with(UPLOAD_PREDICTION_PREFIX));
        if already_scheduled {
            debug!(
                upload_code = %datasource.upload_code(),
                "upload prediction already scheduled"
            );
            return Ok(None);
        }
        Ok(strategy
            .run(datasource, configuration, self, &*self.context.clock)
            .await?)
    }

    /// Deletes a non-original upload and its stored table.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::UnknownUpload`] when the company does not own
    /// the upload and [`ForecastError::OriginalDataSource`] for the original
    /// upload.
    pub async fn delete_datasource(
        &self,
        company_id: CompanyId,
        upload_code: &UploadCode,
    ) -> Result<(), ForecastError> {
        let datasource = self.find_datasource(company_id, upload_code).await?;
        if datasource.is_original() {
            return Err(ForecastError::OriginalDataSource(upload_code.clone()));
        }
        self.context.frames.remove(datasource.location()).await?;
        self.context.datasources.delete(upload_code).await?;
        info!(upload_code = %upload_code, company_id = %company_id, "data source deleted");
        Ok(())
    }

    /// Fails tasks stuck in a non-terminal state past the stalled-task
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Task`] when lookup fails.
    pub async fn fail_stalled_tasks(&self) -> Result<Vec<TaskCode>, ForecastError> {
        Ok(self
            .context
            .tasks
            .fail_stalled_tasks(self.stalled_task_timeout)
            .await?)
    }
}

#[async_trait]
impl<C> PredictionScheduler for ForecastService<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    async fn schedule_prediction(
        &self,
        prediction: ScheduledPrediction,
    ) -> Result<TaskCode, UploadStrategyError> {
        let ScheduledPrediction {
            name,
            company_id,
            upload_code,
            prediction_request,
            ..
        } = prediction;
        let datasource = self
            .find_datasource(company_id, &upload_code)
            .await
            .map_err(UploadStrategyError::scheduling)?;
        self.submit(Submission {
            name,
            kind: TaskKind::Prediction,
            action: ActionKind::PredictionStarted,
            datasource: &datasource,
            request: Some(prediction_request),
        })
        .await
        .map_err(UploadStrategyError::scheduling)
    }
}
