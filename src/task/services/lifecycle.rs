//! Service layer for task creation, status transitions, and results.

use crate::{
    company::domain::CompanyId,
    datasource::domain::DataSourceId,
    interpreter::CanonicalResult,
    task::{
        domain::{NewTask, Task, TaskCode, TaskDomainError, TaskKind, TaskResult, TaskState, TaskStatus},
        ports::{TaskRepository, TaskRepositoryError},
    },
};
use chrono::TimeDelta;
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Message recorded when the watchdog fails a stalled task.
const STALLED_TASK_MESSAGE: &str = "Task timed out without reaching a terminal state";

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    name: String,
    task_code: TaskCode,
    company_id: CompanyId,
    datasource_id: DataSourceId,
    kind: TaskKind,
}

impl CreateTaskRequest {
    /// Creates a prediction task request.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        task_code: TaskCode,
        company_id: CompanyId,
        datasource_id: DataSourceId,
    ) -> Self {
        Self {
            name: name.into(),
            task_code,
            company_id,
            datasource_id,
            kind: TaskKind::Prediction,
        }
    }

    /// Sets the task kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync + ?Sized,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> Clone for TaskLifecycleService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync + ?Sized,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates a task in the `QUEUED` state.
    ///
    /// The task and its first status row are stored atomically.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the name is blank or the task code
    /// is already taken.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        let CreateTaskRequest {
            name,
            task_code,
            company_id,
            datasource_id,
            kind,
        } = request;

        let task = Task::new(
            NewTask {
                name,
                task_code,
                company_id,
                datasource_id,
                kind,
            },
            &*self.clock,
        )?;
        self.repository.store(&task).await?;
        info!(
            task_code = %task.task_code(),
            company_id = %company_id,
            kind = task.kind().as_str(),
            "task queued"
        );
        Ok(task)
    }

    /// Appends a status row after validating the transition.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for unknown task codes and
    /// [`TaskDomainError`] when the transition is rejected, including any
    /// transition out of `SUCCESSFUL` or `FAILED`.
    pub async fn set_status(
        &self,
        task_code: &TaskCode,
        state: TaskState,
        message: Option<String>,
    ) -> TaskLifecycleResult<TaskStatus> {
        let mut task = self.require_task(task_code).await?;
        let status = task.transition(state, message, &*self.clock)?;
        self.repository.append_status(task_code, &status).await?;
        debug!(
            task_code = %task_code,
            state = state.as_str(),
            message = status.message().unwrap_or_default(),
            "task status appended"
        );
        Ok(status)
    }

    /// Returns the state of the last status row of a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for unknown task codes.
    pub async fn current_status(&self, task_code: &TaskCode) -> TaskLifecycleResult<Option<TaskState>> {
        Ok(self.require_task(task_code).await?.status())
    }

    /// Returns `true` once a task reached `SUCCESSFUL` or `FAILED`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for unknown task codes.
    pub async fn is_completed(&self, task_code: &TaskCode) -> TaskLifecycleResult<bool> {
        Ok(self.require_task(task_code).await?.is_completed())
    }

    /// Finds a task by code.
    ///
    /// Returns `Ok(None)` when no task has the code.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn find_by_code(&self, task_code: &TaskCode) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.repository.find_by_code(task_code).await?)
    }

    /// Returns all tasks for a data source, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn find_by_datasource(
        &self,
        datasource_id: DataSourceId,
    ) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.repository.find_by_datasource(datasource_id).await?)
    }

    /// Records the validated prediction request on a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for unknown task codes.
    pub async fn record_prediction_request(
        &self,
        task_code: &TaskCode,
        request: Value,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.require_task(task_code).await?;
        self.repository
            .update_prediction_request(task_code, &request)
            .await?;
        task.record_prediction_request(request);
        Ok(task)
    }

    /// Stores the canonical result of a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateResult`] when a result is
    /// already stored for the task.
    pub async fn store_result(
        &self,
        task_code: &TaskCode,
        company_id: CompanyId,
        result: CanonicalResult,
    ) -> TaskLifecycleResult<TaskResult> {
        let record = TaskResult::new(task_code.clone(), company_id, result, &*self.clock);
        self.repository.store_result(&record).await?;
        Ok(record)
    }

    /// Finds the result stored for a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn find_result(&self, task_code: &TaskCode) -> TaskLifecycleResult<Option<TaskResult>> {
        Ok(self.repository.find_result(task_code).await?)
    }

    /// Fails every non-terminal task whose latest status is older than
    /// `max_age`.
    ///
    /// Covers workers that crashed mid-run and left a task stuck in
    /// `STARTED` or `INPROGRESS`. Returns the codes of the failed tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails. A task
    /// that completes concurrently is skipped rather than reported.
    pub async fn fail_stalled_tasks(&self, max_age: TimeDelta) -> TaskLifecycleResult<Vec<TaskCode>> {
        let now = self.clock.utc();
        let mut failed = Vec::new();
        for task in self.repository.find_incomplete().await? {
            let last_activity = task
                .latest_status()
                .map_or_else(|| task.created_at(), TaskStatus::created_at);
            if now.signed_duration_since(last_activity) <= max_age {
                continue;
            }

            match self
                .set_status(
                    task.task_code(),
                    TaskState::Failed,
                    Some(STALLED_TASK_MESSAGE.to_owned()),
                )
                .await
            {
                Ok(_) => {
                    warn!(task_code = %task.task_code(), "stalled task marked as failed");
                    failed.push(task.task_code().clone());
                }
                Err(TaskLifecycleError::Domain(TaskDomainError::TaskAlreadyCompleted { .. })) => {
                    debug!(task_code = %task.task_code(), "stalled task completed concurrently");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(failed)
    }

    async fn require_task(&self, task_code: &TaskCode) -> TaskLifecycleResult<Task> {
        self.repository
            .find_by_code(task_code)
            .await?
            .ok_or_else(|| TaskRepositoryError::NotFound(task_code.clone()).into())
    }
}
