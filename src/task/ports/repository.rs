//! Repository port for task, status log, and result persistence.

use crate::{
    datasource::domain::DataSourceId,
    task::domain::{Task, TaskCode, TaskResult, TaskStatus},
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
///
/// Status rows are append-only: implementations never rewrite or remove a
/// stored [`TaskStatus`].
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task together with its initial status log, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the task code
    /// already exists.
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Appends one status row to an existing task.
    ///
    /// No transition validation happens at this layer; the row order is the
    /// append order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn append_status(
        &self,
        task_code: &TaskCode,
        status: &TaskStatus,
    ) -> TaskRepositoryResult<()>;

    /// Replaces the recorded prediction request of a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn update_prediction_request(
        &self,
        task_code: &TaskCode,
        request: &Value,
    ) -> TaskRepositoryResult<()>;

    /// Finds a task, with its full status log, by task code.
    async fn find_by_code(&self, task_code: &TaskCode) -> TaskRepositoryResult<Option<Task>>;

    /// Returns all tasks for a data source, newest first.
    async fn find_by_datasource(
        &self,
        datasource_id: DataSourceId,
    ) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns every task whose latest status is not terminal.
    async fn find_incomplete(&self) -> TaskRepositoryResult<Vec<Task>>;

    /// Stores the result of a successful task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// and [`TaskRepositoryError::DuplicateResult`] when a result is already
    /// stored for the task code.
    async fn store_result(&self, result: &TaskResult) -> TaskRepositoryResult<()>;

    /// Finds the result stored for a task code.
    async fn find_result(&self, task_code: &TaskCode) -> TaskRepositoryResult<Option<TaskResult>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same code already exists.
    #[error("duplicate task code: {0}")]
    DuplicateTask(TaskCode),

    /// A result for the task code already exists.
    #[error("duplicate result for task: {0}")]
    DuplicateResult(TaskCode),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskCode),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
