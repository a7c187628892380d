//! Job queue port and the tokio-backed adapter.

use super::{
    job::PipelineJob,
    orchestrator::{JobRunner, PipelineError},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// Identifier the queue assigns to an accepted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new random job identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised by job queues.
#[derive(Debug, Error)]
pub enum JobQueueError {
    /// The queue refused the job.
    #[error("job queue rejected the job: {0}")]
    Rejected(String),

    /// The job ran and failed; its task has already been marked `FAILED`.
    #[error("job {id} failed: {source}")]
    Failed {
        /// Failed job.
        id: JobId,
        /// Pipeline failure.
        source: PipelineError,
    },

    /// The job's worker panicked or was aborted.
    #[error("job {id} did not finish: {reason}")]
    Aborted {
        /// Aborted job.
        id: JobId,
        /// Runtime-reported reason.
        reason: String,
    },
}

#[derive(Debug)]
enum Completion {
    Detached,
    Running(JoinHandle<Result<(), PipelineError>>),
    Finished(Result<(), PipelineError>),
}

/// Handle to an accepted job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    completion: Completion,
}

impl JobHandle {
    /// Creates a handle for a job whose completion cannot be awaited.
    #[must_use]
    pub const fn detached(id: JobId) -> Self {
        Self {
            id,
            completion: Completion::Detached,
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Waits for the job to finish.
    ///
    /// Detached handles return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Failed`] when the pipeline failed and
    /// [`JobQueueError::Aborted`] when its worker did not finish.
    pub async fn wait(self) -> Result<(), JobQueueError> {
        let id = self.id;
        let outcome = match self.completion {
            Completion::Detached => return Ok(()),
            Completion::Finished(outcome) => outcome,
            Completion::Running(worker) => worker.await.map_err(|err| JobQueueError::Aborted {
                id,
                reason: err.to_string(),
            })?,
        };
        outcome.map_err(|source| JobQueueError::Failed { id, source })
    }
}

/// Accepts pipeline jobs for background execution.
///
/// Each accepted job runs once on a single worker; failures go through the
/// runner's error callback. Jobs are neither retried nor cancellable.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueues `job`.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Rejected`] when the job cannot be accepted.
    async fn enqueue(&self, job: PipelineJob) -> Result<JobHandle, JobQueueError>;
}

/// Queue that runs every job on its own tokio task.
pub struct TokioJobQueue<J: JobRunner + ?Sized> {
    runner: Arc<J>,
}

impl<J: JobRunner + ?Sized> Clone for TokioJobQueue<J> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
        }
    }
}

impl<J: JobRunner + ?Sized> TokioJobQueue<J> {
    /// Creates a queue that hands jobs to `runner`.
    #[must_use]
    pub const fn new(runner: Arc<J>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<J: JobRunner + ?Sized + 'static> JobQueue for TokioJobQueue<J> {
    async fn enqueue(&self, job: PipelineJob) -> Result<JobHandle, JobQueueError> {
        let id = JobId::new();
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| JobQueueError::Rejected(err.to_string()))?;
        let runner = Arc::clone(&self.runner);
        debug!(job_id = %id, task_code = %job.task_code, "job enqueued");
        let worker = runtime.spawn(async move { runner.execute(job).await });
        Ok(JobHandle {
            id,
            completion: Completion::Running(worker),
        })
    }
}

/// Queue that runs each job to completion inside `enqueue`.
///
/// Useful for single-process tools and tests that need the job finished
/// before the submitting call returns.
pub struct InlineJobQueue<J: JobRunner + ?Sized> {
    runner: Arc<J>,
}

impl<J: JobRunner + ?Sized> InlineJobQueue<J> {
    /// Creates a queue that runs jobs on `runner`.
    #[must_use]
    pub const fn new(runner: Arc<J>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<J: JobRunner + ?Sized> JobQueue for InlineJobQueue<J> {
    async fn enqueue(&self, job: PipelineJob) -> Result<JobHandle, JobQueueError> {
        let id = JobId::new();
        debug!(job_id = %id, task_code = %job.task_code, "job running inline");
        let outcome = self.runner.execute(job).await;
        Ok(JobHandle {
            id,
            completion: Completion::Finished(outcome),
        })
    }
}
