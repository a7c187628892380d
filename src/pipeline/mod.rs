//! Forecast pipeline execution and submission.
//!
//! [`ForecastService`] admits work synchronously: it checks the company's
//! configuration and the upload, creates a `QUEUED` task, and hands a
//! [`PipelineJob`] to a [`JobQueue`]. A queue worker then drives the job
//! through an [`Orchestrator`], which walks the task through `STARTED`,
//! training, prediction, and interpretation before persisting the result.
//! Any failure reaches [`JobRunner::on_failure`], which marks the task
//! `FAILED` unless it already finished.

mod context;
mod job;
mod orchestrator;
mod queue;
mod request;
mod service;

pub use context::{PipelineContext, PipelinePorts};
pub use job::{JobKind, PipelineJob};
pub use orchestrator::{
    JobRunner, Orchestrator, PREDICTION_MESSAGE, PipelineError, TRAINING_MESSAGE,
};
pub use queue::{InlineJobQueue, JobHandle, JobId, JobQueue, JobQueueError, TokioJobQueue};
pub use request::{PredictionRequest, ValidationErrors};
pub use service::{ConfirmedUpload, ForecastError, ForecastService, TaskView};

#[cfg(test)]
mod tests;
