//! Units of background work.

use crate::{company::domain::CompanyId, datasource::domain::UploadCode, task::domain::TaskCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Work a pipeline job performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    /// Train the oracle, then forecast with the given raw request.
    TrainAndPredict {
        /// Request document, validated by the orchestrator.
        prediction_request: Value,
    },
    /// Train the oracle only.
    Train,
}

/// One orchestration run for a pre-created task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineJob {
    /// Task the run reports to.
    pub task_code: TaskCode,
    /// Company whose configuration drives the run.
    pub company_id: CompanyId,
    /// Upload whose table feeds the oracle.
    pub upload_code: UploadCode,
    /// Work to perform.
    pub kind: JobKind,
}

impl PipelineJob {
    /// Creates a train-and-predict job.
    #[must_use]
    pub const fn train_and_predict(
        task_code: TaskCode,
        company_id: CompanyId,
        upload_code: UploadCode,
        prediction_request: Value,
    ) -> Self {
        Self {
            task_code,
            company_id,
            upload_code,
            kind: JobKind::TrainAndPredict { prediction_request },
        }
    }

    /// Creates a training-only job.
    #[must_use]
    pub const fn train(task_code: TaskCode, company_id: CompanyId, upload_code: UploadCode) -> Self {
        Self {
            task_code,
            company_id,
            upload_code,
            kind: JobKind::Train,
        }
    }
}
