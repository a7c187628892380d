//! Task aggregate root and related lifecycle types.

use super::{ParseTaskKindError, TaskCode, TaskDomainError, TaskState, TaskStatus};
use crate::{company::domain::CompanyId, datasource::domain::DataSourceId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of work a task tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Train the oracle, then predict.
    Prediction,
    /// Train the oracle only.
    Training,
}

impl TaskKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prediction => "prediction",
            Self::Training => "training",
        }
    }
}

impl TryFrom<&str> for TaskKind {
    type Error = ParseTaskKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prediction" => Ok(Self::Prediction),
            "training" => Ok(Self::Training),
            _ => Err(ParseTaskKindError(value.to_owned())),
        }
    }
}

/// Parameter object for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Human-readable task name.
    pub name: String,
    /// Unique task code.
    pub task_code: TaskCode,
    /// Owning company.
    pub company_id: CompanyId,
    /// Data source the task runs against.
    pub datasource_id: DataSourceId,
    /// Kind of work tracked.
    pub kind: TaskKind,
}

/// Task aggregate root.
///
/// The lifecycle state is derived from the last entry of `statuses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    task_code: TaskCode,
    kind: TaskKind,
    name: String,
    company_id: CompanyId,
    datasource_id: DataSourceId,
    prediction_request: Option<Value>,
    created_at: DateTime<Utc>,
    statuses: Vec<TaskStatus>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task code.
    pub task_code: TaskCode,
    /// Persisted task kind.
    pub kind: TaskKind,
    /// Persisted task name.
    pub name: String,
    /// Persisted owning company.
    pub company_id: CompanyId,
    /// Persisted data source reference.
    pub datasource_id: DataSourceId,
    /// Persisted validated prediction request, if recorded.
    pub prediction_request: Option<Value>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted status log in append order.
    pub statuses: Vec<TaskStatus>,
}

impl Task {
    /// Largest task name accepted by the storage schema.
    const MAX_NAME_LENGTH: usize = 60;

    /// Creates a task whose status log starts with `QUEUED`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskName`] for a blank name and
    /// [`TaskDomainError::TaskNameTooLong`] when the trimmed name exceeds 60
    /// characters.
    pub fn new<C: Clock + ?Sized>(data: NewTask, clock: &C) -> Result<Self, TaskDomainError> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(TaskDomainError::EmptyTaskName);
        }
        if name.chars().count() > Self::MAX_NAME_LENGTH {
            return Err(TaskDomainError::TaskNameTooLong(name.to_owned()));
        }

        Ok(Self {
            task_code: data.task_code,
            kind: data.kind,
            name: name.to_owned(),
            company_id: data.company_id,
            datasource_id: data.datasource_id,
            prediction_request: None,
            created_at: clock.utc(),
            statuses: vec![TaskStatus::new(TaskState::Queued, None, clock)],
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            task_code: data.task_code,
            kind: data.kind,
            name: data.name,
            company_id: data.company_id,
            datasource_id: data.datasource_id,
            prediction_request: data.prediction_request,
            created_at: data.created_at,
            statuses: data.statuses,
        }
    }

    /// Returns the task code.
    #[must_use]
    pub const fn task_code(&self) -> &TaskCode {
        &self.task_code
    }

    /// Returns the task kind.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning company.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the data source the task runs against.
    #[must_use]
    pub const fn datasource_id(&self) -> DataSourceId {
        self.datasource_id
    }

    /// Returns the validated prediction request, once recorded.
    #[must_use]
    pub const fn prediction_request(&self) -> Option<&Value> {
        self.prediction_request.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the status log in append order.
    #[must_use]
    pub fn statuses(&self) -> &[TaskStatus] {
        &self.statuses
    }

    /// Returns the most recently appended status entry.
    #[must_use]
    pub fn latest_status(&self) -> Option<&TaskStatus> {
        self.statuses.last()
    }

    /// Returns the current state: the state of the last status entry.
    #[must_use]
    pub fn status(&self) -> Option<TaskState> {
        self.latest_status().map(TaskStatus::state)
    }

    /// Returns `true` once the task reached a terminal state.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status().is_some_and(TaskState::is_terminal)
    }

    /// Records the validated prediction request on the task.
    pub fn record_prediction_request(&mut self, request: Value) {
        self.prediction_request = Some(request);
    }

    /// Appends a status entry after validating the transition.
    ///
    /// Returns the appended entry so callers can persist it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskAlreadyCompleted`] when the task is in
    /// a terminal state and [`TaskDomainError::InvalidStateTransition`] when
    /// the state machine does not allow moving to `state`.
    pub fn transition<C: Clock + ?Sized>(
        &mut self,
        state: TaskState,
        message: Option<String>,
        clock: &C,
    ) -> Result<TaskStatus, TaskDomainError> {
        if let Some(current) = self.status() {
            if current.is_terminal() {
                return Err(TaskDomainError::TaskAlreadyCompleted {
                    task_code: self.task_code.clone(),
                    state: current,
                });
            }
            if !current.can_transition_to(state) {
                return Err(TaskDomainError::InvalidStateTransition {
                    task_code: self.task_code.clone(),
                    from: current,
                    to: state,
                });
            }
        }

        let status = TaskStatus::new(state, message, clock);
        self.statuses.push(status.clone());
        Ok(status)
    }
}
