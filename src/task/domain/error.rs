//! Error types for task domain validation and parsing.

use super::{TaskCode, TaskState};
use thiserror::Error;

/// Errors returned while constructing or transitioning tasks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task code is empty after trimming.
    #[error("task code must not be empty")]
    EmptyTaskCode,

    /// The task code exceeds the 60-character storage limit.
    #[error("task code exceeds 60 character limit: {0}")]
    TaskCodeTooLong(String),

    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// The task name exceeds the 60-character storage limit.
    #[error("task name exceeds 60 character limit: {0}")]
    TaskNameTooLong(String),

    /// The task already reached a terminal state.
    #[error("task {task_code} is already completed with state {state}")]
    TaskAlreadyCompleted {
        /// Task that rejected the transition.
        task_code: TaskCode,
        /// Terminal state the task is in.
        state: TaskState,
    },

    /// The requested transition is not permitted by the state machine.
    #[error("invalid state transition for task {task_code}: {from} -> {to}")]
    InvalidStateTransition {
        /// Task that rejected the transition.
        task_code: TaskCode,
        /// Current task state.
        from: TaskState,
        /// Requested target state.
        to: TaskState,
    },
}

/// Error returned while parsing task states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task state: {0}")]
pub struct ParseTaskStateError(pub String);

/// Error returned while parsing task kinds from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task kind: {0}")]
pub struct ParseTaskKindError(pub String);
