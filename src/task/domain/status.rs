//! Immutable task status log entries.

use super::TaskState;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// One entry of a task's append-only status log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    state: TaskState,
    message: Option<String>,
    created_at: DateTime<Utc>,
}

impl TaskStatus {
    /// Creates a status entry stamped with the current clock time.
    #[must_use]
    pub fn new<C: Clock + ?Sized>(state: TaskState, message: Option<String>, clock: &C) -> Self {
        Self {
            state,
            message,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a status entry from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        state: TaskState,
        message: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            state,
            message,
            created_at,
        }
    }

    /// Returns the recorded state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns the free-text message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns when the entry was appended.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
