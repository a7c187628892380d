//! Task lifecycle states and the transition table.

use super::ParseTaskStateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle state.
///
/// `InProgress` is a labelled sub-phase marker and may repeat with different
/// status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Task accepted and waiting for a worker.
    #[serde(rename = "QUEUED")]
    Queued,
    /// A worker picked the task up.
    #[serde(rename = "STARTED")]
    Started,
    /// Work is under way; the status message names the phase.
    #[serde(rename = "INPROGRESS")]
    InProgress,
    /// Task finished and its result is stored.
    #[serde(rename = "SUCCESSFUL")]
    Successful,
    /// Task failed; the status message carries the reason.
    #[serde(rename = "FAILED")]
    Failed,
}

impl TaskState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Started => "STARTED",
            Self::InProgress => "INPROGRESS",
            Self::Successful => "SUCCESSFUL",
            Self::Failed => "FAILED",
        }
    }

    /// Returns `true` for states with no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Successful | Self::Failed)
    }

    /// Returns `true` when moving from `self` to `next` is permitted.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Queued => matches!(next, Self::Started | Self::Failed),
            Self::Started | Self::InProgress => {
                matches!(next, Self::InProgress | Self::Successful | Self::Failed)
            }
            Self::Successful | Self::Failed => false,
        }
    }
}

impl TryFrom<&str> for TaskState {
    type Error = ParseTaskStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "QUEUED" => Ok(Self::Queued),
            "STARTED" => Ok(Self::Started),
            "INPROGRESS" | "IN_PROGRESS" => Ok(Self::InProgress),
            "SUCCESSFUL" => Ok(Self::Successful),
            "FAILED" => Ok(Self::Failed),
            _ => Err(ParseTaskStateError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
