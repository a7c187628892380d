//! Company identifiers and audited customer actions.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a tenant company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(i64);

impl CompanyId {
    /// Wraps a raw company identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of customer activity recorded for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// A data source upload was confirmed.
    FileUpload,
    /// A prediction task was created.
    PredictionStarted,
    /// A training task was created.
    TrainingStarted,
}

impl ActionKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileUpload => "FILE_UPLOAD",
            Self::PredictionStarted => "PREDICTION_STARTED",
            Self::TrainingStarted => "TRAINING_STARTED",
        }
    }
}

/// An audited customer action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAction {
    company_id: CompanyId,
    kind: ActionKind,
    occurred_at: DateTime<Utc>,
}

impl CustomerAction {
    /// Creates an action stamped with the current clock time.
    #[must_use]
    pub fn new<C: Clock + ?Sized>(company_id: CompanyId, kind: ActionKind, clock: &C) -> Self {
        Self {
            company_id,
            kind,
            occurred_at: clock.utc(),
        }
    }

    /// Returns the company the action belongs to.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the action kind.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Returns when the action happened.
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
