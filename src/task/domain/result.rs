//! Stored result of a successful prediction task.

use super::TaskCode;
use crate::{company::domain::CompanyId, interpreter::CanonicalResult};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Canonical prediction output persisted once per successful task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    task_code: TaskCode,
    company_id: CompanyId,
    result: CanonicalResult,
    created_at: DateTime<Utc>,
}

impl TaskResult {
    /// Creates a result record stamped with the current clock time.
    #[must_use]
    pub fn new<C: Clock + ?Sized>(
        task_code: TaskCode,
        company_id: CompanyId,
        result: CanonicalResult,
        clock: &C,
    ) -> Self {
        Self {
            task_code,
            company_id,
            result,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a result from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        task_code: TaskCode,
        company_id: CompanyId,
        result: CanonicalResult,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_code,
            company_id,
            result,
            created_at,
        }
    }

    /// Returns the owning task code.
    #[must_use]
    pub const fn task_code(&self) -> &TaskCode {
        &self.task_code
    }

    /// Returns the owning company.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the canonical interpreted result.
    #[must_use]
    pub const fn result(&self) -> &CanonicalResult {
        &self.result
    }

    /// Returns when the result was stored.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
