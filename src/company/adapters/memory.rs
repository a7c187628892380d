//! In-memory customer action log.

use crate::company::{
    domain::{CompanyId, CustomerAction},
    ports::{ActionLog, ActionLogError},
};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory action log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryActionLog {
    actions: Arc<RwLock<Vec<CustomerAction>>>,
}

impl InMemoryActionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded actions for a company in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`ActionLogError::Persistence`] when the lock is poisoned.
    pub fn actions_for(&self, company_id: CompanyId) -> Result<Vec<CustomerAction>, ActionLogError> {
        let actions = self.actions.read().map_err(|err| {
            ActionLogError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(actions
            .iter()
            .filter(|action| action.company_id() == company_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ActionLog for InMemoryActionLog {
    async fn record(&self, action: &CustomerAction) -> Result<(), ActionLogError> {
        let mut actions = self.actions.write().map_err(|err| {
            ActionLogError::persistence(std::io::Error::other(err.to_string()))
        })?;
        actions.push(action.clone());
        Ok(())
    }
}
