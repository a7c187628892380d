//! Port for recording customer actions.

use super::domain::CustomerAction;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Append-only customer action log.
#[async_trait]
pub trait ActionLog: Send + Sync {
    /// Records one action.
    ///
    /// # Errors
    ///
    /// Returns [`ActionLogError`] when the action cannot be persisted.
    async fn record(&self, action: &CustomerAction) -> Result<(), ActionLogError>;
}

/// Errors returned by action log implementations.
#[derive(Debug, Clone, Error)]
pub enum ActionLogError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ActionLogError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
