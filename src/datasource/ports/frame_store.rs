//! Port for the tables uploaded data sources point at.

use crate::frame::Table;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for frame store operations.
pub type FrameStoreResult<T> = Result<T, FrameStoreError>;

/// Table storage keyed by a data source location.
#[async_trait]
pub trait FrameStore: Send + Sync {
    /// Loads the table stored at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameStoreError::NotFound`] when nothing is stored there.
    async fn get_table(&self, location: &str) -> FrameStoreResult<Table>;

    /// Stores `table` at `location`, replacing any previous table.
    async fn put_table(&self, location: &str, table: &Table) -> FrameStoreResult<()>;

    /// Removes the table stored at `location`.
    ///
    /// Removing a missing table is not an error.
    async fn remove(&self, location: &str) -> FrameStoreResult<()>;
}

/// Errors returned by frame store implementations.
#[derive(Debug, Clone, Error)]
pub enum FrameStoreError {
    /// No table is stored at the location.
    #[error("no table stored at {0}")]
    NotFound(String),

    /// The location cannot be used as a storage key.
    #[error("invalid table location: {0}")]
    InvalidLocation(String),

    /// Storage or encoding failure.
    #[error("frame store error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl FrameStoreError {
    /// Wraps a storage error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
