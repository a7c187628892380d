//! In-memory table store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{
    datasource::ports::{FrameStore, FrameStoreError, FrameStoreResult},
    frame::Table,
};

/// Thread-safe in-memory frame store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrameStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl InMemoryFrameStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl ToString) -> FrameStoreError {
    FrameStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl FrameStore for InMemoryFrameStore {
    async fn get_table(&self, location: &str) -> FrameStoreResult<Table> {
        let tables = self.tables.read().map_err(poisoned)?;
        tables
            .get(location)
            .cloned()
            .ok_or_else(|| FrameStoreError::NotFound(location.to_owned()))
    }

    async fn put_table(&self, location: &str, table: &Table) -> FrameStoreResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.insert(location.to_owned(), table.clone());
        Ok(())
    }

    async fn remove(&self, location: &str) -> FrameStoreResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.remove(location);
        Ok(())
    }
}
