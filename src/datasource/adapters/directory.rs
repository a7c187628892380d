//! Directory-backed table store.
//!
//! Each table is written as one JSON document below a capability-scoped root
//! directory; `company_7/upload-1` is stored as `company_7/upload-1.json`.
//! Locations cannot escape the root.

use async_trait::async_trait;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;
use std::sync::Arc;

use crate::{
    datasource::ports::{FrameStore, FrameStoreError, FrameStoreResult},
    frame::Table,
};

const TABLE_EXTENSION: &str = "json";

/// Frame store persisting tables as JSON files.
#[derive(Debug, Clone)]
pub struct DirectoryFrameStore {
    root: Arc<Dir>,
}

impl DirectoryFrameStore {
    /// Opens the store rooted at `path`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FrameStoreError::Persistence`] when the directory cannot be
    /// created or opened.
    pub fn open(path: &Utf8Path) -> FrameStoreResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(FrameStoreError::persistence)?;
        let root = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(FrameStoreError::persistence)?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    async fn run_blocking<F, T>(&self, f: F) -> FrameStoreResult<T>
    where
        F: FnOnce(&Dir) -> FrameStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || f(&root))
            .await
            .map_err(FrameStoreError::persistence)?
    }
}

/// Maps a location onto a relative file path below the store root.
fn table_path(location: &str) -> FrameStoreResult<Utf8PathBuf> {
    let relative = Utf8Path::new(location);
    let is_plain = relative
        .components()
        .all(|component| matches!(component, Utf8Component::Normal(_)));
    if location.trim().is_empty() || !is_plain {
        return Err(FrameStoreError::InvalidLocation(location.to_owned()));
    }
    Ok(Utf8PathBuf::from(format!("{location}.{TABLE_EXTENSION}")))
}

#[async_trait]
impl FrameStore for DirectoryFrameStore {
    async fn get_table(&self, location: &str) -> FrameStoreResult<Table> {
        let path = table_path(location)?;
        let key = location.to_owned();
        self.run_blocking(move |root| {
            let contents = root.read_to_string(&path).map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    FrameStoreError::NotFound(key)
                } else {
                    FrameStoreError::persistence(err)
                }
            })?;
            serde_json::from_str(&contents).map_err(FrameStoreError::persistence)
        })
        .await
    }

    async fn put_table(&self, location: &str, table: &Table) -> FrameStoreResult<()> {
        let path = table_path(location)?;
        let document = serde_json::to_vec(table).map_err(FrameStoreError::persistence)?;
        self.run_blocking(move |root| {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
                root.create_dir_all(parent)
                    .map_err(FrameStoreError::persistence)?;
            }
            root.write(&path, document)
                .map_err(FrameStoreError::persistence)
        })
        .await
    }

    async fn remove(&self, location: &str) -> FrameStoreResult<()> {
        let path = table_path(location)?;
        self.run_blocking(move |root| match root.remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(FrameStoreError::persistence(err)),
        })
        .await
    }
}
