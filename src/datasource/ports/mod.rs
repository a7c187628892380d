//! Port contracts for data source metadata and stored tables.

mod frame_store;
mod repository;

pub use frame_store::{FrameStore, FrameStoreError, FrameStoreResult};
pub use repository::{DataSourceRepository, DataSourceRepositoryError, DataSourceRepositoryResult};
