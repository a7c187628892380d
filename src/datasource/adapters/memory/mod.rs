//! In-memory adapters for data source tests and demos.

mod datasource;
mod frame_store;

pub use datasource::InMemoryDataSourceRepository;
pub use frame_store::InMemoryFrameStore;
