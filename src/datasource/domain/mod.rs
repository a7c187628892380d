//! Domain model for uploaded data sources.

mod datasource;
mod ids;

pub use datasource::{DataSource, DataSourceDraft};
pub use ids::{DataSourceId, UploadCode};
