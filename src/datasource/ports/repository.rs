//! Repository port for data source metadata.

use crate::{
    company::domain::CompanyId,
    datasource::domain::{DataSource, UploadCode},
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for data source repository operations.
pub type DataSourceRepositoryResult<T> = Result<T, DataSourceRepositoryError>;

/// Data source persistence contract.
#[async_trait]
pub trait DataSourceRepository: Send + Sync {
    /// Stores a confirmed data source.
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceRepositoryError::DuplicateUploadCode`] when the
    /// upload code is already taken.
    async fn store(&self, datasource: &DataSource) -> DataSourceRepositoryResult<()>;

    /// Finds a data source by upload code.
    async fn find_by_upload_code(
        &self,
        upload_code: &UploadCode,
    ) -> DataSourceRepositoryResult<Option<DataSource>>;

    /// Returns the data sources of a company in upload order.
    async fn list_for_company(
        &self,
        company_id: CompanyId,
    ) -> DataSourceRepositoryResult<Vec<DataSource>>;

    /// Removes a data source.
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceRepositoryError::NotFound`] when no data source
    /// has the upload code.
    async fn delete(&self, upload_code: &UploadCode) -> DataSourceRepositoryResult<()>;
}

/// Errors returned by data source repository implementations.
#[derive(Debug, Clone, Error)]
pub enum DataSourceRepositoryError {
    /// A data source with the same upload code already exists.
    #[error("duplicate upload code: {0}")]
    DuplicateUploadCode(UploadCode),

    /// The data source was not found.
    #[error("data source not found: {0}")]
    NotFound(UploadCode),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DataSourceRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
