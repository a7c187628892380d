//! Port for versioned company configuration storage.

use super::domain::CompanyConfiguration;
use crate::company::domain::CompanyId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for configuration repository operations.
pub type ConfigurationRepositoryResult<T> = Result<T, ConfigurationRepositoryError>;

/// Append-only configuration storage.
#[async_trait]
pub trait ConfigurationRepository: Send + Sync {
    /// Appends a configuration version.
    async fn append(&self, configuration: &CompanyConfiguration) -> ConfigurationRepositoryResult<()>;

    /// Returns the most recently appended version for a company.
    async fn latest_for_company(
        &self,
        company_id: CompanyId,
    ) -> ConfigurationRepositoryResult<Option<CompanyConfiguration>>;

    /// Returns every version for a company, oldest first.
    async fn history_for_company(
        &self,
        company_id: CompanyId,
    ) -> ConfigurationRepositoryResult<Vec<CompanyConfiguration>>;
}

/// Errors returned by configuration repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationRepositoryError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ConfigurationRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
