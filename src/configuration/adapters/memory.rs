//! In-memory configuration repository.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::{
    company::domain::CompanyId,
    configuration::{
        domain::CompanyConfiguration,
        ports::{
            ConfigurationRepository, ConfigurationRepositoryError, ConfigurationRepositoryResult,
        },
    },
};

/// Thread-safe in-memory configuration repository.
///
/// Versions are kept in append order, so the latest version is the last one
/// stored for the company.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigurationRepository {
    versions: Arc<RwLock<Vec<CompanyConfiguration>>>,
}

impl InMemoryConfigurationRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self, company_id: CompanyId) -> ConfigurationRepositoryResult<Vec<CompanyConfiguration>> {
        let versions = self.versions.read().map_err(|err| {
            ConfigurationRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(versions
            .iter()
            .filter(|version| version.company_id() == company_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConfigurationRepository for InMemoryConfigurationRepository {
    async fn append(&self, configuration: &CompanyConfiguration) -> ConfigurationRepositoryResult<()> {
        let mut versions = self.versions.write().map_err(|err| {
            ConfigurationRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        versions.push(configuration.clone());
        Ok(())
    }

    async fn latest_for_company(
        &self,
        company_id: CompanyId,
    ) -> ConfigurationRepositoryResult<Option<CompanyConfiguration>> {
        Ok(self.snapshot(company_id)?.pop())
    }

    async fn history_for_company(
        &self,
        company_id: CompanyId,
    ) -> ConfigurationRepositoryResult<Vec<CompanyConfiguration>> {
        self.snapshot(company_id)
    }
}
