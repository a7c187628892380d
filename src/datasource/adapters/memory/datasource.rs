//! In-memory data source repository.

use async_trait::async_trait;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    company::domain::CompanyId,
    datasource::{
        domain::{DataSource, UploadCode},
        ports::{DataSourceRepository, DataSourceRepositoryError, DataSourceRepositoryResult},
    },
};

/// Thread-safe in-memory data source repository.
///
/// Data sources are kept in upload order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSourceRepository {
    datasources: Arc<RwLock<Vec<DataSource>>>,
}

impl InMemoryDataSourceRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DataSourceRepositoryResult<RwLockReadGuard<'_, Vec<DataSource>>> {
        self.datasources.read().map_err(|err| {
            DataSourceRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> DataSourceRepositoryResult<RwLockWriteGuard<'_, Vec<DataSource>>> {
        self.datasources.write().map_err(|err| {
            DataSourceRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl DataSourceRepository for InMemoryDataSourceRepository {
    async fn store(&self, datasource: &DataSource) -> DataSourceRepositoryResult<()> {
        let mut datasources = self.write()?;
        if datasources
            .iter()
            .any(|stored| stored.upload_code() == datasource.upload_code())
        {
            return Err(DataSourceRepositoryError::DuplicateUploadCode(
                datasource.upload_code().clone(),
            ));
        }
        datasources.push(datasource.clone());
        Ok(())
    }

    async fn find_by_upload_code(
        &self,
        upload_code: &UploadCode,
    ) -> DataSourceRepositoryResult<Option<DataSource>> {
        let datasources = self.read()?;
        Ok(datasources
            .iter()
            .find(|stored| stored.upload_code() == upload_code)
            .cloned())
    }

    async fn list_for_company(
        &self,
        company_id: CompanyId,
    ) -> DataSourceRepositoryResult<Vec<DataSource>> {
        let datasources = self.read()?;
        Ok(datasources
            .iter()
            .filter(|stored| stored.company_id() == company_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, upload_code: &UploadCode) -> DataSourceRepositoryResult<()> {
        let mut datasources = self.write()?;
        let position = datasources
            .iter()
            .position(|stored| stored.upload_code() == upload_code)
            .ok_or_else(|| DataSourceRepositoryError::NotFound(upload_code.clone()))?;
        datasources.remove(position);
        Ok(())
    }
}
