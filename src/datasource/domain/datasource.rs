//! Data source aggregate.

use super::{DataSourceId, UploadCode};
use crate::company::domain::CompanyId;
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Upload metadata supplied when a data source is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceDraft {
    /// Code the client used for the upload.
    pub upload_code: UploadCode,
    /// Owning company.
    pub company_id: CompanyId,
    /// Frame store key of the uploaded table.
    pub location: String,
    /// Original file name.
    pub filename: String,
    /// Column names in upload order.
    pub features: Vec<String>,
    /// Feature the company forecasts.
    pub target_feature: String,
    /// First day covered by the upload.
    pub start_date: Option<NaiveDate>,
    /// Last day covered by the upload.
    pub end_date: Option<NaiveDate>,
}

/// A confirmed upload.
///
/// The first upload of a company is its original data source and cannot be
/// deleted; later uploads are deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    id: DataSourceId,
    upload_code: UploadCode,
    company_id: CompanyId,
    location: String,
    filename: String,
    features: Vec<String>,
    target_feature: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    is_original: bool,
    created_at: DateTime<Utc>,
}

impl DataSource {
    /// Creates a data source from upload metadata.
    #[must_use]
    pub fn new<C: Clock + ?Sized>(draft: DataSourceDraft, is_original: bool, clock: &C) -> Self {
        Self {
            id: DataSourceId::new(),
            upload_code: draft.upload_code,
            company_id: draft.company_id,
            location: draft.location,
            filename: draft.filename,
            features: draft.features,
            target_feature: draft.target_feature,
            start_date: draft.start_date,
            end_date: draft.end_date,
            is_original,
            created_at: clock.utc(),
        }
    }

    /// Returns the internal identifier.
    #[must_use]
    pub const fn id(&self) -> DataSourceId {
        self.id
    }

    /// Returns the upload code.
    #[must_use]
    pub const fn upload_code(&self) -> &UploadCode {
        &self.upload_code
    }

    /// Returns the owning company.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the frame store key of the uploaded table.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the original file name.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the column names in upload order.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Returns the forecast target.
    #[must_use]
    pub fn target_feature(&self) -> &str {
        &self.target_feature
    }

    /// Returns the first day covered by the upload.
    #[must_use]
    pub const fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    /// Returns the last day covered by the upload.
    #[must_use]
    pub const fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Returns `true` for the first upload of a company.
    #[must_use]
    pub const fn is_original(&self) -> bool {
        self.is_original
    }

    /// Returns when the upload was confirmed.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
