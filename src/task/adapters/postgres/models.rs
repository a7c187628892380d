//! Diesel row models for task persistence.

use super::schema::{task_results, task_statuses, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task code.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub task_code: String,
    /// Task kind.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub kind: String,
    /// Task name.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub name: String,
    /// Owning company.
    #[diesel(sql_type = diesel::sql_types::Int8)]
    pub company_id: i64,
    /// Data source identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub datasource_id: uuid::Uuid,
    /// Validated prediction request.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Jsonb>)]
    pub prediction_request: Option<Value>,
    /// Creation timestamp.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub created_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Task code.
    pub task_code: String,
    /// Task kind.
    pub kind: String,
    /// Task name.
    pub name: String,
    /// Owning company.
    pub company_id: i64,
    /// Data source identifier.
    pub datasource_id: uuid::Uuid,
    /// Validated prediction request.
    pub prediction_request: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query result row for status log entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_statuses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskStatusRow {
    /// Owning task code.
    pub task_code: String,
    /// Recorded state.
    pub state: String,
    /// Optional message.
    pub message: Option<String>,
    /// Append timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for status log entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_statuses)]
pub struct NewTaskStatusRow {
    /// Owning task code.
    pub task_code: String,
    /// Recorded state.
    pub state: String,
    /// Optional message.
    pub message: Option<String>,
    /// Append timestamp.
    pub created_at: DateTime<Utc>,
}

/// Row model for stored results.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_results)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskResultRow {
    /// Owning task code.
    pub task_code: String,
    /// Owning company.
    pub company_id: i64,
    /// Canonical result document.
    pub result: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
