//! `PostgreSQL` repository implementation for task storage.

use super::{
    models::{NewTaskRow, NewTaskStatusRow, TaskResultRow, TaskRow, TaskStatusRow},
    schema::{task_results, task_statuses, tasks},
};
use crate::{
    company::domain::CompanyId,
    datasource::domain::DataSourceId,
    task::{
        domain::{
            PersistedTaskData, Task, TaskCode, TaskKind, TaskResult, TaskState, TaskStatus,
        },
        ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::Value;
use std::collections::HashMap;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_code = task.task_code().clone();
        let new_row = to_new_row(task);
        let status_rows: Vec<NewTaskStatusRow> = task
            .statuses()
            .iter()
            .map(|status| to_new_status_row(&task_code, status))
            .collect();

        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                diesel::insert_into(tasks::table)
                    .values(&new_row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            TaskRepositoryError::DuplicateTask(task_code.clone())
                        }
                        _ => TaskRepositoryError::persistence(err),
                    })?;
                diesel::insert_into(task_statuses::table)
                    .values(&status_rows)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn append_status(
        &self,
        task_code: &TaskCode,
        status: &TaskStatus,
    ) -> TaskRepositoryResult<()> {
        let lookup_code = task_code.clone();
        let row = to_new_status_row(task_code, status);
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                ensure_task_exists(tx, &lookup_code)?;
                diesel::insert_into(task_statuses::table)
                    .values(&row)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn update_prediction_request(
        &self,
        task_code: &TaskCode,
        request: &Value,
    ) -> TaskRepositoryResult<()> {
        let lookup_code = task_code.clone();
        let payload = request.clone();
        self.run_blocking(move |connection| {
            let updated = diesel::update(tasks::table.find(lookup_code.as_str()))
                .set(tasks::prediction_request.eq(Some(payload)))
                .execute(connection)?;
            if updated == 0 {
                return Err(TaskRepositoryError::NotFound(lookup_code));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_code(&self, task_code: &TaskCode) -> TaskRepositoryResult<Option<Task>> {
        let lookup_code = task_code.clone();
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(lookup_code.as_str())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            match row {
                Some(task_row) => Ok(load_tasks(connection, vec![task_row])?.into_iter().next()),
                None => Ok(None),
            }
        })
        .await
    }

    async fn find_by_datasource(
        &self,
        datasource_id: DataSourceId,
    ) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::datasource_id.eq(datasource_id.into_inner()))
                .order(tasks::created_at.desc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            load_tasks(connection, rows)
        })
        .await
    }

    async fn find_incomplete(&self) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(concat!(
                "SELECT t.task_code, t.kind, t.name, t.company_id, t.datasource_id, ",
                "t.prediction_request, t.created_at FROM tasks t ",
                "JOIN LATERAL (SELECT s.state FROM task_statuses s ",
                "WHERE s.task_code = t.task_code ORDER BY s.id DESC LIMIT 1) latest ON TRUE ",
                "WHERE latest.state NOT IN ('SUCCESSFUL', 'FAILED') ",
                "ORDER BY t.created_at ASC",
            ))
            .load::<TaskRow>(connection)?;
            load_tasks(connection, rows)
        })
        .await
    }

    async fn store_result(&self, result: &TaskResult) -> TaskRepositoryResult<()> {
        let task_code = result.task_code().clone();
        let document =
            serde_json::to_value(result.result()).map_err(TaskRepositoryError::persistence)?;
        let row = TaskResultRow {
            task_code: task_code.as_str().to_owned(),
            company_id: result.company_id().value(),
            result: document,
            created_at: result.created_at(),
        };
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                ensure_task_exists(tx, &task_code)?;
                diesel::insert_into(task_results::table)
                    .values(&row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            TaskRepositoryError::DuplicateResult(task_code.clone())
                        }
                        _ => TaskRepositoryError::persistence(err),
                    })?;
                Ok(())
            })
        })
        .await
    }

    async fn find_result(&self, task_code: &TaskCode) -> TaskRepositoryResult<Option<TaskResult>> {
        let lookup_code = task_code.clone();
        self.run_blocking(move |connection| {
            let row = task_results::table
                .find(lookup_code.as_str())
                .select(TaskResultRow::as_select())
                .first::<TaskResultRow>(connection)
                .optional()?;
            row.map(row_to_result).transpose()
        })
        .await
    }
}

fn ensure_task_exists(connection: &mut PgConnection, task_code: &TaskCode) -> TaskRepositoryResult<()> {
    let exists = diesel::select(diesel::dsl::exists(tasks::table.find(task_code.as_str())))
        .get_result::<bool>(connection)?;
    if exists {
        Ok(())
    } else {
        Err(TaskRepositoryError::NotFound(task_code.clone()))
    }
}

fn to_new_row(task: &Task) -> NewTaskRow {
    NewTaskRow {
        task_code: task.task_code().as_str().to_owned(),
        kind: task.kind().as_str().to_owned(),
        name: task.name().to_owned(),
        company_id: task.company_id().value(),
        datasource_id: task.datasource_id().into_inner(),
        prediction_request: task.prediction_request().cloned(),
        created_at: task.created_at(),
    }
}

fn to_new_status_row(task_code: &TaskCode, status: &TaskStatus) -> NewTaskStatusRow {
    NewTaskStatusRow {
        task_code: task_code.as_str().to_owned(),
        state: status.state().as_str().to_owned(),
        message: status.message().map(str::to_owned),
        created_at: status.created_at(),
    }
}

/// Loads the status logs for `rows` and assembles task aggregates, keeping
/// the order of `rows`.
fn load_tasks(connection: &mut PgConnection, rows: Vec<TaskRow>) -> TaskRepositoryResult<Vec<Task>> {
    let codes: Vec<String> = rows.iter().map(|row| row.task_code.clone()).collect();
    let status_rows = task_statuses::table
        .filter(task_statuses::task_code.eq_any(&codes))
        .order(task_statuses::id.asc())
        .select(TaskStatusRow::as_select())
        .load::<TaskStatusRow>(connection)?;

    let mut statuses: HashMap<String, Vec<TaskStatus>> = HashMap::new();
    for status_row in status_rows {
        let state = TaskState::try_from(status_row.state.as_str())
            .map_err(TaskRepositoryError::persistence)?;
        statuses
            .entry(status_row.task_code)
            .or_default()
            .push(TaskStatus::from_persisted(
                state,
                status_row.message,
                status_row.created_at,
            ));
    }

    rows.into_iter()
        .map(|row| {
            let log = statuses.remove(&row.task_code).unwrap_or_default();
            row_to_task(row, log)
        })
        .collect()
}

fn row_to_task(row: TaskRow, statuses: Vec<TaskStatus>) -> TaskRepositoryResult<Task> {
    let TaskRow {
        task_code,
        kind,
        name,
        company_id,
        datasource_id,
        prediction_request,
        created_at,
    } = row;

    let data = PersistedTaskData {
        task_code: TaskCode::new(task_code).map_err(TaskRepositoryError::persistence)?,
        kind: TaskKind::try_from(kind.as_str()).map_err(TaskRepositoryError::persistence)?,
        name,
        company_id: CompanyId::new(company_id),
        datasource_id: DataSourceId::from_uuid(datasource_id),
        prediction_request,
        created_at,
        statuses,
    };
    Ok(Task::from_persisted(data))
}

fn row_to_result(row: TaskResultRow) -> TaskRepositoryResult<TaskResult> {
    let TaskResultRow {
        task_code,
        company_id,
        result,
        created_at,
    } = row;
    let canonical = serde_json::from_value(result).map_err(TaskRepositoryError::persistence)?;
    Ok(TaskResult::from_persisted(
        TaskCode::new(task_code).map_err(TaskRepositoryError::persistence)?,
        CompanyId::new(company_id),
        canonical,
        created_at,
    ))
}
