//! `PostgreSQL` integration tests for [`PostgresTaskRepository`].
//!
//! The tests need a reachable database named by `AUGUR_TEST_DATABASE_URL`,
//! so they are ignored by default. Run them with
//! `cargo test --test postgres_task_repository_integration -- --ignored`.
//! Each test applies the migrations inside its own schema and drops the
//! schema afterwards.

use std::sync::Arc;

use augur::{
    company::domain::CompanyId,
    datasource::domain::DataSourceId,
    interpreter::{CanonicalResult, Datapoint, SymbolPrediction},
    task::{
        adapters::postgres::{PostgresTaskRepository, TaskPgPool},
        domain::{TaskCode, TaskState, TaskStatus},
        ports::{TaskRepository, TaskRepositoryError},
        services::{CreateTaskRequest, TaskLifecycleService},
    },
};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use eyre::{OptionExt, WrapErr, ensure};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;
use uuid::Uuid;

const DATABASE_URL_VAR: &str = "AUGUR_TEST_DATABASE_URL";
const NEEDS_DATABASE: &str = "requires a PostgreSQL database named by AUGUR_TEST_DATABASE_URL";
const CREATE_TASKS_SQL: &str =
    include_str!("../migrations/2026-10-01-000000_create_tasks/up.sql");
const COMPANY: CompanyId = CompanyId::new(3);

/// Schema-scoped database that is dropped with the guard.
struct ScopedSchema {
    base_url: String,
    schema: String,
}

impl Drop for ScopedSchema {
    fn drop(&mut self) {
        if let Ok(mut connection) = PgConnection::establish(&self.base_url) {
            let dropped = connection.batch_execute(&format!(
                "DROP SCHEMA IF EXISTS {} CASCADE",
                self.schema
            ));
            if let Err(err) = dropped {
                tracing::warn!(schema = %self.schema, error = %err, "test schema left behind");
            }
        }
    }
}

struct PgContext {
    repository: Arc<PostgresTaskRepository>,
    service: TaskLifecycleService<PostgresTaskRepository, DefaultClock>,
    _schema: ScopedSchema,
}

fn setup() -> eyre::Result<PgContext> {
    let base_url = std::env::var(DATABASE_URL_VAR).wrap_err(NEEDS_DATABASE)?;
    let schema = format!("augur_test_{}", Uuid::new_v4().simple());
    let mut admin = PgConnection::establish(&base_url)?;
    admin.batch_execute(&format!("CREATE SCHEMA {schema}"))?;
    let guard = ScopedSchema {
        base_url: base_url.clone(),
        schema: schema.clone(),
    };

    let separator = if base_url.contains('?') { '&' } else { '?' };
    let scoped_url = format!("{base_url}{separator}options=-csearch_path%3D{schema}");
    let mut migrator = PgConnection::establish(&scoped_url)?;
    migrator.batch_execute(CREATE_TASKS_SQL)?;

    let pool: TaskPgPool = Pool::builder()
        .max_size(2)
        .build(ConnectionManager::<PgConnection>::new(scoped_url))?;
    let repository = Arc::new(PostgresTaskRepository::new(pool));
    let service = TaskLifecycleService::new(Arc::clone(&repository), Arc::new(DefaultClock));
    Ok(PgContext {
        repository,
        service,
        _schema: guard,
    })
}

fn request(name: &str) -> CreateTaskRequest {
    CreateTaskRequest::new(name, TaskCode::generate(), COMPANY, DataSourceId::new())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL database named by AUGUR_TEST_DATABASE_URL"]
async fn created_task_round_trips_with_its_status_log() -> eyre::Result<()> {
    let ctx = setup()?;
    let created = ctx.service.create_task(request("gym forecast")).await?;
    let code = created.task_code().clone();
    ctx.service.set_status(&code, TaskState::Started, None).await?;
    ctx.service
        .set_status(
            &code,
            TaskState::InProgress,
            Some("Training machine learning model".to_owned()),
        )
        .await?;
    ctx.service
        .record_prediction_request(&code, json!({"features": ["number_people"]}))
        .await?;

    let loaded = ctx
        .repository
        .find_by_code(&code)
        .await?
        .ok_or_eyre("stored task")?;
    let states: Vec<TaskState> = loaded.statuses().iter().map(TaskStatus::state).collect();
    ensure!(
        states == [TaskState::Queued, TaskState::Started, TaskState::InProgress],
        "states {states:?}"
    );
    ensure!(loaded.name() == "gym forecast", "name {}", loaded.name());
    ensure!(
        loaded.prediction_request() == Some(&json!({"features": ["number_people"]})),
        "request {:?}",
        loaded.prediction_request()
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL database named by AUGUR_TEST_DATABASE_URL"]
async fn append_to_unknown_task_is_not_found() -> eyre::Result<()> {
    let ctx = setup()?;
    let missing = TaskCode::generate();
    let outcome = ctx
        .repository
        .append_status(
            &missing,
            &TaskStatus::new(TaskState::Started, None, &DefaultClock),
        )
        .await;
    ensure!(
        matches!(outcome, Err(TaskRepositoryError::NotFound(ref code)) if *code == missing),
        "unexpected outcome {outcome:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL database named by AUGUR_TEST_DATABASE_URL"]
async fn incomplete_tasks_exclude_terminal_ones() -> eyre::Result<()> {
    let ctx = setup()?;
    let running = ctx.service.create_task(request("running")).await?;
    let finished = ctx.service.create_task(request("finished")).await?;
    ctx.service
        .set_status(running.task_code(), TaskState::Started, None)
        .await?;
    ctx.service
        .set_status(finished.task_code(), TaskState::Failed, Some("boom".to_owned()))
        .await?;

    let incomplete = ctx.repository.find_incomplete().await?;
    let codes: Vec<&TaskCode> = incomplete.iter().map(|task| task.task_code()).collect();
    ensure!(codes == [running.task_code()], "incomplete {codes:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL database named by AUGUR_TEST_DATABASE_URL"]
async fn results_are_stored_once() -> eyre::Result<()> {
    let ctx = setup()?;
    let task = ctx.service.create_task(request("gym forecast")).await?;
    let code = task.task_code().clone();
    let result = CanonicalResult {
        datapoints: vec![Datapoint {
            timestamp: "2017-09-29".to_owned(),
            prediction: vec![SymbolPrediction {
                symbol: "UCBerkeley".to_owned(),
                value: Some(24.0),
                lower: None,
                upper: Some(28.0),
            }],
        }],
        ..CanonicalResult::default()
    };

    ctx.service.store_result(&code, COMPANY, result.clone()).await?;
    let duplicate = ctx.service.store_result(&code, COMPANY, result.clone()).await;
    ensure!(duplicate.is_err(), "second result was accepted");

    let stored = ctx
        .service
        .find_result(&code)
        .await?
        .ok_or_eyre("stored result")?;
    ensure!(*stored.result() == result, "result changed in storage");
    Ok(())
}
