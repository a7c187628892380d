//! Orchestrator pipeline tests.

use super::fixtures::{
    COMPANY, FAILING_ORACLE, Harness, META_ORACLE, configuration, harness, single_day_request,
};
use crate::{
    datasource::domain::UploadCode,
    pipeline::{JobRunner, PREDICTION_MESSAGE, PipelineError, PipelineJob, TRAINING_MESSAGE},
    task::domain::{Task, TaskCode, TaskState},
};
use rstest::rstest;
use serde_json::{Value, json};

fn states(task: &Task) -> Vec<TaskState> {
    task.statuses().iter().map(|status| status.state()).collect()
}

fn messages(task: &Task) -> Vec<Option<&str>> {
    task.statuses().iter().map(|status| status.message()).collect()
}

async fn reload(harness: &Harness, task_code: &TaskCode) -> Task {
    harness
        .context
        .tasks
        .find_by_code(task_code)
        .await
        .expect("lookup succeeds")
        .expect("task exists")
}

async fn run_prediction(harness: &Harness, request: Value) -> (Task, Result<(), PipelineError>) {
    let datasource = harness.upload("gym-1", true).await;
    let task = harness.queued_task(&datasource).await;
    let job = PipelineJob::train_and_predict(
        task.task_code().clone(),
        COMPANY,
        datasource.upload_code().clone(),
        request,
    );
    let outcome = harness.orchestrator().execute(job).await;
    (reload(harness, task.task_code()).await, outcome)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn single_day_request_yields_one_datapoint(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let (task, outcome) = run_prediction(&harness, single_day_request()).await;
    outcome?;

    assert_eq!(
        states(&task),
        vec![
            TaskState::Queued,
            TaskState::Started,
            TaskState::InProgress,
            TaskState::InProgress,
            TaskState::Successful,
        ]
    );
    assert_eq!(
        messages(&task),
        vec![None, None, Some(TRAINING_MESSAGE), Some(PREDICTION_MESSAGE), None]
    );
    let recorded = task.prediction_request().expect("request recorded");
    assert_eq!(recorded["start_time"], "2017-09-29");

    let stored = harness
        .context
        .tasks
        .find_result(task.task_code())
        .await?
        .expect("result stored");
    let datapoints = &stored.result().datapoints;
    assert_eq!(datapoints.len(), 1);
    assert_eq!(datapoints.first().map(|dp| dp.timestamp.as_str()), Some("2017-09-29"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_upload_is_a_silent_no_op(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let datasource = harness.upload("gym-1", true).await;
    let task = harness.queued_task(&datasource).await;
    let job = PipelineJob::train_and_predict(
        task.task_code().clone(),
        COMPANY,
        UploadCode::new("missing"),
        single_day_request(),
    );

    harness.orchestrator().execute(job).await?;

    let reloaded = reload(&harness, task.task_code()).await;
    assert_eq!(states(&reloaded), vec![TaskState::Queued]);
    assert!(harness.context.tasks.find_result(task.task_code()).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn training_failure_marks_task_failed(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration(FAILING_ORACLE, "cromulon")).await;
    let (task, outcome) = run_prediction(&harness, single_day_request()).await;

    assert!(matches!(outcome, Err(PipelineError::Oracle(_))));
    assert_eq!(
        states(&task),
        vec![
            TaskState::Queued,
            TaskState::Started,
            TaskState::InProgress,
            TaskState::Failed,
        ]
    );
    assert_eq!(
        messages(&task),
        vec![None, None, Some(TRAINING_MESSAGE), Some("boom")]
    );
    assert!(harness.context.tasks.find_result(task.task_code()).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_request_fails_once_with_field_errors(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let (task, outcome) = run_prediction(&harness, json!({"start_time": "2017-09-29"})).await;

    assert!(matches!(outcome, Err(PipelineError::Validation(_))));
    assert_eq!(states(&task), vec![TaskState::Queued, TaskState::Failed]);
    let message = task
        .latest_status()
        .and_then(|status| status.message())
        .expect("failure message");
    let errors: Value = serde_json::from_str(message)?;
    assert!(errors.get("features").is_some());
    assert!(errors.get("end_time").is_some());
    assert!(task.prediction_request().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn mismatched_result_interpreter_fails_the_task(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "metacrocubot")).await;
    let (task, outcome) = run_prediction(&harness, single_day_request()).await;

    assert!(matches!(outcome, Err(PipelineError::ResultInterpretation(_))));
    assert_eq!(task.status(), Some(TaskState::Failed));
    let message = task.latest_status().and_then(|status| status.message());
    assert!(message.is_some_and(|text| text.contains("unsupported result type")));
    assert!(harness.context.tasks.find_result(task.task_code()).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn factor_forecasts_store_percentages(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration(META_ORACLE, "auto")).await;
    let (task, outcome) = run_prediction(&harness, single_day_request()).await;
    outcome?;

    let stored = harness
        .context
        .tasks
        .find_result(task.task_code())
        .await?
        .expect("result stored");
    let factors = &stored.result().factors;
    assert_eq!(factors.get("number_people").map(|f| f.average), Some(75.0));
    assert_eq!(factors.get("hour").map(|f| f.average), Some(25.0));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn training_job_finishes_without_result(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let datasource = harness.upload("gym-1", true).await;
    let task = harness.queued_task(&datasource).await;
    let job = PipelineJob::train(
        task.task_code().clone(),
        COMPANY,
        datasource.upload_code().clone(),
    );

    harness.orchestrator().execute(job).await?;

    let reloaded = reload(&harness, task.task_code()).await;
    assert_eq!(
        states(&reloaded),
        vec![
            TaskState::Queued,
            TaskState::Started,
            TaskState::InProgress,
            TaskState::Successful,
        ]
    );
    assert!(harness.context.tasks.find_result(task.task_code()).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failure_callback_leaves_finished_tasks_alone(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let (task, outcome) = run_prediction(&harness, single_day_request()).await;
    outcome?;
    let job = PipelineJob::train_and_predict(
        task.task_code().clone(),
        COMPANY,
        UploadCode::new("gym-1"),
        single_day_request(),
    );

    harness
        .orchestrator()
        .on_failure(&job, &PipelineError::Worker("late failure".to_owned()))
        .await;

    let reloaded = reload(&harness, task.task_code()).await;
    assert_eq!(reloaded.status(), Some(TaskState::Successful));
    assert_eq!(reloaded.statuses().len(), task.statuses().len());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unconfigured_company_fails_after_start(harness: Harness) {
    let (task, outcome) = run_prediction(&harness, single_day_request()).await;

    assert!(matches!(outcome, Err(PipelineError::Configuration(_))));
    assert_eq!(
        states(&task),
        vec![TaskState::Queued, TaskState::Started, TaskState::Failed]
    );
}
