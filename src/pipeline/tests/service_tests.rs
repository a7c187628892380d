//! Submission facade tests.

use super::fixtures::{
    COMPANY, Harness, configuration, gym_draft, gym_table, harness, single_day_request,
};
use crate::{
    company::domain::{ActionKind, CompanyId},
    configuration::ConfigurationError,
    datasource::domain::UploadCode,
    pipeline::{
        ForecastError, ForecastService, JobHandle, JobQueue, JobQueueError, Orchestrator,
        PipelineJob, TokioJobQueue,
    },
    task::{
        domain::{TaskDomainError, TaskKind, TaskState},
        services::TaskLifecycleError,
    },
    upload::UPLOAD_PREDICTION_PREFIX,
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;

fn upload_configuration() -> Value {
    let mut document = configuration("NaiveOracle", "cromulon");
    document["upload_strategy"] = json!("TrainAndPredictOnUploadStrategy");
    document["max_forecast_days"] = json!(30);
    document
}

fn action_kinds(harness: &Harness) -> Vec<ActionKind> {
    harness
        .actions
        .actions_for(COMPANY)
        .expect("action log readable")
        .iter()
        .map(|action| action.kind())
        .collect()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn submission_requires_configuration(harness: Harness) {
    let datasource = harness.upload("gym-1", true).await;
    let result = harness
        .service()
        .submit_prediction(COMPANY, datasource.upload_code(), single_day_request())
        .await;

    assert!(matches!(
        result,
        Err(ForecastError::Configuration(ConfigurationError::MissingConfiguration(_)))
    ));
    let tasks = harness
        .context
        .tasks
        .find_by_datasource(datasource.id())
        .await
        .expect("lookup succeeds");
    assert!(tasks.is_empty());
}

#[rstest]
#[case(UploadCode::new("missing"), COMPANY)]
#[case(UploadCode::new("gym-1"), CompanyId::new(99))]
#[tokio::test(flavor = "multi_thread")]
async fn submission_rejects_unknown_uploads(
    harness: Harness,
    #[case] upload_code: UploadCode,
    #[case] company_id: CompanyId,
) {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    harness
        .context
        .configurations
        .record_configuration(CompanyId::new(99), configuration("NaiveOracle", "cromulon"))
        .await
        .expect("configuration is valid");
    harness.upload("gym-1", true).await;

    let result = harness
        .service()
        .submit_prediction(company_id, &upload_code, single_day_request())
        .await;

    assert!(matches!(result, Err(ForecastError::UnknownUpload(_))));
    assert!(action_kinds(&harness).is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn overlong_task_name_is_rejected_before_queueing(harness: Harness) {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let datasource = harness.upload("gym-1", true).await;
    let mut request = single_day_request();
    request["name"] = json!("x".repeat(200));

    let result = harness
        .service()
        .submit_prediction(COMPANY, datasource.upload_code(), request)
        .await;

    assert!(matches!(
        result,
        Err(ForecastError::Task(TaskLifecycleError::Domain(
            TaskDomainError::TaskNameTooLong(_)
        )))
    ));
    let tasks = harness
        .context
        .tasks
        .find_by_datasource(datasource.id())
        .await
        .expect("lookup succeeds");
    assert!(tasks.is_empty());
    assert!(action_kinds(&harness).is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn submitted_prediction_runs_to_completion(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let datasource = harness.upload("gym-1", true).await;
    let service = harness.service();

    let task_code = service
        .submit_prediction(COMPANY, datasource.upload_code(), single_day_request())
        .await?;

    let view = service.get_task(&task_code).await?.expect("task exists");
    assert_eq!(view.name, "gym");
    assert_eq!(view.kind, TaskKind::Prediction);
    assert_eq!(view.status, Some(TaskState::Successful));
    assert!(view.is_completed);
    assert!(view.prediction_request.is_some());
    assert!(service.get_result(&task_code).await?.is_some());
    assert_eq!(action_kinds(&harness), vec![ActionKind::PredictionStarted]);

    let csv = service.export_result_csv(&task_code).await?.expect("csv export");
    assert!(csv.starts_with("timestamp,UCBerkeley\n2017-09-29,"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_tasks_have_no_view_or_result(harness: Harness) -> eyre::Result<()> {
    let service = harness.service();
    let missing = crate::task::domain::TaskCode::generate();
    assert!(service.get_task(&missing).await?.is_none());
    assert!(service.get_result(&missing).await?.is_none());
    assert!(service.export_result_csv(&missing).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn training_submission_records_training_action(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let datasource = harness.upload("gym-1", true).await;
    let service = harness.service();

    let task_code = service
        .submit_training(COMPANY, datasource.upload_code())
        .await?;

    let view = service.get_task(&task_code).await?.expect("task exists");
    assert_eq!(view.kind, TaskKind::Training);
    assert_eq!(view.status, Some(TaskState::Successful));
    assert!(service.get_result(&task_code).await?.is_none());
    assert_eq!(action_kinds(&harness), vec![ActionKind::TrainingStarted]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_upload_is_original_and_on_demand_schedules_nothing(
    harness: Harness,
) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let service = harness.service();

    let first = service.confirm_upload(gym_draft("gym-1"), &gym_table()).await?;
    let second = service.confirm_upload(gym_draft("gym-2"), &gym_table()).await?;

    assert!(first.datasource.is_original());
    assert!(!second.datasource.is_original());
    assert!(first.scheduled_task.is_none());
    assert_eq!(
        action_kinds(&harness),
        vec![ActionKind::FileUpload, ActionKind::FileUpload]
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn train_and_predict_upload_schedules_a_forecast(harness: Harness) -> eyre::Result<()> {
    harness.configure(upload_configuration()).await;
    let service = harness.service();

    let confirmed = service.confirm_upload(gym_draft("gym-1"), &gym_table()).await?;

    let task_code = confirmed.scheduled_task.expect("forecast scheduled");
    let view = service.get_task(&task_code).await?.expect("task exists");
    assert!(view.name.starts_with(UPLOAD_PREDICTION_PREFIX));
    assert_eq!(view.status, Some(TaskState::Successful));
    let request = view.prediction_request.expect("request recorded");
    assert_eq!(request["start_time"], "2017-09-28");
    assert_eq!(request["end_time"], "2017-10-28");
    assert_eq!(
        action_kinds(&harness),
        vec![ActionKind::FileUpload, ActionKind::PredictionStarted]
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rerunning_upload_strategy_does_not_duplicate_tasks(harness: Harness) -> eyre::Result<()> {
    harness.configure(upload_configuration()).await;
    let service = harness.service();
    let confirmed = service.confirm_upload(gym_draft("gym-1"), &gym_table()).await?;
    let configuration = harness
        .context
        .configurations
        .require_configuration(COMPANY)
        .await?;

    let rerun = service
        .run_upload_strategy(&confirmed.datasource, &configuration)
        .await?;

    assert!(rerun.is_none());
    let tasks = harness
        .context
        .tasks
        .find_by_datasource(confirmed.datasource.id())
        .await?;
    assert_eq!(tasks.len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_delta_uploads_can_be_deleted(harness: Harness) -> eyre::Result<()> {
    let service = harness.service();
    let original = service.confirm_upload(gym_draft("gym-1"), &gym_table()).await?;
    let delta = service.confirm_upload(gym_draft("gym-2"), &gym_table()).await?;

    let refused = service
        .delete_datasource(COMPANY, original.datasource.upload_code())
        .await;
    assert!(matches!(refused, Err(ForecastError::OriginalDataSource(_))));

    service
        .delete_datasource(COMPANY, delta.datasource.upload_code())
        .await?;
    let remaining = harness.context.datasources.list_for_company(COMPANY).await?;
    assert_eq!(remaining.len(), 1);
    assert!(
        harness
            .context
            .frames
            .get_table(delta.datasource.location())
            .await
            .is_err()
    );
    Ok(())
}

struct RejectingQueue;

#[async_trait]
impl JobQueue for RejectingQueue {
    async fn enqueue(&self, _job: PipelineJob) -> Result<JobHandle, JobQueueError> {
        Err(JobQueueError::Rejected("queue closed".to_owned()))
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_jobs_fail_their_task(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let datasource = harness.upload("gym-1", true).await;
    let service = ForecastService::new(harness.context.clone(), Arc::new(RejectingQueue));

    let result = service
        .submit_prediction(COMPANY, datasource.upload_code(), single_day_request())
        .await;

    assert!(matches!(result, Err(ForecastError::Queue(_))));
    let tasks = harness
        .context
        .tasks
        .find_by_datasource(datasource.id())
        .await?;
    assert_eq!(tasks.first().and_then(|task| task.status()), Some(TaskState::Failed));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tokio_queue_runs_jobs_in_the_background(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let datasource = harness.upload("gym-1", true).await;
    let orchestrator: Arc<Orchestrator<DefaultClock>> = Arc::new(harness.orchestrator());
    let queue = TokioJobQueue::new(orchestrator);
    let task = harness.queued_task(&datasource).await;

    let handle = queue
        .enqueue(PipelineJob::train_and_predict(
            task.task_code().clone(),
            COMPANY,
            datasource.upload_code().clone(),
            single_day_request(),
        ))
        .await?;
    handle.wait().await?;

    let status = harness.context.tasks.current_status(task.task_code()).await?;
    assert_eq!(status, Some(TaskState::Successful));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tokio_queue_reports_failed_jobs(harness: Harness) -> eyre::Result<()> {
    harness.configure(configuration("NaiveOracle", "cromulon")).await;
    let datasource = harness.upload("gym-1", true).await;
    let queue = TokioJobQueue::new(Arc::new(harness.orchestrator()));
    let task = harness.queued_task(&datasource).await;

    let handle = queue
        .enqueue(PipelineJob::train_and_predict(
            task.task_code().clone(),
            COMPANY,
            datasource.upload_code().clone(),
            json!({}),
        ))
        .await?;

    assert!(matches!(handle.wait().await, Err(JobQueueError::Failed { .. })));
    let status = harness.context.tasks.current_status(task.task_code()).await?;
    assert_eq!(status, Some(TaskState::Failed));
    Ok(())
}
