//! End-to-end forecast pipeline tests over in-memory adapters.
//!
//! Each test wires a [`ForecastService`] to an inline job queue so that a
//! submission has run to completion by the time it returns.

use std::collections::BTreeMap;
use std::sync::Arc;

use augur::{
    company::domain::CompanyId,
    configuration::ComponentRegistry,
    datasource::domain::{DataSourceDraft, UploadCode},
    frame::{Cell, Table},
    oracle::{
        FeatureSensitivity, Oracle, OracleError, OracleInput, OracleOutput, OracleSettings, Series,
    },
    pipeline::{
        ForecastError, ForecastService, InlineJobQueue, JobQueue, Orchestrator, PipelineContext,
        PipelinePorts, TRAINING_MESSAGE,
    },
    task::domain::{TaskState, TaskStatus},
    task::ports::TaskRepository,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use eyre::{OptionExt, ensure};
use mockable::DefaultClock;
use mockall::mock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

mock! {
    pub Engine {}

    impl Oracle for Engine {
        fn train(&mut self, data: &OracleInput, as_of: DateTime<Utc>) -> Result<(), OracleError>;

        fn predict(
            &mut self,
            data: &OracleInput,
            as_of: DateTime<Utc>,
            target_timestamp: Option<DateTime<Utc>>,
        ) -> Result<OracleOutput, OracleError>;
    }
}

const COMPANY: CompanyId = CompanyId::new(11);
const BOOM_ORACLE: &str = "BoomOracle";
const SENSITIVE_ORACLE: &str = "SensitiveOracle";

struct Pipeline {
    service: ForecastService<DefaultClock>,
    tasks: Arc<dyn TaskRepository>,
}

impl Pipeline {
    async fn configure(&self, document: Value) -> eyre::Result<()> {
        self.service
            .context()
            .configurations
            .record_configuration(COMPANY, document)
            .await?;
        Ok(())
    }

    async fn upload(&self, code: &str, end_day: u32) -> eyre::Result<UploadCode> {
        let confirmed = self
            .service
            .confirm_upload(draft(code, end_day), &gym_table(end_day)?)
            .await?;
        Ok(confirmed.datasource.upload_code().clone())
    }
}

fn day(d: u32) -> eyre::Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2017, 9, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_eyre("valid September day")
}

fn gym_table(end_day: u32) -> eyre::Result<Table> {
    let mut table = Table::new(["number_people"]);
    for d in 1..=end_day {
        table.push_row(day(d)?, vec![Cell::Number(f64::from(d))])?;
    }
    Ok(table)
}

fn draft(code: &str, end_day: u32) -> DataSourceDraft {
    DataSourceDraft {
        upload_code: UploadCode::new(code),
        company_id: COMPANY,
        location: format!("company_{COMPANY}/{code}"),
        filename: "gym.csv".to_owned(),
        features: vec!["number_people".to_owned()],
        target_feature: "number_people".to_owned(),
        start_date: NaiveDate::from_ymd_opt(2017, 9, 1),
        end_date: NaiveDate::from_ymd_opt(2017, 9, end_day),
    }
}

fn configuration(oracle_class: &str, result_interpreter: &str) -> Value {
    json!({
        "oracle_class": oracle_class,
        "datasource_interpreter": "GymDataSourceInterpreter",
        "prediction_result_interpreter": result_interpreter,
        "oracle": {"horizon_days": 1},
    })
}

fn request(start: &str, end: &str) -> Value {
    json!({
        "name": "gym visitors",
        "features": ["number_people"],
        "start_time": start,
        "end_time": end,
    })
}

fn boom_oracle(_settings: &OracleSettings) -> Result<Box<dyn Oracle>, OracleError> {
    let mut engine = MockEngine::new();
    engine
        .expect_train()
        .times(1)
        .returning(|_, _| Err(OracleError::Failed("boom".to_owned())));
    engine.expect_predict().never();
    Ok(Box::new(engine))
}

fn sensitive_oracle(_settings: &OracleSettings) -> Result<Box<dyn Oracle>, OracleError> {
    let mut engine = MockEngine::new();
    engine.expect_train().returning(|_, _| Ok(()));
    engine.expect_predict().returning(|_, as_of, _| {
        Ok(OracleOutput::MetaCrocubot {
            mean_vector: Series::new().with("gym", 30.0).with("pool", 12.0),
            lower_bound: Series::new().with("gym", 25.0).with("pool", 10.0),
            upper_bound: Series::new().with("gym", 35.0).with("pool", 14.0),
            feature_sensitivity: FeatureSensitivity {
                per_symbol: BTreeMap::from([
                    (
                        "gym".to_owned(),
                        BTreeMap::from([
                            ("number_people_0".to_owned(), 0.6),
                            ("number_people_1".to_owned(), -0.2),
                            ("weather_0".to_owned(), 0.2),
                        ]),
                    ),
                    (
                        "pool".to_owned(),
                        BTreeMap::from([("weather_0".to_owned(), 0.7), ("hour_0".to_owned(), 0.3)]),
                    ),
                ]),
                average: None,
            },
            target_timestamp: as_of.naive_utc(),
        })
    });
    Ok(Box::new(engine))
}

#[fixture]
fn pipeline() -> Pipeline {
    let ports = PipelinePorts::in_memory();
    let tasks = Arc::clone(&ports.tasks);
    let registry = ComponentRegistry::with_defaults()
        .with_oracle(BOOM_ORACLE, boom_oracle)
        .with_oracle(SENSITIVE_ORACLE, sensitive_oracle);
    let context = PipelineContext::new(ports, registry, Arc::new(DefaultClock))
        .with_forecast_horizon(30);
    let runner = Arc::new(Orchestrator::new(context.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(InlineJobQueue::new(runner));
    Pipeline {
        service: ForecastService::new(context, queue),
        tasks,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn single_day_request_yields_one_datapoint(pipeline: Pipeline) -> eyre::Result<()> {
    pipeline.configure(configuration("NaiveOracle", "cromulon")).await?;
    let upload = pipeline.upload("gym-1", 28).await?;

    let task_code = pipeline
        .service
        .submit_prediction(COMPANY, &upload, request("2017-09-29", "2017-09-29"))
        .await?;

    let view = pipeline
        .service
        .get_task(&task_code)
        .await?
        .ok_or_eyre("task exists")?;
    ensure!(view.status == Some(TaskState::Successful), "status {:?}", view.status);
    let stored = pipeline
        .service
        .get_result(&task_code)
        .await?
        .ok_or_eyre("result stored")?;
    let timestamps: Vec<&str> = stored
        .result()
        .datapoints
        .iter()
        .map(|datapoint| datapoint.timestamp.as_str())
        .collect();
    ensure!(timestamps == ["2017-09-29"], "timestamps {timestamps:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_upload_creates_nothing(pipeline: Pipeline) -> eyre::Result<()> {
    pipeline.configure(configuration("NaiveOracle", "cromulon")).await?;

    let outcome = pipeline
        .service
        .submit_prediction(
            COMPANY,
            &UploadCode::new("missing"),
            request("2017-09-29", "2017-09-29"),
        )
        .await;

    ensure!(
        matches!(outcome, Err(ForecastError::UnknownUpload(_))),
        "unexpected outcome {outcome:?}"
    );
    ensure!(pipeline.tasks.find_incomplete().await?.is_empty(), "task created");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn training_failure_fails_the_task_without_result(pipeline: Pipeline) -> eyre::Result<()> {
    pipeline.configure(configuration(BOOM_ORACLE, "cromulon")).await?;
    let upload = pipeline.upload("gym-2", 28).await?;

    let task_code = pipeline
        .service
        .submit_prediction(COMPANY, &upload, request("2017-09-29", "2017-09-29"))
        .await?;

    let view = pipeline
        .service
        .get_task(&task_code)
        .await?
        .ok_or_eyre("task exists")?;
    let states: Vec<TaskState> = view.statuses.iter().map(TaskStatus::state).collect();
    ensure!(
        states
            == [
                TaskState::Queued,
                TaskState::Started,
                TaskState::InProgress,
                TaskState::Failed
            ],
        "states {states:?}"
    );
    let messages: Vec<Option<&str>> = view.statuses.iter().map(TaskStatus::message).collect();
    ensure!(messages.get(2) == Some(&Some(TRAINING_MESSAGE)), "messages {messages:?}");
    ensure!(messages.get(3) == Some(&Some("boom")), "messages {messages:?}");
    ensure!(
        pipeline.service.get_result(&task_code).await?.is_none(),
        "failed task has a result"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn upload_strategy_forecasts_the_configured_horizon(pipeline: Pipeline) -> eyre::Result<()> {
    let mut document = configuration("NaiveOracle", "cromulon");
    if let Some(fields) = document.as_object_mut() {
        fields.insert(
            "upload_strategy".to_owned(),
            json!("TrainAndPredictOnUploadStrategy"),
        );
    }
    pipeline.configure(document).await?;
    pipeline.upload("gym-original", 28).await?;

    let confirmed = pipeline
        .service
        .confirm_upload(draft("gym-delta", 28), &gym_table(28)?)
        .await?;

    let task_code = confirmed.scheduled_task.ok_or_eyre("prediction scheduled")?;
    let view = pipeline
        .service
        .get_task(&task_code)
        .await?
        .ok_or_eyre("task exists")?;
    let recorded = view.prediction_request.ok_or_eyre("request recorded")?;
    ensure!(recorded.get("start_time") == Some(&json!("2017-09-28")), "{recorded}");
    ensure!(recorded.get("end_time") == Some(&json!("2017-10-28")), "{recorded}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repository_log_is_last_write_wins(pipeline: Pipeline) -> eyre::Result<()> {
    pipeline.configure(configuration("NaiveOracle", "cromulon")).await?;
    let upload = pipeline.upload("gym-3", 28).await?;
    let task_code = pipeline
        .service
        .submit_prediction(COMPANY, &upload, request("2017-09-29", "2017-09-29"))
        .await?;

    for state in [TaskState::Successful, TaskState::Failed] {
        pipeline
            .tasks
            .append_status(&task_code, &TaskStatus::new(state, None, &DefaultClock))
            .await?;
    }

    let task = pipeline
        .tasks
        .find_by_code(&task_code)
        .await?
        .ok_or_eyre("task exists")?;
    ensure!(task.status() == Some(TaskState::Failed), "status {:?}", task.status());
    let guarded = pipeline
        .service
        .context()
        .tasks
        .set_status(&task_code, TaskState::Successful, None)
        .await;
    ensure!(guarded.is_err(), "service appended after a terminal state");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sensitivities_become_percentage_factors(pipeline: Pipeline) -> eyre::Result<()> {
    pipeline.configure(configuration(SENSITIVE_ORACLE, "auto")).await?;
    let upload = pipeline.upload("gym-4", 28).await?;

    let task_code = pipeline
        .service
        .submit_prediction(COMPANY, &upload, request("2017-09-29", "2017-09-29"))
        .await?;

    let stored = pipeline
        .service
        .get_result(&task_code)
        .await?
        .ok_or_eyre("result stored")?;
    let factors = &stored.result().factors;
    for symbol in ["gym", "pool"] {
        let total: f64 = factors
            .iter()
            .filter_map(|factor| factor.breakdown.symbols.get(symbol))
            .sum();
        ensure!((99.95..=100.05).contains(&total), "{symbol} sums to {total}");
    }
    let average_total: f64 = factors.iter().map(|factor| factor.breakdown.average).sum();
    ensure!((99.95..=100.05).contains(&average_total), "averages sum to {average_total}");
    let number_people = factors.get("number_people").ok_or_eyre("demangled feature")?;
    ensure!(
        number_people.symbols.get("gym").copied() == Some(80.0),
        "gym share {:?}",
        number_people.symbols.get("gym")
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn csv_export_is_stable(pipeline: Pipeline) -> eyre::Result<()> {
    pipeline.configure(configuration(SENSITIVE_ORACLE, "metacrocubot")).await?;
    let upload = pipeline.upload("gym-5", 28).await?;
    let task_code = pipeline
        .service
        .submit_prediction(COMPANY, &upload, request("2017-09-29", "2017-09-29"))
        .await?;

    let first = pipeline
        .service
        .export_result_csv(&task_code)
        .await?
        .ok_or_eyre("csv rendered")?;
    let second = pipeline
        .service
        .export_result_csv(&task_code)
        .await?
        .ok_or_eyre("csv rendered")?;

    ensure!(first == second, "export changed between calls");
    ensure!(
        first == "timestamp,gym,pool\n2017-09-29,25.00;30.00;35.00,10.00;12.00;14.00\n",
        "csv {first}"
    );
    Ok(())
}
