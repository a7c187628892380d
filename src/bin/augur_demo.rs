//! Runs one forecast end to end against a demo company.
//!
//! Usage:
//!
//! ```text
//! augur_demo [settings-path]
//! ```
//!
//! The optional TOML file at `settings-path` is overlaid with `AUGUR_*`
//! environment variables. When `store_root` is set, uploaded tables are
//! written below it; otherwise everything stays in memory. The demo uploads
//! four weeks of gym visitor counts, forecasts the following week with the
//! naive oracle, and writes the CSV export to standard output.

use std::io::{self, Write};
use std::sync::Arc;

use augur::{
    company::domain::CompanyId,
    configuration::{ComponentRegistry, ConfigurationError},
    datasource::{
        adapters::directory::DirectoryFrameStore,
        domain::{DataSourceDraft, UploadCode},
        ports::FrameStoreError,
    },
    frame::{Cell, FrameError, Table},
    logging,
    pipeline::{
        ForecastError, ForecastService, InlineJobQueue, JobQueue, Orchestrator, PipelineContext,
        PipelinePorts,
    },
    settings::{Settings, SettingsError},
};
use camino::Utf8PathBuf;
use chrono::NaiveDate;
use mockable::DefaultClock;
use serde_json::json;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::info;

const DEMO_COMPANY: CompanyId = CompanyId::new(1);
const DEMO_UPLOAD: &str = "demo-gym";
const FIRST_DAY: u32 = 1;
const LAST_DAY: u32 = 28;

#[derive(Debug, Error)]
enum DemoError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    FrameStore(#[from] FrameStoreError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("task {0} finished without a result")]
    MissingResult(String),
    #[error("runtime error: {0}")]
    Io(#[from] io::Error),
}

fn main() -> Result<(), DemoError> {
    let mut args = std::env::args().skip(1);
    let settings_path = args.next().map(Utf8PathBuf::from);
    if let Some(extra) = args.next() {
        return Err(DemoError::InvalidArgs(format!(
            "unexpected argument `{extra}`; usage: augur_demo [settings-path]"
        )));
    }

    let settings = Settings::load(settings_path.as_deref())?
        .with_env_overrides(std::env::vars())?
        .validate()?;
    logging::init(&settings);

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let csv = runtime.block_on(run(&settings))?;
    io::stdout().lock().write_all(csv.as_bytes())?;
    Ok(())
}

async fn run(settings: &Settings) -> Result<String, DemoError> {
    let service = build_service(settings)?;
    service
        .context()
        .configurations
        .record_configuration(
            DEMO_COMPANY,
            json!({
                "oracle_class": "NaiveOracle",
                "datasource_interpreter": "GymDataSourceInterpreter",
                "prediction_result_interpreter": "cromulon",
                "upload_strategy": "OnDemandPredictionStrategy",
                "oracle": {"horizon_days": 7},
            }),
        )
        .await?;

    let confirmed = service
        .confirm_upload(demo_draft(), &demo_table()?)
        .await?;
    info!(
        upload_code = %confirmed.datasource.upload_code(),
        "demo upload stored"
    );

    let task_code = service
        .submit_prediction(
            DEMO_COMPANY,
            confirmed.datasource.upload_code(),
            json!({
                "name": "demo week ahead",
                "features": ["number_people"],
                "start_time": "2017-09-29",
                "end_time": "2017-10-05",
            }),
        )
        .await?;

    let stalled = service.fail_stalled_tasks().await?;
    info!(count = stalled.len(), "stalled task sweep finished");

    service
        .export_result_csv(&task_code)
        .await?
        .ok_or_else(|| DemoError::MissingResult(task_code.to_string()))
}

fn build_service(settings: &Settings) -> Result<ForecastService<DefaultClock>, DemoError> {
    let ports = match &settings.store_root {
        Some(root) => PipelinePorts::in_memory()
            .with_frame_store(Arc::new(DirectoryFrameStore::open(root)?)),
        None => PipelinePorts::in_memory(),
    };
    let context = PipelineContext::new(
        ports,
        ComponentRegistry::with_defaults(),
        Arc::new(DefaultClock),
    )
    .with_forecast_horizon(settings.max_forecast_days);
    let runner = Arc::new(Orchestrator::new(context.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(InlineJobQueue::new(runner));
    Ok(ForecastService::new(context, queue).with_settings(settings))
}

fn demo_draft() -> DataSourceDraft {
    DataSourceDraft {
        upload_code: UploadCode::new(DEMO_UPLOAD),
        company_id: DEMO_COMPANY,
        location: format!("company_{DEMO_COMPANY}/{DEMO_UPLOAD}"),
        filename: "gym.csv".to_owned(),
        features: vec!["number_people".to_owned()],
        target_feature: "number_people".to_owned(),
        start_date: NaiveDate::from_ymd_opt(2017, 9, FIRST_DAY),
        end_date: NaiveDate::from_ymd_opt(2017, 9, LAST_DAY),
    }
}

fn demo_table() -> Result<Table, DemoError> {
    let mut table = Table::new(["number_people"]);
    for day in FIRST_DAY..=LAST_DAY {
        let Some(timestamp) =
            NaiveDate::from_ymd_opt(2017, 9, day).and_then(|date| date.and_hms_opt(0, 0, 0))
        else {
            continue;
        };
        table.push_row(timestamp, vec![Cell::Number(f64::from(day + 30))])?;
    }
    Ok(table)
}
