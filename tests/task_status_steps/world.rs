//! Shared world state for task status lifecycle scenarios.

use std::sync::{Arc, Mutex, PoisonError};

use augur::{
    company::domain::CompanyId,
    datasource::domain::DataSourceId,
    task::{
        adapters::memory::InMemoryTaskRepository,
        domain::{Task, TaskCode, TaskStatus},
        services::{TaskLifecycleError, TaskLifecycleService},
    },
};
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;

/// Company owning every task in the scenarios.
pub const COMPANY: CompanyId = CompanyId::new(7);

/// Clock that only moves when a step advances it.
#[derive(Debug)]
pub struct SteppingClock(Mutex<DateTime<Utc>>);

impl SteppingClock {
    const fn starting_at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Service type used by the BDD world.
pub type TestTaskService = TaskLifecycleService<InMemoryTaskRepository, SteppingClock>;

/// Scenario world for task status behaviour tests.
pub struct TaskStatusWorld {
    pub service: TestTaskService,
    pub clock: Arc<SteppingClock>,
    pub datasource_id: DataSourceId,
    pub task_code: Option<TaskCode>,
    pub last_transition_result: Option<Result<TaskStatus, TaskLifecycleError>>,
    pub stalled: Option<Vec<TaskCode>>,
}

impl TaskStatusWorld {
    /// Creates a world whose clock starts at a fixed instant.
    #[must_use]
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2017, 9, 29, 9, 0, 0)
            .single()
            .unwrap_or_default();
        let clock = Arc::new(SteppingClock::starting_at(start));
        let service = TaskLifecycleService::new(
            Arc::new(InMemoryTaskRepository::new()),
            Arc::clone(&clock),
        );

        Self {
            service,
            clock,
            datasource_id: DataSourceId::new(),
            task_code: None,
            last_transition_result: None,
            stalled: None,
        }
    }

    /// Returns the code of the task under test.
    pub fn task_code(&self) -> Result<&TaskCode, eyre::Report> {
        self.task_code
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// Loads the task under test from the repository.
    pub fn task(&self) -> Result<Task, eyre::Report> {
        let task_code = self.task_code()?;
        run_async(self.service.find_by_code(task_code))?
            .ok_or_else(|| eyre::eyre!("task {task_code} not found"))
    }
}

impl Default for TaskStatusWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskStatusWorld {
    TaskStatusWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
