//! In-memory repository for task tracking tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    datasource::domain::DataSourceId,
    task::{
        domain::{PersistedTaskData, Task, TaskCode, TaskResult, TaskStatus},
        ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
    },
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskCode, Task>,
    insertion_order: Vec<TaskCode>,
    results: HashMap<TaskCode, TaskResult>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

/// Rebuilds a task with an extra status row appended verbatim.
fn with_appended_status(task: &Task, status: &TaskStatus) -> Task {
    let mut statuses = task.statuses().to_vec();
    statuses.push(status.clone());
    Task::from_persisted(PersistedTaskData {
        task_code: task.task_code().clone(),
        kind: task.kind(),
        name: task.name().to_owned(),
        company_id: task.company_id(),
        datasource_id: task.datasource_id(),
        prediction_request: task.prediction_request().cloned(),
        created_at: task.created_at(),
        statuses,
    })
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(task.task_code()) {
            return Err(TaskRepositoryError::DuplicateTask(task.task_code().clone()));
        }
        state.insertion_order.push(task.task_code().clone());
        state.tasks.insert(task.task_code().clone(), task.clone());
        Ok(())
    }

    async fn append_status(
        &self,
        task_code: &TaskCode,
        status: &TaskStatus,
    ) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let updated = state
            .tasks
            .get(task_code)
            .map(|task| with_appended_status(task, status))
            .ok_or_else(|| TaskRepositoryError::NotFound(task_code.clone()))?;
        state.tasks.insert(task_code.clone(), updated);
        Ok(())
    }

    async fn update_prediction_request(
        &self,
        task_code: &TaskCode,
        request: &Value,
    ) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let task = state
            .tasks
            .get_mut(task_code)
            .ok_or_else(|| TaskRepositoryError::NotFound(task_code.clone()))?;
        task.record_prediction_request(request.clone());
        Ok(())
    }

    async fn find_by_code(&self, task_code: &TaskCode) -> TaskRepositoryResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.tasks.get(task_code).cloned())
    }

    async fn find_by_datasource(
        &self,
        datasource_id: DataSourceId,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        Ok(state
            .insertion_order
            .iter()
            .rev()
            .filter_map(|code| state.tasks.get(code))
            .filter(|task| task.datasource_id() == datasource_id)
            .cloned()
            .collect())
    }

    async fn find_incomplete(&self) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        Ok(state
            .insertion_order
            .iter()
            .filter_map(|code| state.tasks.get(code))
            .filter(|task| !task.is_completed())
            .cloned()
            .collect())
    }

    async fn store_result(&self, result: &TaskResult) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let task_code = result.task_code();
        if !state.tasks.contains_key(task_code) {
            return Err(TaskRepositoryError::NotFound(task_code.clone()));
        }
        if state.results.contains_key(task_code) {
            return Err(TaskRepositoryError::DuplicateResult(task_code.clone()));
        }
        state.results.insert(task_code.clone(), result.clone());
        Ok(())
    }

    async fn find_result(&self, task_code: &TaskCode) -> TaskRepositoryResult<Option<TaskResult>> {
        let state = self.read()?;
        Ok(state.results.get(task_code).cloned())
    }
}
