//! Given steps for task status lifecycle scenarios.

use super::world::{COMPANY, TaskStatusWorld, run_async};
use augur::task::{
    domain::{TaskCode, TaskState},
    services::CreateTaskRequest,
};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"a prediction task named "{name}""#)]
fn prediction_task(world: &mut TaskStatusWorld, name: String) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new(name, TaskCode::generate(), COMPANY, world.datasource_id);
    let created = run_async(world.service.create_task(request))
        .wrap_err("create task for status scenario")?;
    world.task_code = Some(created.task_code().clone());
    Ok(())
}

#[given(r#"the task has been moved to "{state}""#)]
fn task_has_been_moved(world: &mut TaskStatusWorld, state: String) -> Result<(), eyre::Report> {
    let target = TaskState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid state in scenario: {err}"))?;
    let task_code = world.task_code()?.clone();
    run_async(world.service.set_status(&task_code, target, None))
        .wrap_err("move task in scenario setup")?;
    Ok(())
}
