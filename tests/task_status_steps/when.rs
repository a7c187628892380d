//! When steps for task status lifecycle scenarios.

use super::world::{TaskStatusWorld, run_async};
use augur::task::domain::TaskState;
use chrono::TimeDelta;
use eyre::WrapErr;
use rstest_bdd_macros::when;

fn move_task(
    world: &mut TaskStatusWorld,
    state: &str,
    message: Option<String>,
) -> Result<(), eyre::Report> {
    let target = TaskState::try_from(state)
        .map_err(|err| eyre::eyre!("invalid state in scenario: {err}"))?;
    let task_code = world.task_code()?.clone();
    let result = run_async(world.service.set_status(&task_code, target, message));
    world.last_transition_result = Some(result);
    Ok(())
}

#[when(r#"the task is moved to "{state}""#)]
fn task_is_moved(world: &mut TaskStatusWorld, state: String) -> Result<(), eyre::Report> {
    move_task(world, &state, None)
}

#[when(r#"the task enters "{state}" with message "{message}""#)]
fn task_is_moved_with_message(
    world: &mut TaskStatusWorld,
    state: String,
    message: String,
) -> Result<(), eyre::Report> {
    move_task(world, &state, Some(message))
}

#[when("{minutes:u32} minutes pass")]
fn minutes_pass(world: &mut TaskStatusWorld, minutes: u32) {
    world.clock.advance(TimeDelta::minutes(i64::from(minutes)));
}

#[when("tasks stalled for more than {minutes:u32} minutes are failed")]
fn stalled_tasks_are_failed(world: &mut TaskStatusWorld, minutes: u32) -> Result<(), eyre::Report> {
    let failed = run_async(
        world
            .service
            .fail_stalled_tasks(TimeDelta::minutes(i64::from(minutes))),
    )
    .wrap_err("fail stalled tasks")?;
    world.stalled = Some(failed);
    Ok(())
}
