//! Then steps for task status lifecycle scenarios.

use super::world::TaskStatusWorld;
use augur::task::{
    domain::{TaskDomainError, TaskState},
    services::TaskLifecycleError,
};
use rstest_bdd_macros::then;

#[then(r#"the task state is "{state}""#)]
fn task_state_is(world: &TaskStatusWorld, state: String) -> Result<(), eyre::Report> {
    let expected = TaskState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid expected state in scenario: {err}"))?;
    let actual = world.task()?.status();
    if actual != Some(expected) {
        return Err(eyre::eyre!("expected state {expected}, found {actual:?}"));
    }
    Ok(())
}

#[then("the task is completed")]
fn task_is_completed(world: &TaskStatusWorld) -> Result<(), eyre::Report> {
    eyre::ensure!(world.task()?.is_completed(), "task is not completed");
    Ok(())
}

#[then("the task is not completed")]
fn task_is_not_completed(world: &TaskStatusWorld) -> Result<(), eyre::Report> {
    eyre::ensure!(!world.task()?.is_completed(), "task is already completed");
    Ok(())
}

#[then(r#"the status log reads "{expected}""#)]
fn status_log_reads(world: &TaskStatusWorld, expected: String) -> Result<(), eyre::Report> {
    let log = world
        .task()?
        .statuses()
        .iter()
        .map(|status| status.state().as_str())
        .collect::<Vec<_>>()
        .join(", ");
    eyre::ensure!(log == expected, "expected log {expected}, found {log}");
    Ok(())
}

#[then("the transition fails with an invalid state transition error")]
fn transition_fails_with_invalid_transition(world: &TaskStatusWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_transition_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing transition result"))?;
    if !matches!(
        result,
        Err(TaskLifecycleError::Domain(
            TaskDomainError::InvalidStateTransition { .. }
        ))
    ) {
        return Err(eyre::eyre!(
            "expected InvalidStateTransition error, got {result:?}"
        ));
    }
    Ok(())
}

#[then("the transition fails because the task is already completed")]
fn transition_fails_because_completed(world: &TaskStatusWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_transition_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing transition result"))?;
    if !matches!(
        result,
        Err(TaskLifecycleError::Domain(
            TaskDomainError::TaskAlreadyCompleted { .. }
        ))
    ) {
        return Err(eyre::eyre!(
            "expected TaskAlreadyCompleted error, got {result:?}"
        ));
    }
    Ok(())
}

#[then("the task was reported as stalled")]
fn task_reported_as_stalled(world: &TaskStatusWorld) -> Result<(), eyre::Report> {
    let stalled = world
        .stalled
        .as_ref()
        .ok_or_else(|| eyre::eyre!("stalled tasks were not checked"))?;
    let task_code = world.task_code()?;
    eyre::ensure!(
        stalled.as_slice() == std::slice::from_ref(task_code),
        "expected only {task_code} to stall, got {stalled:?}"
    );
    Ok(())
}

#[then("no task was reported as stalled")]
fn no_task_reported_as_stalled(world: &TaskStatusWorld) -> Result<(), eyre::Report> {
    let stalled = world
        .stalled
        .as_ref()
        .ok_or_else(|| eyre::eyre!("stalled tasks were not checked"))?;
    eyre::ensure!(stalled.is_empty(), "unexpected stalled tasks {stalled:?}");
    Ok(())
}
