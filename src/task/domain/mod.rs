//! Domain model for prediction and training task tracking.
//!
//! A task's lifecycle state is never stored directly: it is derived from the
//! last entry of an append-only status log, which also serves as the audit
//! trail for failed runs.

mod error;
mod ids;
mod result;
mod state;
mod status;
mod task;

pub use error::{ParseTaskKindError, ParseTaskStateError, TaskDomainError};
pub use ids::TaskCode;
pub use result::TaskResult;
pub use state::TaskState;
pub use status::TaskStatus;
pub use task::{NewTask, PersistedTaskData, Task, TaskKind};
