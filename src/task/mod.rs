//! Prediction and training task tracking.
//!
//! Tasks move through `QUEUED → STARTED → INPROGRESS* → SUCCESSFUL | FAILED`.
//! Each move appends an immutable status row; the current state is always
//! the state of the last row. Successful prediction tasks own exactly one
//! stored result. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
