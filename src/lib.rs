//! Augur: multi-tenant forecasting task orchestration.
//!
//! Companies upload time series, configure which oracle and interpreters
//! serve them, and submit prediction requests. Each request becomes a task
//! whose lifecycle is an append-only status log; a background pipeline
//! trains the configured oracle, predicts, and stores the forecast in a
//! canonical, versioned JSON shape.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure types and state machines with no infrastructure
//!   dependencies
//! - **Ports**: Async trait interfaces for storage and queues
//! - **Adapters**: In-memory, directory, and `PostgreSQL` implementations
//! - **Services**: Orchestration over ports with an injected clock
//!
//! # Modules
//!
//! - [`task`]: Task status state machine, status log, and results
//! - [`configuration`]: Per-company configuration and component registry
//! - [`datasource`]: Uploaded data sources, table storage, and interpreters
//! - [`oracle`]: Forecasting oracle capability and its family-tagged output
//! - [`interpreter`]: Canonical result conversion, factors, and CSV export
//! - [`upload`]: Post-upload strategies
//! - [`pipeline`]: Job orchestration, queues, and the submission facade
//! - [`company`]: Company identity and the customer action log
//! - [`frame`]: Datetime-indexed tables and numeric frames
//! - [`settings`] and [`logging`]: Runtime configuration and tracing setup

pub mod company;
pub mod configuration;
pub mod datasource;
pub mod frame;
pub mod interpreter;
pub mod logging;
pub mod oracle;
pub mod pipeline;
pub mod settings;
pub mod task;
pub mod upload;
