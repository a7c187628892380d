//! Company configuration resolution.
//!
//! Each company owns an append-only list of configuration documents; the
//! most recent one decides which oracle, data source interpreter, result
//! interpreter, and upload strategy its tasks use. Component names resolve
//! through an explicit [`ComponentRegistry`] populated at start-up, and
//! unknown names fail closed.

pub mod adapters;
pub mod domain;
pub mod ports;
mod registry;
mod resolver;

pub use domain::{
    CompanyConfiguration, ComponentKind, ConfigurationError, ConfigurationId,
    ConfigurationSettings,
};
pub use registry::{ComponentRegistry, OracleFactory};
pub use resolver::ConfigurationResolver;
