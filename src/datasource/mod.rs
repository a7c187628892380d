//! Uploaded data sources and the tables they point at.
//!
//! A data source records where a company's uploaded time series lives and
//! which features it carries. The stored table is reached through the
//! [`ports::FrameStore`] port and converted into oracle input by a
//! [`interpreter::DataSourceInterpreter`] chosen per company.

pub mod adapters;
pub mod domain;
pub mod interpreter;
pub mod ports;
