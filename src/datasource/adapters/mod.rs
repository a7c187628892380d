//! Adapter implementations of the data source ports.

pub mod directory;
pub mod memory;
