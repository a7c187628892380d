//! Adapter implementations of the configuration port.

pub mod memory;
