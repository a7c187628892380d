//! Adapter implementations for the customer action log.

pub mod memory;
