//! Company identity and the customer action audit log.
//!
//! Every tenant-scoped record carries a [`domain::CompanyId`]. Services
//! record [`domain::CustomerAction`] entries explicitly after successful
//! writes so that audit side effects stay visible at the call site.

pub mod adapters;
pub mod domain;
pub mod ports;
