//! Unit tests for pipeline execution and submission.

mod orchestrator_tests;
mod service_tests;
