//! Utility modules: retry policy and single-flight coordination.

pub mod retry;
pub mod single_flight;
