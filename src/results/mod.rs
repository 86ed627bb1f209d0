//! Result aggregation and persistence
//!
//! Cumulative statistics for the session plus the failure detail log.

mod aggregate;
mod failure_log;

pub use aggregate::RunContext;
pub use failure_log::FailureLog;
