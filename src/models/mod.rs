//! Data models for stress-test execution
//!
//! This module contains all data structures used throughout the application.

mod outcome;

pub use outcome::{
    FailureDetail, MemorySample, Outcome, TestId, TestOutcome, TestStats, UNKNOWN_CONTAINER,
};
