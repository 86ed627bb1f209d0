//! Configuration module
//!
//! Session defaults and environment variable overrides.

#![allow(dead_code)]

pub mod env;

pub use env::{print_env_help, EnvConfig};

/// Default number of runs per queue item
pub const DEFAULT_RUNS: u32 = 10;

/// Default build configuration passed to the external tool
pub const DEFAULT_CONFIGURATION: &str = "Debug";

/// Report artifact written by the external tool's TRX logger, resolved
/// against the working directory
pub const DEFAULT_ARTIFACT_NAME: &str = "stress_test_temp.trx";

/// Default failure detail log path
pub const DEFAULT_FAILURE_LOG: &str = "failures.log";

/// Default memory sampler poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
