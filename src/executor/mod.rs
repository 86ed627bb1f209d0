//! Test execution engine
//!
//! The driver owns the run loop; the process module owns one invocation of
//! the external tool.

mod driver;
mod process;

pub use driver::{
    cleanup_artifact, DriverConfig, DriverState, HarnessError, RepeatMode, RunQueueItem,
    StopReason, StressDriver,
};
pub use process::{rewrite_filter, run_invocation, RunOutput, TestInvocation};
