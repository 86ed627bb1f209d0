//! Process resource monitoring
//!
//! One sampler runs per monitored test run and reports the peak and average
//! resident memory of the spawned process tree.

mod sampler;

pub use sampler::{monitoring_supported, MemorySampler};
