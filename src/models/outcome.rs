//! Test outcome models for stress runs
//!
//! Defines test identities, per-run outcomes, and cumulative statistics.

#![allow(dead_code)]

use serde::Serialize;
use std::fmt;

/// Container name used when a result cannot be matched to a test definition.
pub const UNKNOWN_CONTAINER: &str = "(unknown)";

/// Identity of one test, stable across runs.
///
/// The container is the fully qualified test class; the name is the test's
/// display name as reported by the test platform.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TestId {
    pub container: String,
    pub name: String,
}

impl TestId {
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
        }
    }

    /// Identity for a result whose definition entry was missing or incomplete.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::new(UNKNOWN_CONTAINER, name)
    }

    pub fn is_resolved(&self) -> bool {
        self.container != UNKNOWN_CONTAINER
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.container, self.name)
    }
}

/// Outcome of one test in one run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
}

impl Outcome {
    /// Parse a TRX outcome attribute. Outcomes that are neither a pass nor
    /// a failure (NotExecuted, Inconclusive, ...) return None and are not
    /// counted.
    pub fn from_trx(value: &str) -> Option<Outcome> {
        match value {
            "Passed" => Some(Outcome::Passed),
            "Failed" => Some(Outcome::Failed),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "PASSED"),
            Outcome::Failed => write!(f, "FAILED"),
        }
    }
}

/// Error message and stack trace attached to a failed result entry
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FailureDetail {
    pub message: String,
    pub stack_trace: String,
}

/// One parsed result entry: the outcome plus whatever failure detail the
/// report carried for it
#[derive(Clone, Debug, PartialEq)]
pub struct TestOutcome {
    pub outcome: Outcome,
    pub failure: Option<FailureDetail>,
}

impl TestOutcome {
    pub fn passed() -> Self {
        Self {
            outcome: Outcome::Passed,
            failure: None,
        }
    }

    pub fn failed(detail: Option<FailureDetail>) -> Self {
        Self {
            outcome: Outcome::Failed,
            failure: detail,
        }
    }
}

/// Resident-memory summary for one run, in megabytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MemorySample {
    pub max_mb: f64,
    pub avg_mb: f64,
}

impl MemorySample {
    /// Sample recorded when no readings were collected.
    pub const ZERO: MemorySample = MemorySample {
        max_mb: 0.0,
        avg_mb: 0.0,
    };

    /// Reduce raw per-poll totals (MB) into max and average.
    pub fn from_readings(readings: &[f64]) -> Self {
        if readings.is_empty() {
            return MemorySample::ZERO;
        }
        let max_mb = readings.iter().fold(0.0_f64, |acc, r| acc.max(*r));
        let avg_mb = readings.iter().sum::<f64>() / readings.len() as f64;
        MemorySample { max_mb, avg_mb }
    }
}

/// Cumulative statistics for one test across all completed runs
#[derive(Clone, Debug, Default, Serialize)]
pub struct TestStats {
    pub pass: u32,
    pub fail: u32,
    /// One entry per monitored run the test appeared in.
    pub memory: Vec<MemorySample>,
}

impl TestStats {
    pub fn total(&self) -> u32 {
        self.pass + self.fail
    }

    /// Failure rate as a percentage of counted runs.
    pub fn fail_percent(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            (self.fail as f64 / self.total() as f64) * 100.0
        }
    }

    /// Highest per-run maximum seen, or 0.0 when never monitored.
    pub fn max_memory_mb(&self) -> f64 {
        self.memory
            .iter()
            .fold(0.0_f64, |acc, s| acc.max(s.max_mb))
    }

    /// Mean of the per-run averages, or 0.0 when never monitored.
    pub fn avg_memory_mb(&self) -> f64 {
        if self.memory.is_empty() {
            0.0
        } else {
            self.memory.iter().map(|s| s.avg_mb).sum::<f64>() / self.memory.len() as f64
        }
    }
}
