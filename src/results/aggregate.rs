//! Outcome aggregation
//!
//! Folds each run's parsed outcomes into cumulative per-test statistics.

use std::collections::BTreeMap;

use crate::models::{MemorySample, Outcome, TestId, TestOutcome, TestStats};
use crate::results::FailureLog;

/// Cumulative state for one harness session: the run counter, the monotonic
/// failure flag, and per-test statistics keyed by identity.
///
/// The map is ordered, so iteration (and everything rendered from it) is
/// deterministic for a given set of outcomes.
#[derive(Debug, Default)]
pub struct RunContext {
    runs: u64,
    failure_detected: bool,
    stats: BTreeMap<TestId, TestStats>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs attempted so far.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Advance the run counter and return the new run number.
    pub fn next_run(&mut self) -> u64 {
        self.runs += 1;
        self.runs
    }

    /// True once any run reported a failed outcome. Never resets.
    pub fn failure_detected(&self) -> bool {
        self.failure_detected
    }

    pub fn stats(&self) -> &BTreeMap<TestId, TestStats> {
        &self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Fold one run's outcomes into the statistics.
    ///
    /// `memory` is the run's sample when monitoring was active; it is
    /// appended for every test that appeared in the run. Failed outcomes
    /// are forwarded to the recorder when one is attached.
    pub fn absorb(
        &mut self,
        outcomes: BTreeMap<TestId, TestOutcome>,
        memory: Option<MemorySample>,
        mut recorder: Option<&mut FailureLog>,
    ) {
        let run = self.runs;
        for (id, result) in outcomes {
            let stats = self.stats.entry(id.clone()).or_default();
            match result.outcome {
                Outcome::Passed => stats.pass += 1,
                Outcome::Failed => {
                    stats.fail += 1;
                    self.failure_detected = true;
                    if let Some(log) = recorder.as_deref_mut() {
                        log.record(run, &id, result.failure.as_ref());
                    }
                }
            }
            if let Some(sample) = memory {
                stats.memory.push(sample);
            }
        }
    }
}
