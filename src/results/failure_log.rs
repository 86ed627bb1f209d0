//! Failure detail log
//!
//! Appends message and stack trace context for every failed outcome so a
//! long unattended session keeps evidence of what broke.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::{FailureDetail, TestId};

const SEPARATOR_WIDTH: usize = 70;

/// Append-only failure log, truncated once when the session starts.
pub struct FailureLog {
    file: File,
    path: PathBuf,
}

impl FailureLog {
    /// Open the log, discarding anything left from a previous session.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create failure log {}", path.display()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one failure block. Write errors are logged and swallowed so
    /// a full disk cannot stop the run loop.
    pub fn record(&mut self, run: u64, id: &TestId, detail: Option<&FailureDetail>) {
        if let Err(e) = self.append(run, id, detail) {
            warn!("Failed to write failure record: {e}");
        }
    }

    fn append(&mut self, run: u64, id: &TestId, detail: Option<&FailureDetail>) -> Result<()> {
        let detail = detail.cloned().unwrap_or_default();
        writeln!(self.file, "[Run {run}] {id}")?;
        writeln!(self.file, "Time: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(self.file, "Message: {}", detail.message)?;
        writeln!(self.file, "Stack trace:\n{}", detail.stack_trace)?;
        writeln!(self.file, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_truncates_previous_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("failures.log");
        std::fs::write(&path, "stale content\n").expect("seed file");

        let _log = FailureLog::create(&path).expect("create log");
        let content = std::fs::read_to_string(&path).expect("read log");
        assert!(content.is_empty());
    }

    #[test]
    fn test_record_appends_blocks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("failures.log");
        let mut log = FailureLog::create(&path).expect("create log");

        let id = TestId::new("Suite.Tests", "Breaks");
        let detail = FailureDetail {
            message: "expected 200, got 500".to_string(),
            stack_trace: "at Suite.Tests.Breaks()".to_string(),
        };
        log.record(2, &id, Some(&detail));
        log.record(5, &id, Some(&detail));

        let content = std::fs::read_to_string(&path).expect("read log");
        assert!(content.contains("[Run 2] Suite.Tests.Breaks"));
        assert!(content.contains("[Run 5] Suite.Tests.Breaks"));
        assert!(content.contains("expected 200, got 500"));
        assert_eq!(content.matches(&"-".repeat(SEPARATOR_WIDTH)).count(), 2);
    }

    #[test]
    fn test_record_without_detail_uses_empty_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("failures.log");
        let mut log = FailureLog::create(&path).expect("create log");

        log.record(1, &TestId::unresolved("Mystery"), None);

        let content = std::fs::read_to_string(&path).expect("read log");
        assert!(content.contains("[Run 1] (unknown).Mystery"));
        assert!(content.contains("Message: \n"));
    }
}
