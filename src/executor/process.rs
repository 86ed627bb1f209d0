//! Child process execution
//!
//! Builds and runs one `dotnet test` invocation, capturing diagnostics and
//! joining the per-run memory sampler.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::models::MemorySample;
use crate::monitor::MemorySampler;

/// Operators recognized by the test platform's filter language. A filter
/// containing none of these is a bare test name.
const FILTER_OPERATORS: &[char] = &['~', '=', '!', '&', '|', '(', ')'];

/// One invocation of the external test tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestInvocation {
    program: String,
    project: Option<String>,
    configuration: String,
    filter: Option<String>,
    artifact: PathBuf,
}

impl TestInvocation {
    pub fn new(configuration: impl Into<String>, artifact: PathBuf) -> Self {
        Self {
            program: "dotnet".to_string(),
            project: None,
            configuration: configuration.into(),
            filter: None,
            artifact,
        }
    }

    /// Override the tool binary. Mostly useful for wrappers and tests.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_project(mut self, project: Option<String>) -> Self {
        self.project = project;
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument vector handed to the tool.
    ///
    /// The TRX logger is pointed at the absolute artifact path so the
    /// harness knows exactly where to pick the report up afterwards.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["test".to_string()];
        if let Some(project) = &self.project {
            args.push(project.clone());
        }
        args.push("--configuration".to_string());
        args.push(self.configuration.clone());
        args.push("--logger".to_string());
        args.push(format!("trx;LogFileName={}", self.artifact.display()));
        if let Some(filter) = &self.filter {
            args.push("--filter".to_string());
            args.push(filter.clone());
        }
        args
    }
}

/// Rewrite a bare test name into a fully-qualified-name match. Expressions
/// that already use filter operators pass through untouched.
pub fn rewrite_filter(filter: &str) -> String {
    if filter.contains(FILTER_OPERATORS) {
        filter.to_string()
    } else {
        format!("FullyQualifiedName~{filter}")
    }
}

/// What one child invocation produced.
#[derive(Debug)]
pub struct RunOutput {
    pub status: ExitStatus,
    pub stderr: String,
    pub memory: Option<MemorySample>,
}

/// Spawn the tool, wait for it to exit, and join the run's sampler.
///
/// Stdout is discarded (per-run test output is noise at this volume) and
/// stderr is captured for diagnostics. The child is never killed here; a
/// run in flight always completes.
pub async fn run_invocation(
    invocation: &TestInvocation,
    monitor: Option<Duration>,
) -> Result<RunOutput> {
    let args = invocation.to_args();
    debug!("Spawning {} {}", invocation.program(), args.join(" "));

    let child = Command::new(invocation.program())
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {}", invocation.program()))?;

    let sampler = match (monitor, child.id()) {
        (Some(interval), Some(pid)) => Some(MemorySampler::spawn(pid, interval)),
        _ => None,
    };

    // wait_with_output drains stderr while waiting, so a chatty child
    // cannot deadlock on a full pipe.
    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("Failed to wait for {}", invocation.program()))?;

    let memory = match sampler {
        Some(sampler) => Some(sampler.finish().await),
        None => None,
    };

    Ok(RunOutput {
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        memory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_is_qualified() {
        assert_eq!(rewrite_filter("MyTest"), "FullyQualifiedName~MyTest");
        assert_eq!(
            rewrite_filter("Suite.Tests.MyTest"),
            "FullyQualifiedName~Suite.Tests.MyTest"
        );
    }

    #[test]
    fn test_filter_expressions_pass_through() {
        for expr in [
            "FullyQualifiedName~MyTest",
            "Category=Slow",
            "Name!=Setup",
            "(A|B)&C",
        ] {
            assert_eq!(rewrite_filter(expr), expr);
        }
    }

    #[test]
    fn test_invocation_args_order() {
        let invocation = TestInvocation::new("Release", PathBuf::from("/tmp/run.trx"))
            .with_project(Some("tests/My.Tests.csproj".to_string()))
            .with_filter(Some(rewrite_filter("Wobbles")));

        assert_eq!(
            invocation.to_args(),
            vec![
                "test",
                "tests/My.Tests.csproj",
                "--configuration",
                "Release",
                "--logger",
                "trx;LogFileName=/tmp/run.trx",
                "--filter",
                "FullyQualifiedName~Wobbles",
            ]
        );
    }

    #[test]
    fn test_invocation_without_project_or_filter() {
        let invocation = TestInvocation::new("Debug", PathBuf::from("/tmp/run.trx"));
        let args = invocation.to_args();
        assert_eq!(args[0], "test");
        assert_eq!(args[1], "--configuration");
        assert!(!args.contains(&"--filter".to_string()));
    }
}
