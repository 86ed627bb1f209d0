//! The stress run loop
//!
//! Walks the run queue, executes the external tool once per iteration, and
//! feeds every parsed report into the cumulative statistics.

#![allow(dead_code)]

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::executor::process::{rewrite_filter, run_invocation, TestInvocation};
use crate::results::{FailureLog, RunContext};
use crate::trx;

/// Fatal conditions that end the whole session with a non-zero exit.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("run {run} produced no report artifact; the tool likely failed to build or start")]
    MissingArtifact { run: u64 },

    #[error("test discovery requires a project reference (--project)")]
    DiscoveryMisconfigured,
}

/// How many times each queue item is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatMode {
    /// Exactly this many runs, regardless of outcomes.
    Count(u32),
    /// Keep running until any test anywhere fails.
    UntilFailure,
}

impl RepeatMode {
    /// Resolve the repeat mode from the invocation surface.
    ///
    /// An explicit until-failure request wins over any runs value; for
    /// the run count, the command line beats the environment and the
    /// environment beats the default.
    pub fn resolve(
        until_failure: bool,
        cli_runs: Option<u32>,
        env_runs: Option<u32>,
        default: u32,
    ) -> RepeatMode {
        if until_failure {
            RepeatMode::UntilFailure
        } else {
            RepeatMode::Count(cli_runs.or(env_runs).unwrap_or(default))
        }
    }
}

/// One unit of repeated execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunQueueItem {
    /// Whole-suite run under an optional user filter.
    Filter(Option<String>),
    /// A single discovered test, stressed in isolation.
    Test(String),
}

/// Driver lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    /// Queue exhausted or a run limit reached.
    Complete,
    /// Interrupted, or the tool stopped producing reports.
    Aborted,
}

/// Why the run loop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    FailureDetected,
    Interrupted,
    MissingArtifact { run: u64 },
}

/// Settings for one session.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Tool binary, normally `dotnet`.
    pub program: String,
    pub project: Option<String>,
    pub configuration: String,
    pub repeat: RepeatMode,
    /// Absolute path the TRX logger writes to.
    pub artifact: PathBuf,
    /// Sampler poll interval when memory monitoring is on.
    pub monitor: Option<Duration>,
}

/// Sequential driver for the run queue.
///
/// Runs strictly one child at a time. The abort flag is checked between
/// iterations only, so an in-flight run always completes and is counted
/// before the loop winds down.
pub struct StressDriver {
    config: DriverConfig,
    state: DriverState,
    ctx: RunContext,
    recorder: Option<FailureLog>,
    abort: Arc<AtomicBool>,
}

impl StressDriver {
    pub fn new(config: DriverConfig, abort: Arc<AtomicBool>) -> Self {
        Self {
            config,
            state: DriverState::Idle,
            ctx: RunContext::new(),
            recorder: None,
            abort,
        }
    }

    /// Attach a failure log receiving message and stack trace detail.
    pub fn with_recorder(mut self, recorder: FailureLog) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Execute the queue and report why the loop ended.
    ///
    /// The caller renders the final report in every case, including when
    /// this returns an error.
    pub async fn run(&mut self, queue: &[RunQueueItem]) -> Result<StopReason> {
        self.state = DriverState::Running;

        for item in queue {
            match item {
                RunQueueItem::Test(name) => info!("Stressing {name}"),
                RunQueueItem::Filter(Some(expr)) => info!("Using filter {expr}"),
                RunQueueItem::Filter(None) => {}
            }

            let mut completed = 0u32;
            loop {
                if self.abort.load(Ordering::SeqCst) {
                    self.state = DriverState::Aborted;
                    info!("Stop requested; generating report");
                    return Ok(StopReason::Interrupted);
                }
                match self.config.repeat {
                    RepeatMode::Count(limit) => {
                        if completed >= limit {
                            break;
                        }
                    }
                    RepeatMode::UntilFailure => {
                        if self.ctx.failure_detected() {
                            self.state = DriverState::Complete;
                            info!("Failure detected after {} runs", self.ctx.runs());
                            return Ok(StopReason::FailureDetected);
                        }
                    }
                }

                match self.execute_once(item).await {
                    Ok(true) => completed += 1,
                    Ok(false) => {
                        self.state = DriverState::Aborted;
                        return Ok(StopReason::MissingArtifact {
                            run: self.ctx.runs(),
                        });
                    }
                    Err(e) => {
                        self.state = DriverState::Aborted;
                        return Err(e);
                    }
                }
            }
        }

        self.state = DriverState::Complete;
        Ok(StopReason::Completed)
    }

    /// Run the tool once and absorb its report.
    ///
    /// Returns false when the run produced no report artifact, which aborts
    /// the whole session.
    async fn execute_once(&mut self, item: &RunQueueItem) -> Result<bool> {
        let run = self.ctx.next_run();
        eprint!("Run {run}...\r");

        let invocation = self.build_invocation(item);
        let start = Instant::now();
        let output = run_invocation(&invocation, self.config.monitor).await?;
        debug!(
            "Run {run} finished in {}ms ({})",
            start.elapsed().as_millis(),
            output.status
        );

        if !self.config.artifact.exists() {
            eprintln!();
            error!(
                "Run {run} failed to produce results (no report at {})",
                self.config.artifact.display()
            );
            if !output.stderr.is_empty() {
                eprintln!("STDERR Output:");
                eprint!("{}", output.stderr);
                if !output.stderr.ends_with('\n') {
                    eprintln!();
                }
            }
            return Ok(false);
        }

        let outcomes = trx::parse_report(&self.config.artifact, run);
        if let Err(e) = std::fs::remove_file(&self.config.artifact) {
            warn!("Failed to remove report artifact after run {run}: {e}");
        }
        self.ctx.absorb(outcomes, output.memory, self.recorder.as_mut());
        Ok(true)
    }

    fn build_invocation(&self, item: &RunQueueItem) -> TestInvocation {
        let filter = match item {
            RunQueueItem::Filter(expr) => expr.as_deref().map(rewrite_filter),
            RunQueueItem::Test(name) => Some(rewrite_filter(name)),
        };
        TestInvocation::new(self.config.configuration.clone(), self.config.artifact.clone())
            .with_program(self.config.program.clone())
            .with_project(self.config.project.clone())
            .with_filter(filter)
    }
}

/// Remove the report artifact if one is lying around.
pub fn cleanup_artifact(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            debug!("Failed to remove report artifact {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_config(program: &str, artifact: PathBuf, repeat: RepeatMode) -> DriverConfig {
        DriverConfig {
            program: program.to_string(),
            project: None,
            configuration: "Debug".to_string(),
            repeat,
            artifact,
            monitor: None,
        }
    }

    #[test]
    fn test_until_failure_wins_over_any_runs_value() {
        assert_eq!(
            RepeatMode::resolve(true, Some(25), None, 10),
            RepeatMode::UntilFailure
        );
        assert_eq!(
            RepeatMode::resolve(true, None, Some(50), 10),
            RepeatMode::UntilFailure
        );
    }

    #[test]
    fn test_run_count_cli_beats_env_beats_default() {
        assert_eq!(
            RepeatMode::resolve(false, Some(5), Some(50), 10),
            RepeatMode::Count(5)
        );
        assert_eq!(
            RepeatMode::resolve(false, None, Some(50), 10),
            RepeatMode::Count(50)
        );
        assert_eq!(RepeatMode::resolve(false, None, None, 10), RepeatMode::Count(10));
    }

    #[test]
    fn test_new_driver_is_idle() {
        let config = driver_config("dotnet", PathBuf::from("/tmp/x.trx"), RepeatMode::Count(1));
        let driver = StressDriver::new(config, Arc::new(AtomicBool::new(false)));
        assert_eq!(driver.state(), DriverState::Idle);
        assert_eq!(driver.context().runs(), 0);
    }

    #[test]
    fn test_invocation_filter_per_item_kind() {
        let config = driver_config("dotnet", PathBuf::from("/tmp/x.trx"), RepeatMode::Count(1));
        let driver = StressDriver::new(config, Arc::new(AtomicBool::new(false)));

        let bare = driver.build_invocation(&RunQueueItem::Filter(Some("Wobbles".to_string())));
        assert!(bare
            .to_args()
            .contains(&"FullyQualifiedName~Wobbles".to_string()));

        let expr = driver.build_invocation(&RunQueueItem::Filter(Some("Category=Slow".to_string())));
        assert!(expr.to_args().contains(&"Category=Slow".to_string()));

        let single = driver.build_invocation(&RunQueueItem::Test("Suite.Tests.Spins".to_string()));
        assert!(single
            .to_args()
            .contains(&"FullyQualifiedName~Suite.Tests.Spins".to_string()));

        let unfiltered = driver.build_invocation(&RunQueueItem::Filter(None));
        assert!(!unfiltered.to_args().contains(&"--filter".to_string()));
    }

    #[tokio::test]
    async fn test_preset_abort_flag_stops_before_first_run() {
        let config = driver_config("dotnet", PathBuf::from("/tmp/x.trx"), RepeatMode::Count(5));
        let abort = Arc::new(AtomicBool::new(true));
        let mut driver = StressDriver::new(config, abort);

        let reason = driver
            .run(&[RunQueueItem::Filter(None)])
            .await
            .expect("loop should finish");
        assert_eq!(reason, StopReason::Interrupted);
        assert_eq!(driver.state(), DriverState::Aborted);
        assert_eq!(driver.context().runs(), 0);
    }

    #[test]
    fn test_cleanup_artifact_is_quiet() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stress_test_temp.trx");
        std::fs::write(&path, "x").expect("seed");

        cleanup_artifact(&path);
        assert!(!path.exists());
        // A second pass with nothing to remove is fine too.
        cleanup_artifact(&path);
    }

    #[cfg(unix)]
    mod with_fake_tool {
        use super::*;
        use crate::models::TestId;
        use std::os::unix::fs::PermissionsExt;

        const PASSING_TRX: &str = r#"<TestRun>
  <Results>
    <UnitTestResult testId="a" testName="Steady" outcome="Passed" />
  </Results>
  <TestDefinitions>
    <UnitTest id="a"><TestMethod className="Fake.Tests.Suite" name="Steady" /></UnitTest>
  </TestDefinitions>
</TestRun>"#;

        const FAILING_TRX: &str = r#"<TestRun>
  <Results>
    <UnitTestResult testId="a" testName="Wobbly" outcome="Failed" />
  </Results>
</TestRun>"#;

        /// Shell stand-in for the tool: ignores its arguments and drops a
        /// fixed report at the artifact path.
        fn fake_tool(dir: &Path, trx: &str) -> (String, PathBuf) {
            let artifact = dir.join("artifact.trx");
            let fixture = dir.join("fixture.trx");
            std::fs::write(&fixture, trx).expect("write fixture");

            let program = dir.join("fake-dotnet.sh");
            let script = format!(
                "#!/bin/sh\ncp '{}' '{}'\n",
                fixture.display(),
                artifact.display()
            );
            std::fs::write(&program, script).expect("write script");
            let mut perms = std::fs::metadata(&program).expect("stat").permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&program, perms).expect("chmod");

            (program.display().to_string(), artifact)
        }

        #[tokio::test]
        async fn test_fixed_count_runs_to_the_bound() {
            let dir = tempfile::tempdir().expect("tempdir");
            let (program, artifact) = fake_tool(dir.path(), PASSING_TRX);
            let config = driver_config(&program, artifact.clone(), RepeatMode::Count(3));
            let mut driver = StressDriver::new(config, Arc::new(AtomicBool::new(false)));

            let reason = driver
                .run(&[RunQueueItem::Filter(None)])
                .await
                .expect("loop should finish");

            assert_eq!(reason, StopReason::Completed);
            assert_eq!(driver.state(), DriverState::Complete);
            assert_eq!(driver.context().runs(), 3);
            let stats = &driver.context().stats()[&TestId::new("Fake.Tests.Suite", "Steady")];
            assert_eq!(stats.pass, 3);
            assert_eq!(stats.fail, 0);
            // Each run's artifact is consumed and removed.
            assert!(!artifact.exists());
        }

        #[tokio::test]
        async fn test_until_failure_halts_the_whole_queue() {
            let dir = tempfile::tempdir().expect("tempdir");
            let (program, artifact) = fake_tool(dir.path(), FAILING_TRX);
            let config = driver_config(&program, artifact, RepeatMode::UntilFailure);
            let mut driver = StressDriver::new(config, Arc::new(AtomicBool::new(false)));

            let queue = vec![
                RunQueueItem::Test("Fake.Tests.Suite.Wobbly".to_string()),
                RunQueueItem::Test("Fake.Tests.Suite.Steady".to_string()),
            ];
            let reason = driver.run(&queue).await.expect("loop should finish");

            assert_eq!(reason, StopReason::FailureDetected);
            assert_eq!(driver.state(), DriverState::Complete);
            // The first run failed, so the second queue item never started.
            assert_eq!(driver.context().runs(), 1);
            assert!(driver.context().failure_detected());
        }

        #[tokio::test]
        async fn test_missing_artifact_aborts_the_session() {
            let dir = tempfile::tempdir().expect("tempdir");
            let artifact = dir.path().join("never-written.trx");
            // `true` exits cleanly without writing any report.
            let config = driver_config("true", artifact, RepeatMode::Count(5));
            let mut driver = StressDriver::new(config, Arc::new(AtomicBool::new(false)));

            let queue = vec![RunQueueItem::Filter(None), RunQueueItem::Filter(None)];
            let reason = driver.run(&queue).await.expect("loop should finish");

            assert_eq!(reason, StopReason::MissingArtifact { run: 1 });
            assert_eq!(driver.state(), DriverState::Aborted);
            assert_eq!(driver.context().runs(), 1);
            assert!(driver.context().is_empty());
        }

        #[tokio::test]
        async fn test_missing_tool_is_an_error() {
            let dir = tempfile::tempdir().expect("tempdir");
            let artifact = dir.path().join("x.trx");
            let config = driver_config(
                "/nonexistent/fake-dotnet-binary",
                artifact,
                RepeatMode::Count(1),
            );
            let mut driver = StressDriver::new(config, Arc::new(AtomicBool::new(false)));

            let result = driver.run(&[RunQueueItem::Filter(None)]).await;
            assert!(result.is_err());
            assert_eq!(driver.state(), DriverState::Aborted);
        }
    }
}
