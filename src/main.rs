//! dotnet-stress - Flaky Test and Memory Growth Hunter
//!
//! A CLI harness that reruns `dotnet test` many times, parses the TRX
//! report left behind by each run, and aggregates per-test pass/fail
//! counts and memory usage into one stability report.
//!
//! ## Features
//!
//! - Fixed-count or run-until-failure stress sessions
//! - Per-test isolation mode driven by `--list-tests` discovery
//! - Memory sampling of the spawned test process tree
//! - Failure message and stack trace recording
//! - CSV/JSON snapshot export of the final stats
//!
//! ## Usage
//!
//! ```bash
//! # Run the suite in the working directory 10 times
//! dotnet-stress run
//!
//! # Stress one test until it fails, keeping failure detail
//! dotnet-stress run --filter FlakyTest --until-failure --record-failures
//!
//! # Stress every test in a project separately, watching memory
//! dotnet-stress run --project tests/My.Tests.csproj --per-test --monitor-memory
//!
//! # Preview what discovery would run
//! dotnet-stress list --project tests/My.Tests.csproj
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod cli;
mod config;
mod discovery;
mod executor;
mod models;
mod monitor;
mod output;
mod results;
mod trx;
mod utils;

use cli::Args;
use config::EnvConfig;
use executor::{
    cleanup_artifact, DriverConfig, HarnessError, RepeatMode, RunQueueItem, StopReason,
    StressDriver,
};
use monitor::monitoring_supported;
use output::ReportFormatter;
use results::FailureLog;
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let verbose = args.verbose || env.verbose.unwrap_or(false);
    init_logger(if verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    match args.command {
        cli::Command::Run(run_args) => {
            run_stress(run_args, env).await?;
        }
        cli::Command::List(list_args) => {
            list_tests(list_args, env).await?;
        }
        cli::Command::Env => {
            env.print_summary();
            println!();
            config::print_env_help();
        }
    }

    Ok(())
}

async fn run_stress(args: cli::RunArgs, env: EnvConfig) -> Result<()> {
    let project = args.project.or_else(|| env.project.clone());
    let configuration = args
        .configuration
        .unwrap_or_else(|| env.configuration_or(config::DEFAULT_CONFIGURATION));

    let repeat = RepeatMode::resolve(args.until_failure, args.runs, env.runs, config::DEFAULT_RUNS);

    let artifact = env.artifact_path()?;

    let monitor = if args.monitor_memory {
        if monitoring_supported() {
            Some(Duration::from_millis(
                env.poll_ms_or(config::DEFAULT_POLL_INTERVAL_MS),
            ))
        } else {
            warn!("Memory monitoring is not supported on this platform, continuing without it");
            None
        }
    } else {
        None
    };

    let queue: Vec<RunQueueItem> = if args.per_test {
        if args.filter.is_some() {
            warn!("--filter is ignored in per-test mode");
        }
        let tests = discovery::discover_tests(project.as_deref(), &configuration).await?;
        if tests.is_empty() {
            warn!("Discovery returned no tests");
        }
        tests.into_iter().map(RunQueueItem::Test).collect()
    } else {
        vec![RunQueueItem::Filter(args.filter.clone())]
    };

    let driver_config = DriverConfig {
        program: "dotnet".to_string(),
        project,
        configuration,
        repeat,
        artifact: artifact.clone(),
        monitor,
    };

    let abort = Arc::new(AtomicBool::new(false));
    spawn_interrupt_watcher(abort.clone());

    let mut driver = StressDriver::new(driver_config, abort);
    if args.record_failures {
        let recorder = FailureLog::create(env.failure_log_or(config::DEFAULT_FAILURE_LOG))?;
        info!("Recording failure detail to {}", recorder.path().display());
        driver = driver.with_recorder(recorder);
    }

    info!("Targeting log file {}", artifact.display());
    info!("Starting...");

    let outcome = driver.run(&queue).await;

    // The report renders on every exit path, fatal outcomes included.
    print!("{}", ReportFormatter::new().format_report(driver.context()));

    if let Some(snapshot) = &args.snapshot {
        let path = PathBuf::from(snapshot);
        if let Err(e) = output::write_snapshot(&path, driver.context()) {
            warn!("Failed to write snapshot {}: {e:#}", path.display());
        }
    }

    cleanup_artifact(&artifact);

    match outcome? {
        StopReason::Completed | StopReason::FailureDetected | StopReason::Interrupted => Ok(()),
        StopReason::MissingArtifact { run } => Err(HarnessError::MissingArtifact { run }.into()),
    }
}

async fn list_tests(args: cli::ListArgs, env: EnvConfig) -> Result<()> {
    let project = args.project.or_else(|| env.project.clone());
    let configuration = args
        .configuration
        .unwrap_or_else(|| env.configuration_or(config::DEFAULT_CONFIGURATION));

    let tests = discovery::discover_tests(project.as_deref(), &configuration).await?;

    if tests.is_empty() {
        println!("No tests found.");
        return Ok(());
    }

    println!("\nDiscovered {} tests:\n", tests.len());
    for test in &tests {
        println!("  {test}");
    }
    println!();

    Ok(())
}

/// Flip the abort flag on Ctrl-C so the driver winds down after the
/// current run instead of mid-parse.
fn spawn_interrupt_watcher(abort: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for interrupt: {e}");
            return;
        }
        eprintln!();
        warn!("Interrupt received, finishing the current run");
        abort.store(true, Ordering::SeqCst);
    });
}
