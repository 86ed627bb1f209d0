//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Stress harness for dotnet test suites
#[derive(Parser, Debug)]
#[command(name = "dotnet-stress")]
#[command(version = "0.1.0")]
#[command(about = "Rerun dotnet test to expose flaky tests and memory growth")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the test suite repeatedly and report per-test stability
    Run(RunArgs),

    /// List the tests dotnet discovers in a project
    List(ListArgs),

    /// Show environment variable configuration
    Env,
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Number of runs [default: 10]
    #[arg(short, long)]
    pub runs: Option<u32>,

    /// Keep running until a run contains a failure
    #[arg(long)]
    pub until_failure: bool,

    /// Test filter; bare names are matched as FullyQualifiedName~<name>
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Project or solution to test
    #[arg(short, long)]
    pub project: Option<String>,

    /// Build configuration [default: Debug]
    #[arg(short, long)]
    pub configuration: Option<String>,

    /// Discover tests first and stress each one in isolation
    #[arg(long)]
    pub per_test: bool,

    /// Record failure messages and stack traces to a log file
    #[arg(long)]
    pub record_failures: bool,

    /// Sample memory usage of the test process during each run
    #[arg(long)]
    pub monitor_memory: bool,

    /// Write final per-test stats to a file (.csv or .json)
    #[arg(short, long)]
    pub snapshot: Option<String>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Project or solution to inspect
    #[arg(short, long)]
    pub project: Option<String>,

    /// Build configuration [default: Debug]
    #[arg(short, long)]
    pub configuration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["dotnet-stress", "run", "--runs", "25", "--until-failure"]);
        match args.command {
            Command::Run(run_args) => {
                assert_eq!(run_args.runs, Some(25));
                assert!(run_args.until_failure);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_defaults() {
        let args = Args::parse_from(["dotnet-stress", "run"]);
        match args.command {
            Command::Run(run_args) => {
                assert_eq!(run_args.runs, None);
                assert_eq!(run_args.filter, None);
                assert!(!run_args.until_failure);
                assert!(!run_args.per_test);
                assert!(!run_args.monitor_memory);
                assert!(!run_args.record_failures);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "dotnet-stress",
            "run",
            "--project",
            "tests/My.Tests.csproj",
            "--filter",
            "LeakyTest",
            "--monitor-memory",
            "--snapshot",
            "stats.json",
        ]);
        match args.command {
            Command::Run(run_args) => {
                assert_eq!(run_args.project.as_deref(), Some("tests/My.Tests.csproj"));
                assert_eq!(run_args.filter.as_deref(), Some("LeakyTest"));
                assert!(run_args.monitor_memory);
                assert_eq!(run_args.snapshot.as_deref(), Some("stats.json"));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_list_args() {
        let args = Args::parse_from(["dotnet-stress", "list", "-p", "My.sln", "-c", "Release"]);
        match args.command {
            Command::List(list_args) => {
                assert_eq!(list_args.project.as_deref(), Some("My.sln"));
                assert_eq!(list_args.configuration.as_deref(), Some("Release"));
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_global_verbose() {
        let args = Args::parse_from(["dotnet-stress", "run", "--verbose"]);
        assert!(args.verbose);
    }
}
