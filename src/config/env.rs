//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "DOTNET_STRESS";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Runs per queue item from DOTNET_STRESS_RUNS
    pub runs: Option<u32>,
    /// Build configuration from DOTNET_STRESS_CONFIGURATION
    pub configuration: Option<String>,
    /// Project reference from DOTNET_STRESS_PROJECT
    pub project: Option<String>,
    /// Sampler poll interval from DOTNET_STRESS_POLL_MS
    pub poll_ms: Option<u64>,
    /// Report artifact path from DOTNET_STRESS_ARTIFACT
    pub artifact: Option<String>,
    /// Failure log path from DOTNET_STRESS_FAILURE_LOG
    pub failure_log: Option<String>,
    /// Verbose from DOTNET_STRESS_VERBOSE
    pub verbose: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            runs: get_env_parse("RUNS"),
            configuration: get_env("CONFIGURATION"),
            project: get_env("PROJECT"),
            poll_ms: get_env_parse("POLL_MS"),
            artifact: get_env("ARTIFACT"),
            failure_log: get_env("FAILURE_LOG"),
            verbose: get_env_bool("VERBOSE"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.runs.is_some()
            || self.configuration.is_some()
            || self.project.is_some()
            || self.poll_ms.is_some()
            || self.artifact.is_some()
            || self.failure_log.is_some()
            || self.verbose.is_some()
    }

    /// Get build configuration with fallback
    pub fn configuration_or(&self, default: &str) -> String {
        self.configuration
            .clone()
            .unwrap_or_else(|| default.to_string())
    }

    /// Get poll interval with fallback
    pub fn poll_ms_or(&self, default: u64) -> u64 {
        self.poll_ms.unwrap_or(default)
    }

    /// Get failure log path with fallback
    pub fn failure_log_or(&self, default: &str) -> String {
        self.failure_log
            .clone()
            .unwrap_or_else(|| default.to_string())
    }

    /// Absolute path of the report artifact for this session.
    ///
    /// Relative overrides are resolved against the working directory so the
    /// logger argument and the post-run read agree on one location.
    pub fn artifact_path(&self) -> Result<PathBuf> {
        let name = self
            .artifact
            .clone()
            .unwrap_or_else(|| super::DEFAULT_ARTIFACT_NAME.to_string());
        let path = PathBuf::from(name);
        if path.is_absolute() {
            return Ok(path);
        }
        let cwd = env::current_dir().context("Failed to resolve working directory")?;
        Ok(cwd.join(path))
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_RUNS:           {:?}", ENV_PREFIX, self.runs);
        println!("  {}_CONFIGURATION:  {:?}", ENV_PREFIX, self.configuration);
        println!("  {}_PROJECT:        {:?}", ENV_PREFIX, self.project);
        println!("  {}_POLL_MS:        {:?}", ENV_PREFIX, self.poll_ms);
        println!("  {}_ARTIFACT:       {:?}", ENV_PREFIX, self.artifact);
        println!("  {}_FAILURE_LOG:    {:?}", ENV_PREFIX, self.failure_log);
        println!("  {}_VERBOSE:        {:?}", ENV_PREFIX, self.verbose);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables (useful for testing)
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    /// Create a new environment builder
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    /// Set runs
    pub fn runs(mut self, runs: u32) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_RUNS"), runs.to_string()));
        self
    }

    /// Set build configuration
    pub fn configuration(mut self, configuration: impl Into<String>) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_CONFIGURATION"), configuration.into()));
        self
    }

    /// Set project reference
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_PROJECT"), project.into()));
        self
    }

    /// Set poll interval
    pub fn poll_ms(mut self, poll_ms: u64) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_POLL_MS"), poll_ms.to_string()));
        self
    }

    /// Set artifact path
    pub fn artifact(mut self, artifact: impl Into<String>) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_ARTIFACT"), artifact.into()));
        self
    }

    /// Set failure log path
    pub fn failure_log(mut self, failure_log: impl Into<String>) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_FAILURE_LOG"), failure_log.into()));
        self
    }

    /// Set verbose
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_VERBOSE"), verbose.to_string()));
        self
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all DOTNET_STRESS environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_RUNS           Runs per queue item");
    println!("  {ENV_PREFIX}_CONFIGURATION  Build configuration (Debug, Release)");
    println!("  {ENV_PREFIX}_PROJECT        Project or solution to test");
    println!("  {ENV_PREFIX}_POLL_MS        Memory sampler poll interval in milliseconds");
    println!("  {ENV_PREFIX}_ARTIFACT       Path of the TRX report artifact");
    println!("  {ENV_PREFIX}_FAILURE_LOG    Path of the failure detail log");
    println!("  {ENV_PREFIX}_VERBOSE        Enable verbose output (true/false)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_PROJECT=tests/My.Tests.csproj");
    println!("  export {ENV_PREFIX}_RUNS=100");
    println!("  dotnet-stress run --until-failure");
}
