//! Test discovery
//!
//! Asks the external tool for the list of individually addressable tests,
//! used to build a per-test run queue.

use anyhow::{bail, Context, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::executor::HarnessError;

/// Marker preceding the test list in `dotnet test --list-tests` output.
const LIST_MARKER: &str = "tests are available";

/// List every test the project exposes, in tool order.
///
/// Requires a project reference; discovery against the ambient directory is
/// too easy to get wrong, so it is refused up front.
pub async fn discover_tests(project: Option<&str>, configuration: &str) -> Result<Vec<String>> {
    let project = project.ok_or(HarnessError::DiscoveryMisconfigured)?;

    let output = Command::new("dotnet")
        .arg("test")
        .arg(project)
        .args(["--configuration", configuration, "--list-tests"])
        .stdin(Stdio::null())
        .output()
        .await
        .context("Failed to invoke dotnet test --list-tests")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "dotnet test --list-tests failed ({}): {}",
            output.status,
            stderr.trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let tests = parse_list_output(&stdout);
    info!("Discovered {} tests in {project}", tests.len());
    debug!("Discovered tests: {tests:?}");
    Ok(tests)
}

/// Extract test names from listing output.
///
/// Everything after the marker line is the list: one trimmed, non-blank
/// line per test, kept in tool order.
pub fn parse_list_output(output: &str) -> Vec<String> {
    let mut tests = Vec::new();
    let mut in_list = false;
    for line in output.lines() {
        if in_list {
            let name = line.trim();
            if !name.is_empty() {
                tests.push(name.to_string());
            }
        } else if line.to_lowercase().contains(LIST_MARKER) {
            in_list = true;
        }
    }
    tests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typical_listing() {
        let output = "  Determining projects to restore...\n\
                      \x20 Restored /repo/tests/My.Tests.csproj (in 120 ms).\n\
                      Microsoft (R) Test Execution Command Line Tool Version 17.8.0 (x64)\n\
                      \n\
                      The following Tests are available:\n\
                      \x20   Warehouse.Tests.CacheTests.StoreAndRetrieve\n\
                      \x20   Warehouse.Tests.CacheTests.EvictsUnderPressure\n\
                      \n";

        let tests = parse_list_output(output);
        assert_eq!(
            tests,
            vec![
                "Warehouse.Tests.CacheTests.StoreAndRetrieve",
                "Warehouse.Tests.CacheTests.EvictsUnderPressure",
            ]
        );
    }

    #[test]
    fn test_marker_match_is_case_insensitive() {
        let output = "THE FOLLOWING TESTS ARE AVAILABLE:\n  Suite.One\n";
        assert_eq!(parse_list_output(output), vec!["Suite.One"]);
    }

    #[test]
    fn test_listing_without_marker_yields_nothing() {
        let output = "Build FAILED.\n    0 Warning(s)\n    1 Error(s)\n";
        assert!(parse_list_output(output).is_empty());
    }

    #[tokio::test]
    async fn test_discovery_without_project_is_refused() {
        let err = discover_tests(None, "Debug")
            .await
            .expect_err("must refuse");
        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::DiscoveryMisconfigured)
        ));
    }
}
