//! Logging setup
//!
//! Structured diagnostics go to stderr so stdout stays clean for the
//! report table.

use tracing_subscriber::EnvFilter;

/// Verbosity of the harness's own diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Debug,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Info => "dotnet_stress=info",
            LogLevel::Debug => "dotnet_stress=debug",
        }
    }
}

/// Initialize tracing at the given level. A `RUST_LOG` value in the
/// environment overrides the chosen level entirely.
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directives() {
        assert_eq!(LogLevel::Info.directive(), "dotnet_stress=info");
        assert_eq!(LogLevel::Debug.directive(), "dotnet_stress=debug");
    }
}
