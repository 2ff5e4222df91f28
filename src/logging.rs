use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::models::LoggingConfig;

/// Environment variable holding a filter directive that overrides the
/// configured level, e.g. `PCD_LOG=pcd_tools::services=trace`.
pub const LOG_ENV: &str = "PCD_LOG";

/// Prefix of rotated log files.
pub const LOG_FILE_PREFIX: &str = "pcd-tools";

/// Filter directive for a run: `PCD_LOG` if set, else `debug` when verbose,
/// else the configured level.
pub fn filter_directive(config: &LoggingConfig, verbose: bool, env_value: Option<&str>) -> String {
    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directive) => directive.to_string(),
        None if verbose => "debug".to_string(),
        None => config.level.clone(),
    }
}

/// Set up logging for the CLI.
///
/// Console logs go to stderr so reports on stdout stay clean. When
/// `file_dir` is configured, a daily rotating file is written as well.
///
/// # Returns
/// A guard that must be held for the duration of the program when file
/// logging is enabled
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let directive = filter_directive(config, verbose, std::env::var(LOG_ENV).ok().as_deref());
    let env_filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log filter: {}", directive))?;

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let (file_layer, guard) = match config.file_dir.as_deref() {
        Some(dir) => {
            let dir = Utf8Path::new(dir);
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory: {}", dir))?;
            }
            let (non_blocking, guard) =
                tracing_appender::non_blocking(rolling::daily(dir, LOG_FILE_PREFIX));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No ANSI codes in log files
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::debug!(
        "Logging initialized: filter={}, json={}, file_dir={:?}",
        directive,
        config.json,
        config.file_dir
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_precedence() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(filter_directive(&config, false, None), "warn");
        assert_eq!(filter_directive(&config, true, None), "debug");
        assert_eq!(filter_directive(&config, true, Some("pcd_tools=trace")), "pcd_tools=trace");
        assert_eq!(filter_directive(&config, false, Some("  ")), "warn");
    }

    #[test]
    fn test_directives_parse() {
        for directive in ["info", "debug", "pcd_tools::services=trace,warn"] {
            assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
        }
    }
}
