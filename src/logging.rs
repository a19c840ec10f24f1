//! Logging for the `aggregen` binary
//!
//! Configured from the environment:
//!
//! | Variable       | Values                       | Default  |
//! |----------------|------------------------------|----------|
//! | `RUST_LOG`     | any `EnvFilter` directive    | `info`   |
//! | `LOG_FORMAT`   | `pretty`, `json`             | `pretty` |
//! | `LOG_OUTPUT`   | `stderr`, `stdout`, `file`   | `stderr` |
//! | `LOG_DIR`      | directory for `file` output  | `logs`   |
//! | `LOG_ROTATION` | `daily`, `never`             | `daily`  |
//!
//! stdout is left to `--list` and `--check` output unless asked for. Build
//! scripts never install a subscriber; cargo owns their output.

use anyhow::{Context, Result};
use std::env;
use std::io;
use std::path::PathBuf;
use strum::EnumString;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "aggregen";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum LogOutput {
    #[default]
    Stderr,
    Stdout,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum LogRotation {
    #[default]
    Daily,
    Never,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    /// Only read for [`LogOutput::File`]
    pub log_dir: PathBuf,
    pub rotation: LogRotation,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            output: LogOutput::default(),
            log_dir: PathBuf::from("logs"),
            rotation: LogRotation::default(),
            default_filter: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unrecognised values fall back to the default
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            format: parse_or(lookup("LOG_FORMAT"), defaults.format),
            output: parse_or(lookup("LOG_OUTPUT"), defaults.output),
            log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            rotation: parse_or(lookup("LOG_ROTATION"), defaults.rotation),
            default_filter: defaults.default_filter,
        }
    }

    fn writer(&self) -> Result<(NonBlocking, WorkerGuard)> {
        Ok(match self.output {
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::File => {
                std::fs::create_dir_all(&self.log_dir).with_context(|| {
                    format!("failed to create log directory {:?}", self.log_dir)
                })?;
                let appender = match self.rotation {
                    LogRotation::Daily => {
                        tracing_appender::rolling::daily(&self.log_dir, LOG_FILE_PREFIX)
                    }
                    LogRotation::Never => {
                        tracing_appender::rolling::never(&self.log_dir, LOG_FILE_PREFIX)
                    }
                };
                tracing_appender::non_blocking(appender)
            }
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Install the global subscriber
///
/// Keep the returned guard alive until exit; dropping it flushes buffered lines.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let (writer, guard) = config.writer()?;

    let layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_target(false)
            .with_ansi(config.output != LogOutput::File)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::debug!(format = ?config.format, output = ?config.output, "logging initialized");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = LoggingConfig::from_lookup(lookup(&[]));
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.rotation, LogRotation::Daily);
    }

    #[test]
    fn test_environment_overrides() {
        let config = LoggingConfig::from_lookup(lookup(&[
            ("LOG_FORMAT", "JSON"),
            ("LOG_OUTPUT", "file"),
            ("LOG_DIR", "/tmp/aggregen-logs"),
            ("LOG_ROTATION", "never"),
        ]));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/aggregen-logs"));
        assert_eq!(config.rotation, LogRotation::Never);
    }

    #[test]
    fn test_unknown_values_keep_defaults() {
        let config = LoggingConfig::from_lookup(lookup(&[("LOG_FORMAT", "xml")]));
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
