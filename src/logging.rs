// src/logging.rs

//! Logging setup for `arbor` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `ARBOR_LOG` environment variable (a level or a full filter directive,
//!    e.g. `"debug"` or `"arbor::handlers=trace,info"`)
//! 3. default to `info`
//!
//! Logs go to STDERR; STDOUT carries the run report.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "ARBOR_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(directive_from_log_level(lvl)),
        None => std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|s| filter_from_str(&s))
            .unwrap_or_else(|| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

fn directive_from_log_level(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn filter_from_str(s: &str) -> Option<EnvFilter> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let directive = match s.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        _ => s.to_string(),
    };
    EnvFilter::try_new(directive).ok()
}
