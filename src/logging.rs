// src/logging.rs

//! Logging setup for `taskflow` using `tracing` + `tracing-subscriber`.
//!
//! The filter is built from, in order:
//! 1. `--log-level`: that level for `taskflow`, dependencies at `warn`
//! 2. `TASKFLOW_LOG`: a bare level (same scoping as the flag) or full
//!    `EnvFilter` directives such as `taskflow::engine=debug,taskflow=info`
//! 3. `info` for `taskflow`
//!
//! Logs go to STDERR with worker thread names; stdout carries the run
//! summary.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "TASKFLOW_LOG";

const DEPENDENCY_LEVEL: &str = "warn";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env_value.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;

    Ok(())
}

/// Filter for the given CLI level and `TASKFLOW_LOG` value.
pub fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(crate_filter(level_name(level)));
    }

    match env_value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(crate_filter("info")),
        Some(raw) => match parse_level_str(raw) {
            Some(level) => Ok(crate_filter(level)),
            None => EnvFilter::try_new(raw)
                .with_context(|| format!("invalid {LOG_ENV_VAR} directives: {raw}")),
        },
    }
}

fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{DEPENDENCY_LEVEL},taskflow={level}"))
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Normalised level name for a bare level string, `None` otherwise.
pub fn parse_level_str(s: &str) -> Option<&'static str> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}
