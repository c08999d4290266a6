// src/logging.rs

//! Logging setup for `flowgraph` using `tracing` + `tracing-subscriber`.
//!
//! Filter precedence:
//! 1. `--log-level` CLI flag, applied to every target
//! 2. `FLOWGRAPH_LOG`, any `EnvFilter` directive string
//!    (e.g. `"debug"` or `"info,flowgraph::dag=trace"`)
//! 3. `info`
//!
//! Logs go to STDERR so stdout only carries dry-run output.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable read when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "FLOWGRAPH_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// Resolve the filter from the CLI level and the raw `FLOWGRAPH_LOG` value.
fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let directives = match (cli_level, env.map(str::trim)) {
        (Some(level), _) => level_directive(level),
        (None, Some(env)) if !env.is_empty() => env,
        _ => DEFAULT_DIRECTIVE,
    };

    EnvFilter::try_new(directives)
        .with_context(|| format!("invalid {LOG_ENV_VAR} filter: {directives:?}"))
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
