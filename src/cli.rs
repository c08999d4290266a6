// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `flowgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flowgraph",
    version,
    about = "Run a flow of dependent shell steps, resuming completed work.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the flow definition (TOML).
    ///
    /// Defaults to `Flowgraph.toml` in the current directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// State file holding run and step records between invocations.
    ///
    /// Defaults to `.flowgraph/state.toml` in the current directory.
    #[arg(long, value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Identifies this run among all runs of the flow.
    ///
    /// Defaults to today's UTC date (`YYYY-MM-DD`).
    #[arg(long, value_name = "KEY")]
    pub run_key: Option<String>,

    /// Discard this run's persisted step records instead of resuming from them.
    #[arg(long)]
    pub fresh: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FLOWGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the steps in dispatch order, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
