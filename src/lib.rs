// src/lib.rs

pub mod action;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod sink;
pub mod store;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate};
use crate::config::model::ConfigFile;
use crate::dag::Graph;
use crate::engine::{RunOptions, RunOutcome, run_flow};
use crate::store::{FileStore, default_state_path};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - graph construction with one `CommandAction` per step
/// - a file-backed store, so an interrupted run resumes on the next call
/// - the reference driver
///
/// Returns `None` for `--dry-run`.
pub async fn run(args: CliArgs) -> Result<Option<RunOutcome>> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(None);
    }

    let run_key = args.run_key.unwrap_or_else(default_run_key);
    let state_path = args.state.clone().unwrap_or_else(default_state_path);
    let store = Arc::new(FileStore::open(&state_path)?);
    let mut graph = Graph::from_config(&cfg, run_key, store)?;

    info!(
        flow = %graph.name(),
        run_key = %graph.run_key(),
        steps = graph.len(),
        fresh = args.fresh,
        state = %state_path.display(),
        "starting flow run"
    );

    let outcome = run_flow(&mut graph, RunOptions { fresh: args.fresh }).await?;
    Ok(Some(outcome))
}

/// Today's UTC date, e.g. `2024-06-01`.
fn default_run_key() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Simple dry-run output: print steps in dispatch priority order.
fn print_dry_run(cfg: &ConfigFile) {
    println!("flowgraph dry-run");
    println!("  flow.name = {}", cfg.name());
    println!("  flow.poll_interval = {:?}", cfg.poll_interval());
    println!();

    println!("steps ({}):", cfg.step.len());
    for name in cfg.step_order() {
        let Some(step) = cfg.step.get(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      cmd: {}", step.cmd);
        if !step.after.is_empty() {
            println!("      after: {:?}", step.after);
        }
    }

    debug!("dry-run complete (no execution)");
}
