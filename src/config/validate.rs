// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{FlowgraphError, Result};
use crate::types::{DEFAULT_POLL_INTERVAL, StepName, is_reserved_name, parse_duration};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FlowgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        let poll_interval = effective_poll_interval(&raw)?;
        let order = step_order(&raw);
        Ok(ConfigFile::new_unchecked(raw.flow, raw.step, poll_interval, order))
    }
}

/// Run every semantic check on a raw flow definition.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_flow_section(cfg)?;
    ensure_has_steps(cfg)?;
    validate_step_names(cfg)?;
    validate_step_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn validate_flow_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.flow.name.trim().is_empty() {
        return Err(FlowgraphError::ConfigError(
            "[flow].name must not be empty".to_string(),
        ));
    }
    effective_poll_interval(cfg)?;
    Ok(())
}

fn effective_poll_interval(cfg: &RawConfigFile) -> Result<Duration> {
    let Some(raw) = cfg.flow.poll_interval.as_deref() else {
        return Ok(DEFAULT_POLL_INTERVAL);
    };

    let interval = parse_duration(raw)
        .map_err(|e| FlowgraphError::ConfigError(format!("[flow].poll_interval: {e}")))?;
    if interval.is_zero() {
        return Err(FlowgraphError::ConfigError(
            "[flow].poll_interval must be greater than zero".to_string(),
        ));
    }
    Ok(interval)
}

fn ensure_has_steps(cfg: &RawConfigFile) -> Result<()> {
    if cfg.step.is_empty() {
        return Err(FlowgraphError::ConfigError(
            "config must contain at least one [step.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_step_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.step.keys() {
        if is_reserved_name(name) {
            return Err(FlowgraphError::ConfigError(format!(
                "step name '{}' is reserved",
                name
            )));
        }
    }
    Ok(())
}

fn validate_step_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, step) in cfg.step.iter() {
        for dep in step.after.iter() {
            if dep == name {
                return Err(FlowgraphError::ConfigError(format!(
                    "step '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.step.contains_key(dep) {
                return Err(FlowgraphError::ConfigError(format!(
                    "step '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> step. For
    //   [step.B]
    //   after = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.step.keys() {
        graph.add_node(name.as_str());
    }

    for (name, step) in cfg.step.iter() {
        for dep in step.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(FlowgraphError::DagCycle(format!(
            "cycle detected in step DAG involving step '{}'",
            cycle.node_id()
        ))),
    }
}

/// Lexicographically smallest topological order of an acyclic definition.
fn step_order(cfg: &RawConfigFile) -> Vec<StepName> {
    let mut remaining: BTreeMap<&str, usize> = cfg
        .step
        .iter()
        .map(|(name, step)| {
            let unique: BTreeSet<&str> = step.after.iter().map(String::as_str).collect();
            (name.as_str(), unique.len())
        })
        .collect();

    let mut ready: BTreeSet<&str> = remaining
        .iter()
        .filter(|(_, deps)| **deps == 0)
        .map(|(name, _)| *name)
        .collect();

    let mut order = Vec::with_capacity(cfg.step.len());
    while let Some(name) = ready.pop_first() {
        order.push(name.to_string());
        for (other, step) in cfg.step.iter() {
            if step.after.iter().any(|dep| dep == name) {
                if let Some(count) = remaining.get_mut(other.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(other.as_str());
                    }
                }
            }
        }
    }
    order
}
