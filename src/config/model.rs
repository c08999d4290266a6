// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::StepName;

/// Flow definition exactly as read from a TOML file.
///
/// ```toml
/// [flow]
/// name = "nightly"
/// poll_interval = "5s"
///
/// [step.extract]
/// cmd = "./extract.sh"
///
/// [step.load]
/// cmd = "./load.sh"
/// after = ["extract"]
/// ```
///
/// Not validated; convert with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub flow: FlowSection,

    /// All steps from `[step.<name>]`, keyed by step name.
    #[serde(default)]
    pub step: BTreeMap<StepName, StepConfig>,
}

/// `[flow]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowSection {
    pub name: String,

    /// Duration string (`"500ms"`, `"5s"`, `"1m"`) between readiness scans.
    #[serde(default)]
    pub poll_interval: Option<String>,
}

/// `[step.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    /// Shell command executed for this step.
    pub cmd: String,

    /// Steps that must complete before this one may start.
    #[serde(default)]
    pub after: Vec<StepName>,
}

/// A validated flow definition.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on: at least one step, no reserved names, no unknown or
/// self dependencies, no cycles, a parseable poll interval.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub flow: FlowSection,
    pub step: BTreeMap<StepName, StepConfig>,
    poll_interval: Duration,
    order: Vec<StepName>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        flow: FlowSection,
        step: BTreeMap<StepName, StepConfig>,
        poll_interval: Duration,
        order: Vec<StepName>,
    ) -> Self {
        Self {
            flow,
            step,
            poll_interval,
            order,
        }
    }

    pub fn name(&self) -> &str {
        &self.flow.name
    }

    /// Effective poll interval, defaulting to five seconds.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Step names in a dependency-respecting order: every step comes after
    /// all of its `after` entries.
    pub fn step_order(&self) -> &[StepName] {
        &self.order
    }
}

impl FlowSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            poll_interval: None,
        }
    }
}
