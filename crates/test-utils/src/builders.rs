#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use flowgraph::config::{ConfigFile, FlowSection, RawConfigFile, StepConfig};
use flowgraph::dag::Graph;
use flowgraph::store::Store;

use crate::actions::NoopAction;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(flow: &str) -> Self {
        Self {
            config: RawConfigFile {
                flow: FlowSection::new(flow),
                step: BTreeMap::new(),
            },
        }
    }

    pub fn with_step(mut self, name: &str, step: StepConfig) -> Self {
        self.config.step.insert(name.to_string(), step);
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for `StepConfig`.
pub struct StepConfigBuilder {
    step: StepConfig,
}

impl StepConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            step: StepConfig {
                cmd: cmd.to_string(),
                after: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.step.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> StepConfig {
        self.step
    }
}

/// Builds a `Graph` of `NoopAction` steps in declaration order.
pub struct GraphBuilder {
    flow: String,
    run_key: String,
    steps: Vec<(String, Vec<String>)>,
}

impl GraphBuilder {
    pub fn new(flow: &str) -> Self {
        Self {
            flow: flow.to_string(),
            run_key: "test-run".to_string(),
            steps: Vec::new(),
        }
    }

    pub fn run_key(mut self, run_key: &str) -> Self {
        self.run_key = run_key.to_string();
        self
    }

    pub fn step(mut self, name: &str, deps: &[&str]) -> Self {
        self.steps
            .push((name.to_string(), deps.iter().map(|d| d.to_string()).collect()));
        self
    }

    pub fn build(self, store: Arc<dyn Store>) -> Graph {
        let mut graph = Graph::new(self.flow, self.run_key, store);
        for (name, deps) in &self.steps {
            graph
                .append(name.clone(), deps, NoopAction::arc(name))
                .expect("Failed to append step in GraphBuilder");
        }
        graph
    }
}

/// A -> {B, C} -> D
pub fn diamond(store: Arc<dyn Store>) -> Graph {
    GraphBuilder::new("diamond")
        .step("A", &[])
        .step("B", &["A"])
        .step("C", &["A"])
        .step("D", &["B", "C"])
        .build(store)
}
