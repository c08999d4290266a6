// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, info, trace, warn};

use crate::action::StepAction;
use crate::config::ConfigFile;
use crate::dag::next_step::NextStep;
use crate::dag::node::Node;
use crate::errors::{GraphError, GraphResult, Result};
use crate::exec::CommandAction;
use crate::sink::{LogSink, TracingLogSink};
use crate::store::{RunRecord, Store};
use crate::types::{DEFAULT_POLL_INTERVAL, RunId, StepName, is_reserved_name};

/// Insertion-ordered DAG of steps for one run of a flow.
///
/// The graph is built with [`append`](Graph::append), which only accepts
/// dependencies that already exist, so insertion order is always a
/// topological order and cycles cannot be expressed.
///
/// Traversal is pull-based: the driver calls [`next`](Graph::next) until it
/// returns a terminal [`NextStep`]. Step completion is never pushed into the
/// graph; it is observed by re-reading step records from the [`Store`].
pub struct Graph {
    pub(super) name: String,
    pub(super) run_key: String,
    pub(super) nodes: Vec<Node>,
    pub(super) index: HashMap<StepName, usize>,
    /// Names already returned by `next` (or resumed as complete).
    pub(super) yielded: HashSet<StepName>,
    pub(super) run: Option<RunRecord>,
    pub(super) store: Arc<dyn Store>,
    pub(super) sink: Box<dyn LogSink>,
    pub(super) poll_interval: Duration,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("run_key", &self.run_key)
            .field("nodes", &self.nodes)
            .field("yielded", &self.yielded)
            .field("run", &self.run)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Create an empty graph for the run `(name, run_key)` backed by `store`.
    pub fn new(name: impl Into<String>, run_key: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self {
            name: name.into(),
            run_key: run_key.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            yielded: HashSet::new(),
            run: None,
            store,
            sink: Box::new(TracingLogSink::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Build a graph from a validated flow definition, one
    /// [`CommandAction`] per step, appended in dependency order.
    pub fn from_config(
        cfg: &ConfigFile,
        run_key: impl Into<String>,
        store: Arc<dyn Store>,
    ) -> GraphResult<Self> {
        let mut graph = Self::new(cfg.name(), run_key, store).with_poll_interval(cfg.poll_interval());

        for name in cfg.step_order() {
            let step = cfg
                .step
                .get(name)
                .ok_or_else(|| GraphError::UnknownStep(name.clone()))?;
            let action = Arc::new(CommandAction::new(name.clone(), step.cmd.clone()));
            graph.append(name.clone(), &step.after, action)?;
        }

        Ok(graph)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_log_sink(mut self, sink: Box<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_key(&self) -> &str {
        &self.run_key
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    /// The run record, once loaded or created.
    pub fn run(&self) -> Option<&RunRecord> {
        self.run.as_ref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Step names in insertion order.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name())
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&idx| &self.nodes[idx])
    }

    pub fn action(&self, name: &str) -> Option<Arc<dyn StepAction>> {
        self.node(name).map(|n| Arc::clone(n.action()))
    }

    pub fn yielded(&self) -> &HashSet<StepName> {
        &self.yielded
    }

    /// Direct dependencies of `name`, in declaration order.
    pub fn predecessors_of(&self, name: &str) -> GraphResult<Vec<&str>> {
        let idx = self.position(name)?;
        Ok(self.nodes[idx]
            .predecessors
            .iter()
            .map(|&p| self.nodes[p].name())
            .collect())
    }

    /// Append a step that depends on `dependencies`.
    ///
    /// Every dependency must already be in the graph. On error the graph is
    /// left unchanged.
    pub fn append<I, S>(
        &mut self,
        name: impl Into<StepName>,
        dependencies: I,
        action: Arc<dyn StepAction>,
    ) -> GraphResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();

        if is_reserved_name(&name) {
            return Err(GraphError::ReservedName(name));
        }
        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateStep(name));
        }

        let mut predecessors = Vec::new();
        let mut missing = Vec::new();
        for dep in dependencies {
            let dep = dep.as_ref();
            match self.index.get(dep) {
                Some(&idx) => {
                    if !predecessors.contains(&idx) {
                        predecessors.push(idx);
                    }
                }
                None => missing.push(dep.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(GraphError::MissingDependencies {
                step: name,
                missing,
            });
        }

        let idx = self.nodes.len();
        for &pred in &predecessors {
            self.nodes[pred].successors.push(idx);
        }

        debug!(
            flow = %self.name,
            step = %name,
            action = %action.name(),
            deps = predecessors.len(),
            "appended step"
        );

        self.index.insert(name.clone(), idx);
        self.nodes.push(Node::new(name, predecessors, action));
        Ok(self)
    }

    /// True iff every predecessor of `name` is persisted as complete.
    pub fn is_unblocked(&self, name: &str) -> GraphResult<bool> {
        let idx = self.position(name)?;
        Ok(self.unblocked_at(idx))
    }

    pub fn is_failed(&self, name: &str) -> GraphResult<bool> {
        let idx = self.position(name)?;
        Ok(self.nodes[idx].is_failed())
    }

    /// Every step that transitively depends on `name`, depth-first.
    ///
    /// Each name appears once, at its first visit. The graph never acts on
    /// this list itself; drivers use it to skip work downstream of a failure.
    pub fn all_dependants(&self, name: &str) -> GraphResult<Vec<StepName>> {
        let idx = self.position(name)?;
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_dependants(idx, &mut seen, &mut out);
        Ok(out)
    }

    /// Names of all steps currently persisted as failed, in insertion order.
    pub fn failed_steps(&self) -> Vec<StepName> {
        self.nodes
            .iter()
            .filter(|n| n.is_failed())
            .map(|n| n.name.clone())
            .collect()
    }

    /// Re-read every step record of the run and update node status.
    pub async fn refresh(&mut self) -> Result<()> {
        let run_id = self.ensure_run().await?.run_id;
        self.refresh_from_store(run_id).await
    }

    /// Return the next step to execute, waiting while everything left is
    /// blocked on in-flight predecessors.
    ///
    /// Each scan, in order:
    /// 1. if any node is failed, return [`NextStep::Failed`];
    /// 2. if every node has been yielded, return [`NextStep::Done`];
    /// 3. return the first node in insertion order that is unblocked, not
    ///    failed and not yet yielded, as [`NextStep::Dispatch`].
    ///
    /// Otherwise it sleeps for the poll interval (or until the store signals a
    /// change) and scans again. There is no deadline; callers wanting one
    /// should wrap this in `tokio::time::timeout`.
    pub async fn next(&mut self) -> Result<NextStep> {
        let span = self.sink.span();
        self.next_inner().instrument(span).await
    }

    async fn next_inner(&mut self) -> Result<NextStep> {
        let run_id = self.ensure_run().await?.run_id;
        let changes = self.store.changes();

        loop {
            // Arm the change notification before reading, so a write that
            // lands between the read and the wait still wakes us.
            let mut notified: Option<Pin<Box<_>>> = changes.as_deref().map(|n| Box::pin(n.notified()));
            if let Some(n) = notified.as_mut() {
                n.as_mut().enable();
            }

            self.refresh_from_store(run_id).await?;

            if let Some(step) = self.scan() {
                return Ok(step);
            }

            trace!(
                flow = %self.name,
                yielded = self.yielded.len(),
                total = self.nodes.len(),
                poll_interval = ?self.poll_interval,
                "no step dispatchable; waiting"
            );

            match notified {
                Some(n) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = n => {}
                    }
                }
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }

    /// One pass of the readiness algorithm, without waiting.
    fn scan(&mut self) -> Option<NextStep> {
        if let Some(failed) = self.nodes.iter().find(|n| n.is_failed()) {
            warn!(flow = %self.name, step = %failed.name, "step failed; halting dispatch");
            return Some(NextStep::Failed(failed.name.clone()));
        }

        if self.yielded.len() == self.nodes.len() {
            info!(flow = %self.name, steps = self.nodes.len(), "all steps dispatched");
            return Some(NextStep::Done);
        }

        let ready = (0..self.nodes.len()).find(|&idx| {
            let node = &self.nodes[idx];
            !self.yielded.contains(&node.name) && !node.is_failed() && self.unblocked_at(idx)
        })?;

        let name = self.nodes[ready].name.clone();
        self.yielded.insert(name.clone());
        debug!(flow = %self.name, step = %name, "dispatching step");
        Some(NextStep::Dispatch(name))
    }

    pub(super) async fn refresh_from_store(&mut self, run_id: RunId) -> Result<()> {
        let records = self.store.get_all_steps(run_id).await?;
        let mut by_name: HashMap<StepName, _> = records
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();

        for node in &mut self.nodes {
            node.persisted_status = by_name.remove(&node.name);
        }
        Ok(())
    }

    fn unblocked_at(&self, idx: usize) -> bool {
        self.nodes[idx]
            .predecessors
            .iter()
            .all(|&pred| self.nodes[pred].is_complete())
    }

    fn collect_dependants(&self, idx: usize, seen: &mut HashSet<usize>, out: &mut Vec<StepName>) {
        for &succ in &self.nodes[idx].successors {
            if seen.insert(succ) {
                out.push(self.nodes[succ].name.clone());
                self.collect_dependants(succ, seen, out);
            }
        }
    }

    pub(super) fn position(&self, name: &str) -> GraphResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownStep(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionFuture;
    use crate::store::MemoryStore;

    #[derive(Debug)]
    struct Stub(&'static str);

    impl StepAction for Stub {
        fn name(&self) -> &str {
            self.0
        }

        fn execute(&self) -> ActionFuture {
            Box::pin(async { Ok(()) })
        }
    }

    fn stub(name: &'static str) -> Arc<dyn StepAction> {
        Arc::new(Stub(name))
    }

    const NO_DEPS: [&str; 0] = [];

    fn diamond() -> Graph {
        let mut graph = Graph::new("flow", "key", Arc::new(MemoryStore::new()));
        graph
            .append("A", NO_DEPS, stub("A"))
            .and_then(|g| g.append("B", ["A"], stub("B")))
            .and_then(|g| g.append("C", ["A"], stub("C")))
            .and_then(|g| g.append("D", ["B", "C"], stub("D")))
            .expect("diamond graph should build");
        graph
    }

    #[test]
    fn append_wires_both_directions() {
        let graph = diamond();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.step_names().collect::<Vec<_>>(), ["A", "B", "C", "D"]);
        assert_eq!(graph.predecessors_of("D").unwrap(), ["B", "C"]);
        assert!(graph.predecessors_of("A").unwrap().is_empty());
    }

    #[test]
    fn append_rejects_missing_dependencies_and_lists_them() {
        let mut graph = diamond();
        let err = graph
            .append("E", ["A", "X", "Y"], stub("E"))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingDependencies {
                step: "E".into(),
                missing: vec!["X".into(), "Y".into()],
            }
        );
        assert!(graph.node("E").is_none());
        assert!(graph.all_dependants("A").unwrap().iter().all(|n| n != "E"));
    }

    #[test]
    fn append_rejects_duplicates_and_sentinels() {
        let mut graph = diamond();
        assert_eq!(
            graph.append("B", NO_DEPS, stub("B")).unwrap_err(),
            GraphError::DuplicateStep("B".into())
        );
        assert_eq!(
            graph.append("START", NO_DEPS, stub("START")).unwrap_err(),
            GraphError::ReservedName("START".into())
        );
        assert_eq!(
            graph.append("FINISH", ["D"], stub("FINISH")).unwrap_err(),
            GraphError::ReservedName("FINISH".into())
        );
    }

    #[test]
    fn self_dependency_is_a_missing_dependency() {
        let mut graph = Graph::new("flow", "key", Arc::new(MemoryStore::new()));
        let err = graph.append("A", ["A"], stub("A")).unwrap_err();
        assert!(matches!(err, GraphError::MissingDependencies { .. }));
    }

    #[test]
    fn roots_are_unblocked_before_any_dispatch() {
        let graph = diamond();
        assert!(graph.is_unblocked("A").unwrap());
        assert!(!graph.is_unblocked("B").unwrap());
        assert!(!graph.is_unblocked("D").unwrap());
        assert!(!graph.is_failed("A").unwrap());
    }

    #[test]
    fn predicates_reject_unknown_steps() {
        let graph = diamond();
        assert_eq!(
            graph.is_unblocked("nope").unwrap_err(),
            GraphError::UnknownStep("nope".into())
        );
        assert!(graph.is_failed("nope").is_err());
        assert!(graph.all_dependants("nope").is_err());
    }

    #[test]
    fn all_dependants_is_depth_first_without_repeats() {
        let graph = diamond();
        assert_eq!(graph.all_dependants("A").unwrap(), ["B", "D", "C"]);
        assert_eq!(graph.all_dependants("C").unwrap(), ["D"]);
        assert!(graph.all_dependants("D").unwrap().is_empty());
    }

    #[test]
    fn duplicate_dependency_names_collapse_to_one_edge() {
        let mut graph = Graph::new("flow", "key", Arc::new(MemoryStore::new()));
        graph.append("A", NO_DEPS, stub("A")).unwrap();
        graph.append("B", ["A", "A"], stub("B")).unwrap();
        assert_eq!(graph.predecessors_of("B").unwrap(), ["A"]);
        assert_eq!(graph.all_dependants("A").unwrap(), ["B"]);
    }
}
