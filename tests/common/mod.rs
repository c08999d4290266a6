#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use flowgraph::dag::Graph;
use flowgraph::store::{MemoryStore, RunRecord, StepRecord, Store, StoreError, StoreFuture};
use flowgraph::types::{RunId, StepStatus};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Run id of a graph whose run record has already been loaded.
pub fn run_id(graph: &Graph) -> RunId {
    graph.run().expect("run record should be loaded").run_id
}

/// Write a step record the way an external executor would.
pub async fn set_status(store: &dyn Store, run_id: RunId, step: &str, status: StepStatus) {
    store
        .save_step(&StepRecord::new(run_id, step, status))
        .await
        .expect("saving step record");
}

pub async fn complete(store: &dyn Store, run_id: RunId, step: &str) {
    set_status(store, run_id, step, StepStatus::Complete).await;
}

/// A store without change notifications, so the graph can only observe
/// progress by polling.
#[derive(Debug, Clone, Default)]
pub struct PollingStore {
    inner: MemoryStore,
}

impl PollingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Store for PollingStore {
    fn get_run<'a>(&'a self, flow: &'a str, run_key: &'a str) -> StoreFuture<'a, Option<RunRecord>> {
        self.inner.get_run(flow, run_key)
    }

    fn save_run<'a>(&'a self, run: &'a RunRecord) -> StoreFuture<'a, ()> {
        self.inner.save_run(run)
    }

    fn get_all_steps(&self, run_id: RunId) -> StoreFuture<'_, Vec<StepRecord>> {
        self.inner.get_all_steps(run_id)
    }

    fn save_step<'a>(&'a self, step: &'a StepRecord) -> StoreFuture<'a, ()> {
        self.inner.save_step(step)
    }

    fn remove_step<'a>(&'a self, run_id: RunId, step: &'a str) -> StoreFuture<'a, ()> {
        self.inner.remove_step(run_id, step)
    }
}

/// A store whose step reads start failing after `reads` successful ones.
/// Writes always succeed and land in the shared `MemoryStore`.
#[derive(Debug)]
pub struct FailingReadsStore {
    inner: MemoryStore,
    reads_left: AtomicUsize,
}

impl FailingReadsStore {
    pub fn new(inner: MemoryStore, reads: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            reads_left: AtomicUsize::new(reads),
        })
    }
}

impl Store for FailingReadsStore {
    fn get_run<'a>(&'a self, flow: &'a str, run_key: &'a str) -> StoreFuture<'a, Option<RunRecord>> {
        self.inner.get_run(flow, run_key)
    }

    fn save_run<'a>(&'a self, run: &'a RunRecord) -> StoreFuture<'a, ()> {
        self.inner.save_run(run)
    }

    fn get_all_steps(&self, run_id: RunId) -> StoreFuture<'_, Vec<StepRecord>> {
        let allowed = self
            .reads_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if allowed {
            self.inner.get_all_steps(run_id)
        } else {
            Box::pin(async { Err(StoreError::Backend("connection lost".to_string())) })
        }
    }

    fn save_step<'a>(&'a self, step: &'a StepRecord) -> StoreFuture<'a, ()> {
        self.inner.save_step(step)
    }

    fn remove_step<'a>(&'a self, run_id: RunId, step: &'a str) -> StoreFuture<'a, ()> {
        self.inner.remove_step(run_id, step)
    }

    fn changes(&self) -> Option<Arc<tokio::sync::Notify>> {
        self.inner.changes()
    }
}
