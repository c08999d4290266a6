// src/store/mod.rs

//! Persistence port consumed by the scheduler.
//!
//! The graph never owns step state: it reads run and step records through a
//! [`Store`] and re-reads them on every traversal scan. Anything that executes
//! steps (possibly in another process) reports progress by writing step
//! records to the same store.
//!
//! - [`memory`] provides [`MemoryStore`], an in-process implementation used by
//!   tests and embedders.
//! - [`file`] provides [`FileStore`], which keeps records in a TOML state file
//!   so the CLI can resume a run across processes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;

use crate::types::{RunId, RunState, StepName, StepStatus};

pub mod file;
pub mod memory;

pub use file::{FileStore, default_state_path};
pub use memory::MemoryStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Boxed future returned by [`Store`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// One execution instance of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub flow: String,
    /// Identifies the run among all runs of the same flow (e.g. a date).
    pub run_key: String,
    pub state: RunState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    /// A fresh record in the `Embryo` state.
    pub fn embryo(flow: impl Into<String>, run_key: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            flow: flow.into(),
            run_key: run_key.into(),
            state: RunState::Embryo,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Persisted state of one step within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub run_id: RunId,
    pub name: StepName,
    pub status: StepStatus,
    pub updated_at: DateTime<Utc>,
}

impl StepRecord {
    pub fn new(run_id: RunId, name: impl Into<StepName>, status: StepStatus) -> Self {
        Self {
            run_id,
            name: name.into(),
            status,
            updated_at: Utc::now(),
        }
    }

    pub fn running(run_id: RunId, name: impl Into<StepName>) -> Self {
        Self::new(run_id, name, StepStatus::Running)
    }

    pub fn complete(run_id: RunId, name: impl Into<StepName>) -> Self {
        Self::new(run_id, name, StepStatus::Complete)
    }

    pub fn invalid(run_id: RunId, name: impl Into<StepName>) -> Self {
        Self::new(run_id, name, StepStatus::Invalid)
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    pub fn is_failed(&self) -> bool {
        self.status.is_failed()
    }
}

/// Storage backend for run and step records.
///
/// Implementations must be safe to share between the scheduler and the
/// tasks executing steps; the graph takes no locks of its own and relies on
/// the store for read-after-write consistency.
pub trait Store: Send + Sync {
    /// Look up the run identified by `(flow, run_key)`.
    fn get_run<'a>(&'a self, flow: &'a str, run_key: &'a str) -> StoreFuture<'a, Option<RunRecord>>;

    /// Insert or replace a run record.
    fn save_run<'a>(&'a self, run: &'a RunRecord) -> StoreFuture<'a, ()>;

    /// All step records belonging to `run_id`.
    fn get_all_steps(&self, run_id: RunId) -> StoreFuture<'_, Vec<StepRecord>>;

    /// Insert or replace the record for `(step.run_id, step.name)`.
    fn save_step<'a>(&'a self, step: &'a StepRecord) -> StoreFuture<'a, ()>;

    /// Delete the record for `(run_id, step)`. Missing records are not an error.
    fn remove_step<'a>(&'a self, run_id: RunId, step: &'a str) -> StoreFuture<'a, ()>;

    /// Optional change notification, fired after every step write or removal.
    ///
    /// When present, `Graph::next` re-scans as soon as it fires instead of
    /// waiting out the full poll interval.
    fn changes(&self) -> Option<Arc<Notify>> {
        None
    }
}
