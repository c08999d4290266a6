// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;
use tracing::trace;

use super::{RunRecord, StepRecord, Store, StoreError, StoreFuture, StoreResult};
use crate::types::{RunId, StepName};

#[derive(Debug, Default)]
struct Tables {
    /// Keyed by `(flow, run_key)`.
    runs: HashMap<(String, String), RunRecord>,
    /// Keyed by run, then by step name (sorted for stable listing).
    steps: HashMap<RunId, BTreeMap<StepName, StepRecord>>,
}

/// In-process [`Store`] backed by a mutex-guarded map.
///
/// Cloning shares the underlying tables, so a clone can be handed to step
/// executors while the graph keeps another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    changes: Arc<Notify>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Build a store pre-populated with `runs` and `steps`.
    pub(super) fn from_records(runs: Vec<RunRecord>, steps: Vec<StepRecord>) -> Self {
        let mut tables = Tables::default();
        for run in runs {
            tables
                .runs
                .insert((run.flow.clone(), run.run_key.clone()), run);
        }
        for step in steps {
            tables
                .steps
                .entry(step.run_id)
                .or_default()
                .insert(step.name.clone(), step);
        }
        Self {
            tables: Arc::new(Mutex::new(tables)),
            changes: Arc::new(Notify::new()),
        }
    }

    /// Copy of every record, runs ordered by `(flow, run_key)` and steps by
    /// run then name.
    pub(super) fn snapshot(&self) -> StoreResult<(Vec<RunRecord>, Vec<StepRecord>)> {
        let tables = self.lock()?;
        let mut runs: Vec<RunRecord> = tables.runs.values().cloned().collect();
        runs.sort_by(|a, b| (&a.flow, &a.run_key).cmp(&(&b.flow, &b.run_key)));
        let mut steps: Vec<StepRecord> = tables
            .steps
            .values()
            .flat_map(|steps| steps.values().cloned())
            .collect();
        steps.sort_by(|a, b| (a.run_id, &a.name).cmp(&(b.run_id, &b.name)));
        Ok((runs, steps))
    }

    /// Number of step records currently stored for `run_id`.
    pub fn step_count(&self, run_id: RunId) -> StoreResult<usize> {
        let tables = self.lock()?;
        Ok(tables.steps.get(&run_id).map(|s| s.len()).unwrap_or(0))
    }
}

impl Store for MemoryStore {
    fn get_run<'a>(&'a self, flow: &'a str, run_key: &'a str) -> StoreFuture<'a, Option<RunRecord>> {
        Box::pin(async move {
            let tables = self.lock()?;
            Ok(tables
                .runs
                .get(&(flow.to_string(), run_key.to_string()))
                .cloned())
        })
    }

    fn save_run<'a>(&'a self, run: &'a RunRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            trace!(flow = %run.flow, run_key = %run.run_key, state = %run.state, "saving run record");
            tables
                .runs
                .insert((run.flow.clone(), run.run_key.clone()), run.clone());
            Ok(())
        })
    }

    fn get_all_steps(&self, run_id: RunId) -> StoreFuture<'_, Vec<StepRecord>> {
        Box::pin(async move {
            let tables = self.lock()?;
            Ok(tables
                .steps
                .get(&run_id)
                .map(|steps| steps.values().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn save_step<'a>(&'a self, step: &'a StepRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            {
                let mut tables = self.lock()?;
                trace!(run_id = %step.run_id, step = %step.name, status = ?step.status, "saving step record");
                tables
                    .steps
                    .entry(step.run_id)
                    .or_default()
                    .insert(step.name.clone(), step.clone());
            }
            self.changes.notify_waiters();
            Ok(())
        })
    }

    fn remove_step<'a>(&'a self, run_id: RunId, step: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            {
                let mut tables = self.lock()?;
                if let Some(steps) = tables.steps.get_mut(&run_id) {
                    steps.remove(step);
                }
            }
            self.changes.notify_waiters();
            Ok(())
        })
    }

    fn changes(&self) -> Option<Arc<Notify>> {
        Some(Arc::clone(&self.changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RunState, StepStatus};

    #[tokio::test]
    async fn run_records_are_keyed_by_flow_and_run_key() -> StoreResult<()> {
        let store = MemoryStore::new();
        let run = RunRecord::embryo("nightly", "2024-01-01");
        store.save_run(&run).await?;

        let found = store.get_run("nightly", "2024-01-01").await?;
        assert_eq!(found.map(|r| r.run_id), Some(run.run_id));
        assert!(store.get_run("nightly", "2024-01-02").await?.is_none());
        assert!(store.get_run("hourly", "2024-01-01").await?.is_none());

        let mut updated = run.clone();
        updated.state = RunState::InProgress;
        store.save_run(&updated).await?;
        let found = store.get_run("nightly", "2024-01-01").await?;
        assert_eq!(found.map(|r| r.state), Some(RunState::InProgress));
        Ok(())
    }

    #[tokio::test]
    async fn step_records_are_scoped_to_their_run() -> StoreResult<()> {
        let store = MemoryStore::new();
        let a = RunId::new();
        let b = RunId::new();

        store.save_step(&StepRecord::running(a, "extract")).await?;
        store.save_step(&StepRecord::complete(a, "extract")).await?;
        store.save_step(&StepRecord::invalid(b, "extract")).await?;

        let steps = store.get_all_steps(a).await?;
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].status, StepStatus::Complete);

        store.remove_step(a, "extract").await?;
        store.remove_step(a, "never-written").await?;
        assert_eq!(store.step_count(a)?, 0);
        assert_eq!(store.step_count(b)?, 1);
        Ok(())
    }
}
