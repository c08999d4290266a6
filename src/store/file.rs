// src/store/file.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, info};

use super::{MemoryStore, RunRecord, StepRecord, Store, StoreError, StoreFuture, StoreResult};
use crate::types::RunId;

/// On-disk layout: one `[[run]]` table per run, one `[[step]]` per step record.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default, rename = "run")]
    runs: Vec<RunRecord>,
    #[serde(default, rename = "step")]
    steps: Vec<StepRecord>,
}

/// `.flowgraph/state.toml` in the current working directory.
pub fn default_state_path() -> PathBuf {
    PathBuf::from(".flowgraph").join("state.toml")
}

/// Durable [`Store`] kept in a TOML state file.
///
/// Records are served from memory and the whole file is rewritten after
/// every write, so a later process opening the same path resumes where this
/// one stopped. Not meant for concurrent writers in separate processes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    records: MemoryStore,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Open the state file at `path`, starting empty if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|e| backend(&path, e))?;
            toml::from_str::<StateFile>(&contents).map_err(|e| backend(&path, e))?
        } else {
            StateFile::default()
        };

        info!(
            path = %path.display(),
            runs = state.runs.len(),
            steps = state.steps.len(),
            "opened state file"
        );

        Ok(Self {
            path,
            records: MemoryStore::from_records(state.runs, state.steps),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current records to disk via a temporary file and rename.
    fn persist(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let (runs, steps) = self.records.snapshot()?;
        let contents =
            toml::to_string(&StateFile { runs, steps }).map_err(|e| backend(&self.path, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| backend(&self.path, e))?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, contents).map_err(|e| backend(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| backend(&self.path, e))?;

        debug!(path = %self.path.display(), "state file written");
        Ok(())
    }
}

fn backend(path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{}: {err}", path.display()))
}

impl Store for FileStore {
    fn get_run<'a>(&'a self, flow: &'a str, run_key: &'a str) -> StoreFuture<'a, Option<RunRecord>> {
        self.records.get_run(flow, run_key)
    }

    fn save_run<'a>(&'a self, run: &'a RunRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.records.save_run(run).await?;
            self.persist()
        })
    }

    fn get_all_steps(&self, run_id: RunId) -> StoreFuture<'_, Vec<StepRecord>> {
        self.records.get_all_steps(run_id)
    }

    fn save_step<'a>(&'a self, step: &'a StepRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.records.save_step(step).await?;
            self.persist()
        })
    }

    fn remove_step<'a>(&'a self, run_id: RunId, step: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.records.remove_step(run_id, step).await?;
            self.persist()
        })
    }

    fn changes(&self) -> Option<Arc<Notify>> {
        self.records.changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RunState, StepStatus};

    #[tokio::test]
    async fn records_survive_reopening() -> StoreResult<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let mut run = RunRecord::embryo("nightly", "2024-06-01");
        {
            let store = FileStore::open(&path)?;
            store.save_run(&run).await?;
            run.state = RunState::InProgress;
            store.save_run(&run).await?;
            store.save_step(&StepRecord::complete(run.run_id, "extract")).await?;
            store.save_step(&StepRecord::running(run.run_id, "load")).await?;
            store.remove_step(run.run_id, "load").await?;
        }

        let reopened = FileStore::open(&path)?;
        let loaded = reopened
            .get_run("nightly", "2024-06-01")
            .await?
            .expect("run should be persisted");
        assert_eq!(loaded, run);

        let steps = reopened.get_all_steps(run.run_id).await?;
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "extract");
        assert_eq!(steps[0].status, StepStatus::Complete);
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_opens_empty_and_is_not_created_by_reads() -> StoreResult<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");

        let store = FileStore::open(&path)?;
        assert!(store.get_run("nightly", "k").await?.is_none());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn corrupt_file_is_a_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        fs::write(&path, "[[run]]\nrun_id = 3\n").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Backend(msg)) if msg.contains("state.toml")
        ));
    }
}
