// src/dag/lifecycle.rs

//! Run lifecycle and crash recovery.
//!
//! A run moves `Embryo -> InProgress -> Processed | Invalid`. The run record
//! is loaded (or created in `Embryo`) on first use, so drivers that skip
//! [`Graph::reconcile_with_persistence`] still get a run to scope step
//! records to.
//!
//! Reconciliation treats a step as atomic: a completed record is resumed,
//! anything else is discarded and the step becomes eligible again.

use chrono::Utc;
use tracing::{Instrument, debug, info, warn};

use crate::dag::graph::Graph;
use crate::errors::Result;
use crate::store::RunRecord;
use crate::types::RunState;

impl Graph {
    /// Load the run record for `(name, run_key)`, creating an `Embryo` one if
    /// none exists yet. Cached after the first call.
    pub(super) async fn ensure_run(&mut self) -> Result<RunRecord> {
        if let Some(run) = &self.run {
            return Ok(run.clone());
        }

        let run = match self.store.get_run(&self.name, &self.run_key).await? {
            Some(run) => {
                debug!(
                    flow = %self.name,
                    run_key = %self.run_key,
                    run_id = %run.run_id,
                    state = %run.state,
                    "loaded existing run record"
                );
                run
            }
            None => {
                let run = RunRecord::embryo(&self.name, &self.run_key);
                self.store.save_run(&run).await?;
                info!(
                    flow = %self.name,
                    run_key = %self.run_key,
                    run_id = %run.run_id,
                    "created run record"
                );
                run
            }
        };

        self.run = Some(run.clone());
        Ok(run)
    }

    /// Resume from persisted state.
    ///
    /// Completed step records are adopted and their steps counted as already
    /// yielded. Every other record (running, invalid, cancelled) is removed
    /// from the store so the step will be dispatched again.
    pub async fn reconcile_with_persistence(&mut self) -> Result<()> {
        let run = self.ensure_run().await?;
        let records = self.store.get_all_steps(run.run_id).await?;

        let mut resumed = 0usize;
        let mut discarded = 0usize;

        for record in records {
            let Some(&idx) = self.index.get(&record.name) else {
                warn!(
                    flow = %self.name,
                    run_id = %run.run_id,
                    step = %record.name,
                    "persisted step record has no matching step; ignoring"
                );
                continue;
            };

            if record.is_complete() {
                self.yielded.insert(record.name.clone());
                self.nodes[idx].persisted_status = Some(record);
                resumed += 1;
            } else {
                debug!(
                    flow = %self.name,
                    run_id = %run.run_id,
                    step = %record.name,
                    status = ?record.status,
                    "discarding partial step record"
                );
                self.store.remove_step(run.run_id, &record.name).await?;
                self.yielded.remove(&record.name);
                self.nodes[idx].persisted_status = None;
                discarded += 1;
            }
        }

        info!(
            flow = %self.name,
            run_id = %run.run_id,
            resumed,
            discarded,
            "reconciled with persisted step records"
        );
        Ok(())
    }

    /// Delete every persisted step record of this run and forget all
    /// dispatch bookkeeping, so the next traversal starts from scratch.
    pub async fn purge_step_records(&mut self) -> Result<()> {
        let run = self.ensure_run().await?;
        let records = self.store.get_all_steps(run.run_id).await?;
        let purged = records.len();

        for record in &records {
            self.store.remove_step(run.run_id, &record.name).await?;
        }
        for node in &mut self.nodes {
            node.persisted_status = None;
        }
        self.yielded.clear();

        info!(flow = %self.name, run_id = %run.run_id, purged, "purged step records");
        Ok(())
    }

    /// Mark the run `InProgress` and attach the log sink.
    pub async fn start_run(&mut self) -> Result<()> {
        let mut run = self.ensure_run().await?;
        run.started_at = Some(Utc::now());
        run.state = RunState::InProgress;
        self.store.save_run(&run).await?;

        self.sink.attach(&run);
        self.sink.span().in_scope(|| {
            info!(
                flow = %run.flow,
                run_key = %run.run_key,
                run_id = %run.run_id,
                "run started"
            )
        });
        self.run = Some(run);
        Ok(())
    }

    /// Finalize the run as `Processed` (`success`) or `Invalid` and detach
    /// the log sink.
    pub async fn finish_run(&mut self, success: bool) -> Result<()> {
        let span = self.sink.span();
        self.finish_run_inner(success).instrument(span).await
    }

    async fn finish_run_inner(&mut self, success: bool) -> Result<()> {
        let mut run = self.ensure_run().await?;
        if run.state.is_terminal() {
            warn!(
                flow = %run.flow,
                run_id = %run.run_id,
                state = %run.state,
                "run already finalized; overwriting final state"
            );
        }

        run.finished_at = Some(Utc::now());
        run.state = if success {
            RunState::Processed
        } else {
            RunState::Invalid
        };
        self.store.save_run(&run).await?;

        info!(
            flow = %run.flow,
            run_key = %run.run_key,
            run_id = %run.run_id,
            state = %run.state,
            "run finished"
        );

        self.sink.detach(&run);
        self.run = Some(run);
        Ok(())
    }

    pub async fn mark_success(&mut self) -> Result<()> {
        self.finish_run(true).await
    }

    pub async fn mark_failure(&mut self) -> Result<()> {
        self.finish_run(false).await
    }
}
