// src/engine/driver.rs

use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::action::StepAction;
use crate::dag::{Graph, NextStep};
use crate::errors::{FlowgraphError, GraphError, Result};
use crate::store::{StepRecord, Store};
use crate::types::{RunId, RunState, StepName};

use super::{RunOptions, RunOutcome};

/// Drive `graph` to completion, executing each dispatched step's action on
/// its own Tokio task.
///
/// A step is recorded as `Running` before its action starts and as
/// `Complete` or `Invalid` when it returns. When the graph reports a failure
/// no further step is started, but actions already in flight are allowed to
/// finish before the run is finalized. If traversal itself errors (for
/// example the store becomes unreadable) the run is still finalized as
/// `Invalid`, best effort, before the error is returned.
pub async fn run_flow(graph: &mut Graph, options: RunOptions) -> Result<RunOutcome> {
    if options.fresh {
        graph.purge_step_records().await?;
    } else {
        graph.reconcile_with_persistence().await?;
    }

    graph.start_run().await?;
    let run_id = graph
        .run()
        .map(|run| run.run_id)
        .ok_or_else(|| anyhow!("run record missing after start"))?;

    let mut in_flight = JoinSet::new();
    let mut dispatched = Vec::new();

    let traversal = dispatch_steps(graph, run_id, &mut in_flight, &mut dispatched).await;

    // Always let started actions finish; dropping the set would abort them.
    while let Some(joined) = in_flight.join_next().await {
        if let Err(err) = joined {
            error!(flow = %graph.name(), error = %err, "step task did not run to completion");
        }
    }

    if let Err(err) = traversal {
        return Err(abort_run(graph, err).await);
    }
    if let Err(err) = graph.refresh().await {
        return Err(abort_run(graph, err).await);
    }

    let failed = graph.failed_steps();
    let skipped = skipped_dependants(graph, &failed)?;

    if failed.is_empty() {
        graph.mark_success().await?;
    } else {
        if !skipped.is_empty() {
            warn!(flow = %graph.name(), ?skipped, "skipping steps downstream of failures");
        }
        graph.mark_failure().await?;
    }

    let state = graph.run().map(|run| run.state).unwrap_or(RunState::Invalid);
    info!(
        flow = %graph.name(),
        run_id = %run_id,
        state = %state,
        dispatched = dispatched.len(),
        failed = failed.len(),
        "flow run complete"
    );

    Ok(RunOutcome {
        state,
        dispatched,
        failed,
        skipped,
    })
}

/// Pull steps from `graph` and spawn them until traversal terminates.
async fn dispatch_steps(
    graph: &mut Graph,
    run_id: RunId,
    in_flight: &mut JoinSet<()>,
    dispatched: &mut Vec<StepName>,
) -> Result<()> {
    let store = graph.store();
    loop {
        match graph.next().await? {
            NextStep::Dispatch(step) => {
                let action = graph
                    .action(&step)
                    .ok_or_else(|| GraphError::UnknownStep(step.clone()))?;
                store.save_step(&StepRecord::running(run_id, &step)).await?;
                in_flight.spawn(execute_step(Arc::clone(&store), run_id, step.clone(), action));
                dispatched.push(step);
            }
            NextStep::Done => {
                debug!(flow = %graph.name(), "traversal finished; waiting for in-flight steps");
                return Ok(());
            }
            NextStep::Failed(step) => {
                warn!(
                    flow = %graph.name(),
                    step = %step,
                    in_flight = in_flight.len(),
                    "traversal halted by failed step"
                );
                return Ok(());
            }
        }
    }
}

/// Finalize the run as invalid after `err`, then hand `err` back.
async fn abort_run(graph: &mut Graph, err: FlowgraphError) -> FlowgraphError {
    error!(flow = %graph.name(), error = %err, "flow run aborted");
    if let Err(finish_err) = graph.mark_failure().await {
        error!(
            flow = %graph.name(),
            error = %finish_err,
            "could not finalize aborted run"
        );
    }
    err
}

async fn execute_step(store: Arc<dyn Store>, run_id: RunId, step: StepName, action: Arc<dyn StepAction>) {
    let record = match action.execute().await {
        Ok(()) => {
            info!(step = %step, run_id = %run_id, "step completed");
            StepRecord::complete(run_id, &step)
        }
        Err(err) => {
            error!(step = %step, run_id = %run_id, error = %err, "step failed");
            StepRecord::invalid(run_id, &step)
        }
    };

    if let Err(err) = store.save_step(&record).await {
        error!(step = %step, run_id = %run_id, error = %err, "failed to record step outcome");
    }
}

/// Never-dispatched dependants of every failed step, without repeats.
fn skipped_dependants(graph: &Graph, failed: &[StepName]) -> Result<Vec<StepName>> {
    let mut skipped: Vec<StepName> = Vec::new();
    for step in failed {
        for dependant in graph.all_dependants(step)? {
            if !graph.yielded().contains(&dependant) && !skipped.contains(&dependant) {
                skipped.push(dependant);
            }
        }
    }
    Ok(skipped)
}
