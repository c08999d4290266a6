// src/dag/next_step.rs

//! Result type of a single traversal step.

use crate::types::StepName;

/// Outcome of one call to [`Graph::next`](crate::dag::Graph::next).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// This step is now unblocked and has been marked as yielded; the caller
    /// should execute it.
    Dispatch(StepName),
    /// Every step has been dispatched at least once. Steps may still be in
    /// flight.
    Done,
    /// The named step is persisted as failed; no further step will be
    /// dispatched from this graph.
    Failed(StepName),
}
