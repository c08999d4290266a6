// src/engine/mod.rs

//! Reference driver for a [`Graph`](crate::dag::Graph).
//!
//! The graph only decides *what* may run next; this module does the rest:
//! - reconcile or purge persisted state before starting
//! - pull steps from the graph and spawn their actions
//! - record each action's outcome in the store
//! - wait for in-flight actions and finalize the run exactly once
//!
//! Callers with different policies (other executors, deadlines, cascading
//! cancellation) can drive the graph themselves; nothing here is required by
//! the scheduler.

use crate::types::{RunState, StepName};

pub mod driver;

pub use driver::run_flow;

/// Options for [`run_flow`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Discard all persisted step records instead of resuming from them.
    pub fresh: bool,
}

/// Summary of one driven run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Final run state (`Processed` or `Invalid`).
    pub state: RunState,
    /// Steps dispatched by this invocation, in dispatch order. Steps resumed
    /// as already complete are not included.
    pub dispatched: Vec<StepName>,
    /// Steps persisted as failed when the run was finalized.
    pub failed: Vec<StepName>,
    /// Steps never dispatched because they depend on a failed step.
    pub skipped: Vec<StepName>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RunState::Processed
    }
}
