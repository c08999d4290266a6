// src/dag/node.rs

use std::fmt;
use std::sync::Arc;

use crate::action::StepAction;
use crate::store::StepRecord;
use crate::types::StepName;

/// A vertex of the flow graph wrapping one named step.
///
/// Edges are stored as indices into the owning graph's node list, in the
/// order they were declared. A node never outlives its graph.
#[derive(Clone)]
pub struct Node {
    pub(super) name: StepName,
    /// Nodes this one depends on.
    pub(super) predecessors: Vec<usize>,
    /// Nodes that depend on this one.
    pub(super) successors: Vec<usize>,
    pub(super) action: Arc<dyn StepAction>,
    /// Last status read from the store; `None` until observed.
    pub(super) persisted_status: Option<StepRecord>,
}

impl Node {
    pub(super) fn new(name: StepName, predecessors: Vec<usize>, action: Arc<dyn StepAction>) -> Self {
        Self {
            name,
            predecessors,
            successors: Vec::new(),
            action,
            persisted_status: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &Arc<dyn StepAction> {
        &self.action
    }

    pub fn persisted_status(&self) -> Option<&StepRecord> {
        self.persisted_status.as_ref()
    }

    /// True iff the persisted record says the step completed successfully.
    pub fn is_complete(&self) -> bool {
        self.persisted_status
            .as_ref()
            .is_some_and(StepRecord::is_complete)
    }

    /// True iff the persisted record says the step is invalid or cancelled.
    pub fn is_failed(&self) -> bool {
        self.persisted_status
            .as_ref()
            .is_some_and(StepRecord::is_failed)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("action", &self.action.name())
            .field("predecessors", &self.predecessors)
            .field("successors", &self.successors)
            .field("persisted_status", &self.persisted_status.as_ref().map(|r| r.status))
            .finish()
    }
}
