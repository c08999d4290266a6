// src/action.rs

//! Step actions: the executable unit behind each node.
//!
//! The graph only ever reads an action's [`name`](StepAction::name); invoking
//! it is the driver's job (see [`crate::engine`]). Outcomes are reported
//! back through the store, never to the graph directly.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("failed to spawn step process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("step process exited with status {code}")]
    ExitStatus { code: i32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Future returned by [`StepAction::execute`].
///
/// It is `'static` so the driver can spawn it on its own Tokio task.
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send + 'static>>;

pub trait StepAction: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Run the step once.
    fn execute(&self) -> ActionFuture;
}
