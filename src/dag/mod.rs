// src/dag/mod.rs

//! Flow graph representation and scheduling.
//!
//! - [`node`] holds a single step vertex and its persisted status.
//! - [`graph`] builds the DAG and implements the pull-based traversal that
//!   decides which step may run next.
//! - [`lifecycle`] moves the owning run through its states and reconciles
//!   in-memory status with the store after a restart.
//! - [`next_step`] defines the result type of a traversal step.

pub mod graph;
pub mod lifecycle;
pub mod next_step;
pub mod node;

pub use graph::Graph;
pub use next_step::NextStep;
pub use node::Node;
