// src/errors.rs

//! Crate-wide error types.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::StepName;

/// Errors raised while building or querying a [`Graph`](crate::dag::Graph).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("step '{step}' depends on unknown steps: {}", missing.join(", "))]
    MissingDependencies {
        step: StepName,
        missing: Vec<StepName>,
    },

    #[error("duplicate step name: {0}")]
    DuplicateStep(StepName),

    #[error("step name is reserved: {0}")]
    ReservedName(StepName),

    #[error("step not found: {0}")]
    UnknownStep(StepName),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum FlowgraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlowgraphError>;
