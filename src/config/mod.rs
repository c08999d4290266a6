// src/config/mod.rs

//! Flow definitions.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a definition from disk (`loader.rs`).
//! - Validate step names, dependencies and acyclicity, and derive the
//!   order in which steps are appended to a graph (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, FlowSection, RawConfigFile, StepConfig};
pub use validate::validate_config;
