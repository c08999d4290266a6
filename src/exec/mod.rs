// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] provides [`CommandAction`], a [`StepAction`](crate::action::StepAction)
//!   that runs a shell command with `tokio::process::Command`.

pub mod command;

pub use command::CommandAction;
