// src/types.rs

//! Small value types shared across the scheduler, the store and the driver.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical step name type used throughout the crate.
pub type StepName = String;

/// Sentinel name reserved for the implicit entry of a flow.
pub const START: &str = "START";

/// Sentinel name reserved for the implicit exit of a flow.
pub const FINISH: &str = "FINISH";

/// How long `Graph::next` waits before re-scanning when nothing is dispatchable.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Returns `true` if `name` collides with one of the sentinel step names.
pub fn is_reserved_name(name: &str) -> bool {
    name == START || name == FINISH
}

/// Lifecycle of one run of a flow.
///
/// - `Embryo`: the run record exists but the run has not been started.
/// - `InProgress`: `start_run` has been called.
/// - `Processed`: the run finished successfully.
/// - `Invalid`: the run finished with at least one failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Embryo,
    InProgress,
    Processed,
    Invalid,
}

impl RunState {
    /// Whether the run has been finalized one way or the other.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Processed | RunState::Invalid)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Embryo => "embryo",
            RunState::InProgress => "in_progress",
            RunState::Processed => "processed",
            RunState::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// Persisted status of a single step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step has been dispatched and its action has not reported back yet.
    Running,
    /// The step's action finished successfully.
    Complete,
    /// The step's action failed.
    Invalid,
    /// The step was cancelled before it could finish.
    Cancelled,
}

impl StepStatus {
    pub fn is_complete(self) -> bool {
        self == StepStatus::Complete
    }

    /// Terminal failure: either invalid or cancelled.
    pub fn is_failed(self) -> bool {
        matches!(self, StepStatus::Invalid | StepStatus::Cancelled)
    }
}

/// Opaque identifier of a run; scopes every step record of that run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Parse a duration string such as `"500ms"`, `"5s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration(" 5s "), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("3d").is_err());
        assert!(parse_duration("18446744073709551615h").is_err());
        assert!(parse_duration("307445734561825861m").is_err());
        assert_eq!(
            parse_duration("18446744073709551615s"),
            Ok(Duration::from_secs(u64::MAX))
        );
    }

    #[test]
    fn sentinel_names_are_reserved() {
        assert!(is_reserved_name("START"));
        assert!(is_reserved_name("FINISH"));
        assert!(!is_reserved_name("start"));
        assert!(!is_reserved_name("extract"));
    }

    #[test]
    fn step_status_classification() {
        assert!(StepStatus::Complete.is_complete());
        assert!(!StepStatus::Running.is_complete());
        assert!(StepStatus::Invalid.is_failed());
        assert!(StepStatus::Cancelled.is_failed());
        assert!(!StepStatus::Running.is_failed());
        assert!(!StepStatus::Complete.is_failed());
    }
}
