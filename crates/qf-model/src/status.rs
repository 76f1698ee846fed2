//! Execution lifecycle
//!
//! ```text
//! PENDING -> RUNNING -> { COMPLETED | FAILED | CANCELLED }
//! ```
//!
//! Terminal states are absorbing.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Submitted, waiting for a concurrency slot
    Pending,
    /// Holding a slot, executing a stage
    Running,
    /// All stages ran, regardless of test outcomes
    Completed,
    /// Orchestration-level fault: stage error, panic, timeout
    Failed,
    /// Cancellation observed at a stage boundary
    Cancelled,
}

impl ExecutionStatus {
    /// All states, lifecycle order
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Running,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Check if no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Validates a status transition
///
/// # Errors
/// - `ModelError::IllegalTransition` for any move outside the forward state machine
pub fn validate_transition(from: ExecutionStatus, to: ExecutionStatus) -> Result<(), ModelError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ModelError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: ExecutionStatus) -> Vec<ExecutionStatus> {
    use ExecutionStatus::*;
    match from {
        Pending => vec![Running],
        Running => vec![Completed, Failed, Cancelled],
        Completed | Failed | Cancelled => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_only_starts() {
        assert!(validate_transition(ExecutionStatus::Pending, ExecutionStatus::Running).is_ok());
        assert!(validate_transition(ExecutionStatus::Pending, ExecutionStatus::Completed).is_err());
        assert!(validate_transition(ExecutionStatus::Pending, ExecutionStatus::Cancelled).is_err());
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for status in ExecutionStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(allowed_transitions(status).is_empty());
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("FAILED".parse::<ExecutionStatus>().unwrap(), ExecutionStatus::Failed);
        assert!("done".parse::<ExecutionStatus>().is_err());
    }
}
