//! Error types for the data model

use crate::status::ExecutionStatus;

/// Model-level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Status change not permitted by the lifecycle
    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition {
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    /// Execution identifier could not be parsed
    #[error("invalid execution id '{0}'")]
    InvalidExecutionId(String),

    /// Unrecognised enum value in textual form
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_display() {
        let err = ModelError::IllegalTransition {
            from: ExecutionStatus::Completed,
            to: ExecutionStatus::Running,
        };
        assert_eq!(err.to_string(), "illegal status transition: completed -> running");
    }
}
