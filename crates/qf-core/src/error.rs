//! Error types for the orchestrator
//!
//! Submission-time errors are returned before any record exists. Stage
//! failures never surface here: the pipeline turns them into a FAILED record.

use qf_model::{AgentType, ExecutionId};
use qf_store::StoreError;
use std::path::PathBuf;

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// No agent registered under this type
    #[error("unknown agent type: {0}")]
    UnknownAgentType(AgentType),

    /// Required input slots absent or empty
    #[error("missing required inputs for {agent_type}: {}", missing.join(", "))]
    MissingInputs {
        agent_type: AgentType,
        missing: Vec<String>,
    },

    /// Agent rejected the supplied inputs
    #[error("invalid inputs for {agent_type}: {source}")]
    InvalidInputs {
        agent_type: AgentType,
        #[source]
        source: AgentError,
    },

    /// No live or stored record with this id
    #[error("unknown execution: {0}")]
    UnknownExecution(ExecutionId),

    /// Operation requires a terminal execution
    #[error("execution {0} is still in progress")]
    ExecutionInProgress(ExecutionId),

    /// Result store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl OrchestratorError {
    /// Rejected before a record was created
    #[inline]
    #[must_use]
    pub fn is_submission_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAgentType(_) | Self::MissingInputs { .. } | Self::InvalidInputs { .. }
        )
    }

    /// Raised for an id with no record
    #[inline]
    #[must_use]
    pub fn is_lookup_error(&self) -> bool {
        matches!(self, Self::UnknownExecution(_))
    }
}

/// Failure raised by an agent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// Stage could not produce its output
    #[error("{0}")]
    Failed(String),

    /// Input slot present but unusable
    #[error("input '{slot}' is invalid: {reason}")]
    InvalidInput { slot: String, reason: String },
}

impl AgentError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid_input(slot: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            slot: slot.into(),
            reason: reason.into(),
        }
    }
}

/// Agent registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("agent type already registered: {0}")]
    DuplicateAgentType(AgentType),

    #[error("unknown agent type: {0}")]
    UnknownAgentType(AgentType),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Environment override could not be parsed
    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
