//! Identifiers
//!
//! Execution ids are ULIDs from a process-wide monotonic generator, so ids
//! created by one process sort in creation order, even within a millisecond.

use crate::error::ModelError;
use parking_lot::{const_mutex, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::{Generator, Ulid};

static GENERATOR: Mutex<Option<Generator>> = const_mutex(None);

/// Unique execution identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub Ulid);

impl ExecutionId {
    /// Generate new execution ID, greater than every id generated before it
    #[must_use]
    pub fn new() -> Self {
        let mut generator = GENERATOR.lock();
        let generator = generator.get_or_insert_with(Generator::new);
        // Overflow needs 2^80 ids in one millisecond; fall back to a fresh ULID
        Self(generator.generate().unwrap_or_else(|_| Ulid::new()))
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExecutionId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|_| ModelError::InvalidExecutionId(s.to_string()))
    }
}

/// Registry key naming a kind of testing agent (`unit_testing`, `load_testing`, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentType(String);

impl AgentType {
    /// Create agent type from its key
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AgentType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for AgentType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_id_generation() {
        let id1 = ExecutionId::new();
        let id2 = ExecutionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn execution_ids_sort_in_creation_order() {
        let ids: Vec<ExecutionId> = (0..1000).map(|_| ExecutionId::new()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn execution_id_parse_display() {
        let id = ExecutionId::new();
        let parsed: ExecutionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn execution_id_rejects_garbage() {
        let err = "not-a-ulid".parse::<ExecutionId>().unwrap_err();
        assert!(matches!(err, ModelError::InvalidExecutionId(_)));
    }

    #[test]
    fn agent_type_serializes_as_plain_string() {
        let agent = AgentType::new("unit_testing");
        assert_eq!(serde_json::to_string(&agent).unwrap(), "\"unit_testing\"");
    }
}
