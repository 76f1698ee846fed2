//! Agent catalog entries

use crate::ids::AgentType;
use crate::inputs::AgentInputs;
use serde::{Deserialize, Serialize};

/// Describes a registered agent: what it needs and what it does
///
/// Immutable once handed to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique registry key
    pub agent_type: AgentType,
    /// Display name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Semantic version of the agent
    pub version: String,
    /// Input slots that must be present on submission
    pub required_inputs: Vec<String>,
    /// Input slots the agent will use when present
    pub optional_inputs: Vec<String>,
    /// Descriptive capability tags
    pub capabilities: Vec<String>,
    /// Advisory run time in seconds
    pub estimated_duration: Option<u64>,
}

impl AgentDescriptor {
    /// Create descriptor with empty input and capability lists
    #[must_use]
    pub fn new(
        agent_type: impl Into<AgentType>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            agent_type: agent_type.into(),
            name: name.into(),
            description: description.into(),
            version: "1.0.0".to_string(),
            required_inputs: Vec::new(),
            optional_inputs: Vec::new(),
            capabilities: Vec::new(),
            estimated_duration: None,
        }
    }

    /// With version
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// With required input slots
    #[must_use]
    pub fn requires<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// With optional input slots
    #[must_use]
    pub fn accepts<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional_inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// With capability tags
    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// With advisory duration in seconds
    #[inline]
    #[must_use]
    pub fn with_estimated_duration(mut self, secs: u64) -> Self {
        self.estimated_duration = Some(secs);
        self
    }

    /// Required slots absent from `inputs`, in declaration order
    #[must_use]
    pub fn missing_inputs(&self, inputs: &AgentInputs) -> Vec<String> {
        self.required_inputs
            .iter()
            .filter(|slot| !inputs.is_provided(slot))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_builder() {
        let desc = AgentDescriptor::new("unit_testing", "Unit Testing Agent", "unit tests")
            .requires(["source_code"])
            .accepts(["libraries", "config"])
            .with_capabilities(["Code analysis"])
            .with_estimated_duration(300);

        assert_eq!(desc.agent_type.as_str(), "unit_testing");
        assert_eq!(desc.required_inputs, vec!["source_code"]);
        assert_eq!(desc.optional_inputs.len(), 2);
        assert_eq!(desc.estimated_duration, Some(300));
    }

    #[test]
    fn missing_inputs_reports_absent_and_empty_slots() {
        let desc = AgentDescriptor::new("x", "X", "x").requires(["source_code", "endpoints"]);

        let inputs = AgentInputs::new().with("source_code", json!(""));
        assert_eq!(desc.missing_inputs(&inputs), vec!["source_code", "endpoints"]);

        let inputs = AgentInputs::new()
            .with("source_code", json!("def f(): pass"))
            .with("endpoints", json!(["/api"]));
        assert!(desc.missing_inputs(&inputs).is_empty());
    }
}
