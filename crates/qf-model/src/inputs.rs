//! Agent inputs and stage-one/stage-two artefacts
//!
//! Inputs are an opaque bag of named JSON values. The orchestrator only checks
//! that required slots are present; interpretation belongs to the agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Named inputs supplied with a submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentInputs(BTreeMap<String, Value>);

impl AgentInputs {
    /// Create empty inputs
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a named value
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Insert a named value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Raw value for a slot
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for a slot
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// String list for a slot; a single string is treated as a one-element list
    #[must_use]
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Object value for a slot
    #[must_use]
    pub fn get_object(&self, key: &str) -> Option<&serde_json::Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Whether the slot holds a non-empty value (null, `""`, `[]` and `{}` count as absent)
    #[must_use]
    pub fn is_provided(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(_) => true,
        }
    }

    /// Slot names in key order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of slots
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no slots are set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for AgentInputs {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A generated test script (stage 1 output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestScript {
    pub script_id: String,
    /// Unit under test: function, endpoint, requirement id, ...
    pub target: String,
    pub category: String,
    pub description: String,
    /// Agent-specific script content
    #[serde(default)]
    pub body: Value,
}

impl TestScript {
    #[must_use]
    pub fn new(
        script_id: impl Into<String>,
        target: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            script_id: script_id.into(),
            target: target.into(),
            category: category.into(),
            description: description.into(),
            body: Value::Null,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

/// Generated test data (stage 2 output)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestData(pub BTreeMap<String, Value>);

impl TestData {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn str_list_accepts_single_string() {
        let inputs = AgentInputs::new()
            .with("endpoints", json!("/health"))
            .with("more", json!(["/a", "/b", 3]));

        assert_eq!(inputs.get_str_list("endpoints"), vec!["/health"]);
        assert_eq!(inputs.get_str_list("more"), vec!["/a", "/b"]);
        assert!(inputs.get_str_list("absent").is_empty());
    }

    #[test]
    fn inputs_serialize_as_flat_object() {
        let inputs = AgentInputs::new().with("source_code", json!("fn main() {}"));
        let value = serde_json::to_value(&inputs).unwrap();
        assert_eq!(value, json!({"source_code": "fn main() {}"}));
    }

    #[test]
    fn scalar_values_count_as_provided() {
        let inputs = AgentInputs::new()
            .with("flag", json!(false))
            .with("none", Value::Null);
        assert!(inputs.is_provided("flag"));
        assert!(!inputs.is_provided("none"));
    }
}
