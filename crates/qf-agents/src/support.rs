//! Shared helpers for the built-in agents
//!
//! Input coercion, script body decoding and the deterministic failure
//! simulation that every built-in agent honours.

use qf_core::AgentError;
use qf_model::{AgentInputs, TestCaseResult, TestData, TestScript};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which the simulation settings travel in [`TestData`]
pub const SIMULATION_KEY: &str = "simulation";

const DEFAULT_FAILURE: &str = "simulated failure";

/// Fresh opaque identifier for scripts, cases, issues and recommendations
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Non-empty string slot
///
/// # Errors
/// `AgentError::InvalidInput` if the slot holds anything but a non-empty string.
pub fn require_text<'a>(inputs: &'a AgentInputs, slot: &str) -> Result<&'a str, AgentError> {
    match inputs.get(slot) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(AgentError::invalid_input(slot, "must not be empty"))
        }
        Some(_) => Err(AgentError::invalid_input(slot, "must be a string")),
    }
}

/// Optional string slot; absent and null are `None`
///
/// # Errors
/// `AgentError::InvalidInput` if the slot holds a non-string value.
pub fn optional_text<'a>(inputs: &'a AgentInputs, slot: &str) -> Result<Option<&'a str>, AgentError> {
    match inputs.get(slot) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(_) => Err(AgentError::invalid_input(slot, "must be a string")),
    }
}

/// Endpoint list: a single string or an array of strings
///
/// # Errors
/// `AgentError::InvalidInput` if any element is not a non-empty string.
pub fn endpoint_list(inputs: &AgentInputs, slot: &str) -> Result<Vec<String>, AgentError> {
    match inputs.get(slot) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(one)) if !one.is_empty() => Ok(vec![one.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) if !s.is_empty() => Ok(s.clone()),
                other => Err(AgentError::invalid_input(
                    slot,
                    format!("expected endpoint string, got {other}"),
                )),
            })
            .collect(),
        Some(_) => Err(AgentError::invalid_input(
            slot,
            "must be a string or a list of strings",
        )),
    }
}

/// Optional object slot
///
/// # Errors
/// `AgentError::InvalidInput` if the slot is present and not an object.
pub fn optional_object<'a>(
    inputs: &'a AgentInputs,
    slot: &str,
) -> Result<Option<&'a serde_json::Map<String, Value>>, AgentError> {
    match inputs.get(slot) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(AgentError::invalid_input(slot, "must be an object")),
    }
}

/// Decode the agent-specific body of a script produced by stage 1
///
/// # Errors
/// `AgentError::Failed` if the body does not have the expected shape.
pub fn decode_body<T: DeserializeOwned>(script: &TestScript) -> Result<T, AgentError> {
    serde_json::from_value(script.body.clone())
        .map_err(|e| AgentError::failed(format!("malformed script {}: {e}", script.script_id)))
}

/// Encode a script body
///
/// # Errors
/// `AgentError::Failed` if serialization fails.
pub fn encode_body<T: Serialize>(body: &T) -> Result<Value, AgentError> {
    serde_json::to_value(body).map_err(|e| AgentError::failed(format!("unencodable script body: {e}")))
}

/// Deterministic failure injection read from the `config` input
///
/// `config.simulate_failures` lists substrings of test case names that
/// should fail; `config.failure_message` overrides the error message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulation {
    #[serde(default)]
    pub simulate_failures: Vec<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
}

impl Simulation {
    /// Read the settings from `inputs.config`, ignoring unrelated keys
    #[must_use]
    pub fn from_inputs(inputs: &AgentInputs) -> Self {
        let Some(config) = inputs.get_object("config") else {
            return Self::default();
        };
        let simulate_failures = match config.get("simulate_failures") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(one)) if !one.is_empty() => vec![one.clone()],
            _ => Vec::new(),
        };
        let failure_message = config
            .get("failure_message")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            simulate_failures,
            failure_message,
        }
    }

    /// Settings carried in stage-2 data; absent means no injected failures
    #[must_use]
    pub fn from_data(data: &TestData) -> Self {
        data.get(SIMULATION_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Attach these settings to stage-2 data
    #[must_use]
    pub fn attach(&self, data: TestData) -> TestData {
        match serde_json::to_value(self) {
            Ok(value) => data.with(SIMULATION_KEY, value),
            Err(_) => data,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.simulate_failures.is_empty()
    }

    /// Fail `case` if its name matches one of the configured patterns
    #[must_use]
    pub fn apply(&self, case: TestCaseResult) -> TestCaseResult {
        if !self.simulate_failures.iter().any(|p| case.name.contains(p.as_str())) {
            return case;
        }
        let message = self
            .failure_message
            .clone()
            .unwrap_or_else(|| DEFAULT_FAILURE.to_string());
        tracing::debug!(case = %case.name, "injecting simulated failure");
        case.with_actual(message.clone()).failed(message)
    }
}
