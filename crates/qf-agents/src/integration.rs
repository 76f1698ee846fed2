//! Integration testing agent
//!
//! Exercises every endpoint with each HTTP method and three request shapes.

use crate::support::{decode_body, encode_body, endpoint_list, new_id, optional_object, Simulation};
use async_trait::async_trait;
use qf_core::{AgentError, TestingAgent};
use qf_model::{
    AgentDescriptor, AgentInputs, RcaItem, Recommendation, Severity, TestCaseResult, TestData,
    TestScript,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const AGENT_TYPE: &str = "integration_testing";

const METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];
const CASE_SECONDS: f64 = 0.25;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RequestCase {
    name: String,
    description: String,
    payload: Value,
    expected_status: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntegrationScript {
    endpoint: String,
    method: String,
    /// Header names only; credential values stay in the inputs
    headers: Vec<String>,
    cases: Vec<RequestCase>,
}

fn request_cases(endpoint: &str, method: &str) -> Vec<RequestCase> {
    vec![
        RequestCase {
            name: "valid_request".into(),
            description: format!("Test {method} {endpoint} with valid data"),
            payload: json!({"data": "valid"}),
            expected_status: if method == "GET" { 200 } else { 201 },
        },
        RequestCase {
            name: "invalid_auth".into(),
            description: format!("Test {method} {endpoint} with invalid authentication"),
            payload: json!({}),
            expected_status: 401,
        },
        RequestCase {
            name: "malformed_payload".into(),
            description: format!("Test {method} {endpoint} with malformed data"),
            payload: json!({"invalid": "data"}),
            expected_status: 400,
        },
    ]
}

fn header_names(api_keys: Option<&serde_json::Map<String, Value>>) -> Vec<String> {
    let mut headers = vec!["Content-Type".to_string(), "Accept".to_string()];
    if let Some(keys) = api_keys {
        headers.extend(keys.keys().map(|k| format!("X-API-{k}")));
    }
    headers
}

/// Failure category from the case name and error text
#[must_use]
pub fn categorize_failure(case: &TestCaseResult) -> &'static str {
    let error = case.error_message.as_deref().unwrap_or_default().to_lowercase();
    if case.name.to_lowercase().contains("auth") {
        "Authentication Failure"
    } else if error.contains("timeout") {
        "Timeout Error"
    } else if error.contains("404") {
        "Endpoint Not Found"
    } else {
        "Integration Error"
    }
}

fn suggested_fix(category: &str) -> &'static str {
    if category.contains("Authentication") {
        "Verify API key configuration and authentication mechanism"
    } else if category.contains("Timeout") {
        "Increase timeout settings or optimize backend processing"
    } else if category.contains("Not Found") {
        "Verify endpoint URL and routing configuration"
    } else {
        "Review API contract and ensure proper request/response handling"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IntegrationTestingAgent;

impl IntegrationTestingAgent {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TestingAgent for IntegrationTestingAgent {
    fn metadata(&self) -> AgentDescriptor {
        AgentDescriptor::new(
            AGENT_TYPE,
            "Integration Testing Agent",
            "Tests API endpoints, integrations, and component interactions",
        )
        .requires(["endpoints"])
        .accepts(["api_specs", "api_keys", "config"])
        .with_capabilities([
            "API endpoint testing",
            "Integration validation",
            "Contract testing",
            "Data flow validation",
            "Third-party integration testing",
            "Microservices communication testing",
        ])
        .with_estimated_duration(900)
    }

    fn validate_inputs(&self, inputs: &AgentInputs) -> Result<(), AgentError> {
        endpoint_list(inputs, "endpoints")?;
        optional_object(inputs, "api_specs")?;
        optional_object(inputs, "api_keys")?;
        Ok(())
    }

    async fn generate_test_scripts(&self, inputs: &AgentInputs) -> Result<Vec<TestScript>, AgentError> {
        let mut endpoints = endpoint_list(inputs, "endpoints")?;
        if let Some(paths) = optional_object(inputs, "api_specs")?
            .and_then(|spec| spec.get("paths"))
            .and_then(Value::as_object)
        {
            for path in paths.keys() {
                if !endpoints.contains(path) {
                    endpoints.push(path.clone());
                }
            }
        }
        let headers = header_names(optional_object(inputs, "api_keys")?);
        tracing::debug!(endpoints = endpoints.len(), "analyzed integration points");

        let mut scripts = Vec::with_capacity(endpoints.len() * METHODS.len());
        for endpoint in &endpoints {
            for method in METHODS {
                let body = encode_body(&IntegrationScript {
                    endpoint: endpoint.clone(),
                    method: method.to_string(),
                    headers: headers.clone(),
                    cases: request_cases(endpoint, method),
                })?;
                scripts.push(
                    TestScript::new(new_id(), endpoint, "integration", format!("{method} {endpoint}"))
                        .with_body(body),
                );
            }
        }
        Ok(scripts)
    }

    async fn generate_test_data(
        &self,
        inputs: &AgentInputs,
        _scripts: &[TestScript],
    ) -> Result<TestData, AgentError> {
        let data = TestData::new()
            .with(
                "valid_payloads",
                json!([
                    {"id": 1, "name": "Test User", "email": "test@example.com"},
                    {"query": "search term", "filters": {"category": "test"}},
                ]),
            )
            .with("invalid_payloads", json!([{}, {"invalid_field": "value"}, null]))
            .with(
                "authentication_tokens",
                json!({
                    "valid_token": "valid_jwt_token_here",
                    "expired_token": "expired_jwt_token_here",
                    "invalid_token": "invalid_token",
                }),
            )
            .with(
                "test_users",
                json!([
                    {"username": "test_user_1", "role": "admin"},
                    {"username": "test_user_2", "role": "user"},
                ]),
            )
            .with(
                "edge_case_data",
                json!([
                    {"large_payload": "x".repeat(10_000)},
                    {"unicode_data": "测试数据"},
                    {"special_chars": "<script>alert('xss')</script>"},
                ]),
            );
        Ok(Simulation::from_inputs(inputs).attach(data))
    }

    async fn execute_tests(
        &self,
        scripts: &[TestScript],
        data: &TestData,
    ) -> Result<Vec<TestCaseResult>, AgentError> {
        let simulation = Simulation::from_data(data);
        let mut cases = Vec::new();
        for script in scripts {
            let body: IntegrationScript = decode_body(script)?;
            for request in &body.cases {
                let status = format!("Status: {}", request.expected_status);
                let case = TestCaseResult::new(
                    new_id(),
                    format!("{}_{}_{}", body.method, body.endpoint, request.name),
                    "integration",
                    &status,
                )
                .with_description(&request.description)
                .with_steps([
                    format!("Prepare {} request to {}", body.method, body.endpoint),
                    format!("Send request with payload: {}", request.payload),
                    format!("Verify response status: {}", request.expected_status),
                    "Validate response schema and data".to_string(),
                ])
                .with_actual(status)
                .with_execution_time(CASE_SECONDS);
                cases.push(simulation.apply(case));
            }
        }
        Ok(cases)
    }

    async fn analyze_failures(&self, failed: &[TestCaseResult]) -> Result<Vec<RcaItem>, AgentError> {
        Ok(failed
            .iter()
            .map(|case| {
                RcaItem::new(
                    new_id(),
                    categorize_failure(case),
                    format!(
                        "Integration test {} failed. Check API endpoint availability and response format.",
                        case.name
                    ),
                    Severity::High,
                )
                .affecting([case.name.clone(), "API Gateway".into(), "Backend Service".into()])
                .with_stack_trace(case.error_message.clone())
            })
            .collect())
    }

    async fn generate_recommendations(&self, rca_items: &[RcaItem]) -> Result<Vec<Recommendation>, AgentError> {
        Ok(rca_items
            .iter()
            .map(|rca| {
                Recommendation::for_rca(
                    new_id(),
                    rca,
                    format!("Fix integration issue: {}", rca.category),
                    "integration_fix",
                    suggested_fix(&rca.category),
                )
            })
            .collect())
    }
}
