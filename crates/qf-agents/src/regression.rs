//! Regression testing agent
//!
//! Runs a fixed suite over five risk categories and compares each result
//! against an optional `baseline` input mapping test name to the result
//! recorded on a previous run.

use crate::support::{decode_body, encode_body, new_id, optional_object, require_text, Simulation};
use async_trait::async_trait;
use qf_core::{AgentError, TestingAgent};
use qf_model::{
    AgentDescriptor, AgentInputs, CodeChange, RcaItem, Recommendation, Severity, TestCaseResult,
    TestData, TestScript,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const AGENT_TYPE: &str = "regression_testing";

const CASE_SECONDS: f64 = 0.8;
const BASELINE_KEY: &str = "baseline_results";

/// Suite categories with their priority, in execution order
const CATEGORIES: [(&str, Severity); 5] = [
    ("critical_path", Severity::Critical),
    ("high_risk_areas", Severity::High),
    ("previously_failed", Severity::High),
    ("boundary_cases", Severity::Medium),
    ("integration_points", Severity::Medium),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SuiteItem {
    name: String,
    description: String,
    steps: Vec<String>,
    expected_result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegressionScript {
    category: String,
    priority: Severity,
    suite: Vec<SuiteItem>,
}

fn suite_for(category: &str) -> Vec<SuiteItem> {
    vec![
        SuiteItem {
            name: format!("{category}_test_1"),
            description: format!("Test existing functionality for {category}"),
            steps: vec![
                "Execute baseline test".into(),
                "Compare with previous results".into(),
                "Verify no regression".into(),
            ],
            expected_result: "Behavior matches baseline".into(),
        },
        SuiteItem {
            name: format!("{category}_test_2"),
            description: format!("Validate integration for {category}"),
            steps: vec![
                "Test component interactions".into(),
                "Verify data flow".into(),
                "Check error handling".into(),
            ],
            expected_result: "All integrations work correctly".into(),
        },
    ]
}

/// Recorded results keyed by test case name
fn baseline_results(data: &TestData) -> BTreeMap<String, String> {
    data.get(BASELINE_KEY)
        .and_then(|b| b.get("results"))
        .and_then(Value::as_object)
        .map(|results| {
            results
                .iter()
                .map(|(name, value)| {
                    let recorded = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (name.clone(), recorded)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RegressionTestingAgent;

impl RegressionTestingAgent {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TestingAgent for RegressionTestingAgent {
    fn metadata(&self) -> AgentDescriptor {
        AgentDescriptor::new(
            AGENT_TYPE,
            "Regression Testing Agent",
            "Validates that existing functionality works after changes",
        )
        .requires(["source_code"])
        .accepts(["baseline", "requirements_doc", "endpoints", "config"])
        .with_capabilities([
            "Baseline test suite execution",
            "Change impact analysis",
            "Test prioritization",
            "Visual regression testing",
            "API regression testing",
            "Performance regression detection",
        ])
        .with_estimated_duration(900)
    }

    fn validate_inputs(&self, inputs: &AgentInputs) -> Result<(), AgentError> {
        require_text(inputs, "source_code")?;
        optional_object(inputs, "baseline")?;
        Ok(())
    }

    async fn generate_test_scripts(&self, _inputs: &AgentInputs) -> Result<Vec<TestScript>, AgentError> {
        CATEGORIES
            .iter()
            .map(|&(category, priority)| -> Result<TestScript, AgentError> {
                let body = encode_body(&RegressionScript {
                    category: category.to_string(),
                    priority,
                    suite: suite_for(category),
                })?;
                Ok(TestScript::new(new_id(), category, "regression", format!("{category} regression suite"))
                    .with_body(body))
            })
            .collect()
    }

    async fn generate_test_data(
        &self,
        inputs: &AgentInputs,
        _scripts: &[TestScript],
    ) -> Result<TestData, AgentError> {
        let recorded = optional_object(inputs, "baseline")?
            .cloned()
            .unwrap_or_default();
        tracing::debug!(baseline_entries = recorded.len(), "loaded regression baseline");

        let data = TestData::new()
            .with(BASELINE_KEY, json!({"version": "1.0.0", "results": recorded}))
            .with(
                "test_data",
                json!({
                    "test_inputs": ["input1", "input2", "input3"],
                    "expected_outputs": ["output1", "output2", "output3"],
                }),
            )
            .with("comparison_snapshots", json!(["snapshot_1.json", "snapshot_2.json"]))
            .with(
                "historical_data",
                json!({"test_runs": 100, "average_pass_rate": 0.95, "flaky_tests": []}),
            );
        Ok(Simulation::from_inputs(inputs).attach(data))
    }

    async fn execute_tests(
        &self,
        scripts: &[TestScript],
        data: &TestData,
    ) -> Result<Vec<TestCaseResult>, AgentError> {
        let simulation = Simulation::from_data(data);
        let baseline = baseline_results(data);
        let mut cases = Vec::new();
        for script in scripts {
            let body: RegressionScript = decode_body(script)?;
            for item in body.suite {
                let name = format!("Regression_{}_{}", body.category, item.name);
                let actual = item.expected_result.clone();
                let case = TestCaseResult::new(new_id(), &name, "regression", &item.expected_result)
                    .with_description(format!("Regression test: {}", item.description))
                    .with_steps(item.steps)
                    .with_actual(&actual)
                    .with_execution_time(CASE_SECONDS);
                let case = match baseline.get(&name) {
                    Some(recorded) if *recorded != actual => case.failed(format!(
                        "Behavior changed from baseline: recorded '{recorded}', observed '{actual}'"
                    )),
                    _ => case,
                };
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
                    "Regression Detected",
                    format!(
                        "Test {} behavior changed from baseline. Review recent code changes.",
                        case.name
                    ),
                    Severity::High,
                )
                .affecting([
                    case.name.clone(),
                    "Related Module".into(),
                    "Dependent Component".into(),
                ])
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
                    format!("Fix Regression: {}", rca.category),
                    "regression_fix",
                    format!(
                        "Review changes in {} and restore expected behavior",
                        rca.affected_components.join(", ")
                    ),
                )
                .with_code_changes(vec![CodeChange::new(
                    "component.py",
                    "42",
                    "return process_data(input)",
                    "# Review this change - may have introduced regression",
                )])
            })
            .collect())
    }
}
