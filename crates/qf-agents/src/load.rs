//! Load testing agent
//!
//! Drives each endpoint through four expected-load profiles and checks the
//! response time and throughput SLA.

use crate::support::{decode_body, encode_body, endpoint_list, new_id, Simulation};
use async_trait::async_trait;
use qf_core::{AgentError, TestingAgent};
use qf_model::{
    AgentDescriptor, AgentInputs, RcaItem, Recommendation, Severity, TestCaseResult, TestData,
    TestScript,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const AGENT_TYPE: &str = "load_testing";

/// Virtual user profile shared by the load and stress agents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProfile {
    pub name: &'static str,
    pub users: u32,
    /// Seconds under load
    pub duration: u32,
    /// Seconds to reach `users`
    pub ramp_up: u32,
}

impl LoadProfile {
    #[must_use]
    pub const fn new(name: &'static str, users: u32, duration: u32, ramp_up: u32) -> Self {
        Self {
            name,
            users,
            duration,
            ramp_up,
        }
    }
}

pub const LOAD_PROFILES: [LoadProfile; 4] = [
    LoadProfile::new("baseline", 10, 60, 6),
    LoadProfile::new("normal_load", 100, 300, 30),
    LoadProfile::new("peak_load", 500, 600, 60),
    LoadProfile::new("sustained_load", 200, 1800, 180),
];

/// Script body for one profile against one endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProfileScript {
    pub(crate) endpoint: String,
    pub(crate) profile: String,
    pub(crate) users: u32,
    pub(crate) duration: u32,
    pub(crate) ramp_up: u32,
}

/// One script per profile and endpoint, profiles outermost
pub(crate) fn profile_scripts(
    profiles: &[LoadProfile],
    endpoints: &[String],
    category: &str,
) -> Result<Vec<TestScript>, AgentError> {
    let mut scripts = Vec::with_capacity(profiles.len() * endpoints.len());
    for profile in profiles {
        for endpoint in endpoints {
            let body = encode_body(&ProfileScript {
                endpoint: endpoint.clone(),
                profile: profile.name.to_string(),
                users: profile.users,
                duration: profile.duration,
                ramp_up: profile.ramp_up,
            })?;
            scripts.push(
                TestScript::new(
                    new_id(),
                    endpoint,
                    category,
                    format!("{} users against {endpoint}", profile.users),
                )
                .with_body(body),
            );
        }
    }
    Ok(scripts)
}

pub(crate) fn decode_profiles(scripts: &[TestScript]) -> Result<Vec<ProfileScript>, AgentError> {
    scripts.iter().map(decode_body).collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoadTestingAgent;

impl LoadTestingAgent {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TestingAgent for LoadTestingAgent {
    fn metadata(&self) -> AgentDescriptor {
        AgentDescriptor::new(
            AGENT_TYPE,
            "Load Testing Agent",
            "Tests system performance under expected load conditions",
        )
        .requires(["endpoints"])
        .accepts(["config"])
        .with_capabilities([
            "Concurrent user simulation",
            "Response time measurement",
            "Throughput analysis",
            "Resource utilization monitoring",
            "Performance baseline establishment",
            "SLA validation",
        ])
        .with_estimated_duration(1200)
    }

    fn validate_inputs(&self, inputs: &AgentInputs) -> Result<(), AgentError> {
        endpoint_list(inputs, "endpoints").map(drop)
    }

    async fn generate_test_scripts(&self, inputs: &AgentInputs) -> Result<Vec<TestScript>, AgentError> {
        let endpoints = endpoint_list(inputs, "endpoints")?;
        tracing::debug!(endpoints = endpoints.len(), "generating load test scenarios");
        profile_scripts(&LOAD_PROFILES, &endpoints, "load")
    }

    async fn generate_test_data(
        &self,
        inputs: &AgentInputs,
        _scripts: &[TestScript],
    ) -> Result<TestData, AgentError> {
        let data = TestData::new()
            .with(
                "user_scenarios",
                json!([
                    {"scenario": "Browse products", "weight": 40},
                    {"scenario": "Search", "weight": 30},
                    {"scenario": "Purchase", "weight": 20},
                    {"scenario": "User profile", "weight": 10},
                ]),
            )
            .with(
                "test_data_pool",
                json!({
                    "user_id_range": [1, 10_000],
                    "product_id_range": [1, 1_000],
                    "search_terms": ["test", "product", "item", "category"],
                }),
            )
            .with(
                "performance_thresholds",
                json!({
                    "response_time_p95": 2.0,
                    "response_time_p99": 5.0,
                    "throughput_min": 100,
                    "error_rate_max": 0.01,
                }),
            );
        Ok(Simulation::from_inputs(inputs).attach(data))
    }

    async fn execute_tests(
        &self,
        scripts: &[TestScript],
        data: &TestData,
    ) -> Result<Vec<TestCaseResult>, AgentError> {
        let simulation = Simulation::from_data(data);
        Ok(decode_profiles(scripts)?
            .into_iter()
            .map(|run| {
                let case = TestCaseResult::new(
                    new_id(),
                    format!("Load_{}_{}", run.profile, run.endpoint),
                    "load",
                    "Response time < 2s, Throughput > 100 req/s",
                )
                .with_description(format!(
                    "Load test with {} users for {}s",
                    run.users, run.duration
                ))
                .with_steps([
                    format!("Configure {} virtual users", run.users),
                    format!("Ramp up over {} seconds", run.ramp_up),
                    format!("Execute load for {} seconds", run.duration),
                    "Measure response times and throughput".to_string(),
                    "Verify SLA compliance".to_string(),
                ])
                .with_actual("Response time: 1.2s, Throughput: 150 req/s")
                .with_execution_time(f64::from(run.duration));
                simulation.apply(case)
            })
            .collect())
    }

    async fn analyze_failures(&self, failed: &[TestCaseResult]) -> Result<Vec<RcaItem>, AgentError> {
        Ok(failed
            .iter()
            .map(|_| {
                RcaItem::new(
                    new_id(),
                    "Performance Bottleneck",
                    "System cannot handle the specified load",
                    Severity::High,
                )
                .affecting(["Application Server", "Database", "Network"])
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
                    "Performance Optimization Required",
                    "performance_optimization",
                    "Implement caching, optimize database queries, scale horizontally",
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn one_case_per_profile_and_endpoint() {
        let agent = LoadTestingAgent::new();
        let inputs = AgentInputs::new().with("endpoints", json!(["/a", "/b"]));
        let scripts = agent.generate_test_scripts(&inputs).await.unwrap();
        let data = agent.generate_test_data(&inputs, &scripts).await.unwrap();
        let cases = agent.execute_tests(&scripts, &data).await.unwrap();

        assert_eq!(cases.len(), 8);
        assert_eq!(cases[0].name, "Load_baseline_/a");
        assert_eq!(cases[1].name, "Load_baseline_/b");
        assert!((cases[7].execution_time - 1800.0).abs() < f64::EPSILON);
        assert_eq!(cases[2].steps[1], "Ramp up over 30 seconds");
    }

    #[tokio::test]
    async fn bottleneck_analysis_has_no_stack_trace() {
        let agent = LoadTestingAgent::new();
        let failed = TestCaseResult::new("c", "Load_peak_load_/a", "load", "fast").failed("p95 4.1s");
        let rca = agent.analyze_failures(&[failed]).await.unwrap();
        assert_eq!(rca[0].category, "Performance Bottleneck");
        assert!(rca[0].stack_trace.is_none());
    }
}
