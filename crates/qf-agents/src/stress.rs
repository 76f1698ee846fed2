//! Stress testing agent

use crate::load::{decode_profiles, profile_scripts, LoadProfile};
use crate::support::{endpoint_list, new_id, Simulation};
use async_trait::async_trait;
use qf_core::{AgentError, TestingAgent};
use qf_model::{
    AgentDescriptor, AgentInputs, RcaItem, Recommendation, Severity, TestCaseResult, TestData,
    TestScript,
};
use serde_json::json;

pub const AGENT_TYPE: &str = "stress_testing";

pub const STRESS_PROFILES: [LoadProfile; 3] = [
    LoadProfile::new("spike", 1_000, 60, 10),
    LoadProfile::new("extreme", 5_000, 300, 30),
    LoadProfile::new("breaking_point", 10_000, 600, 60),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct StressTestingAgent;

impl StressTestingAgent {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TestingAgent for StressTestingAgent {
    fn metadata(&self) -> AgentDescriptor {
        AgentDescriptor::new(
            AGENT_TYPE,
            "Stress Testing Agent",
            "Tests system behavior under extreme load conditions",
        )
        .requires(["endpoints"])
        .accepts(["config"])
        .with_capabilities([
            "Breaking point identification",
            "Recovery testing",
            "Spike load testing",
            "Endurance testing",
            "Scalability assessment",
        ])
        .with_estimated_duration(1800)
    }

    fn validate_inputs(&self, inputs: &AgentInputs) -> Result<(), AgentError> {
        endpoint_list(inputs, "endpoints").map(drop)
    }

    async fn generate_test_scripts(&self, inputs: &AgentInputs) -> Result<Vec<TestScript>, AgentError> {
        profile_scripts(&STRESS_PROFILES, &endpoint_list(inputs, "endpoints")?, "stress")
    }

    async fn generate_test_data(
        &self,
        inputs: &AgentInputs,
        _scripts: &[TestScript],
    ) -> Result<TestData, AgentError> {
        let data = TestData::new()
            .with("stress_scenarios", json!(["spike_load", "sustained_high_load", "recovery"]))
            .with("monitoring_metrics", json!(["cpu", "memory", "disk_io", "network"]))
            .with("failure_thresholds", json!({"error_rate": 0.5, "timeout_rate": 0.3}));
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
                    format!("Stress_{}_{}", run.profile, run.endpoint),
                    "stress",
                    "System handles stress gracefully or fails safely",
                )
                .with_description(format!("Stress test with {} users", run.users))
                .with_steps([
                    format!("Ramp up to {} users", run.users),
                    "Monitor system behavior".to_string(),
                    "Identify breaking point".to_string(),
                    "Test recovery".to_string(),
                ])
                .with_actual("System maintained stability")
                .with_execution_time(f64::from(run.duration));
                simulation.apply(case)
            })
            .collect())
    }

    async fn analyze_failures(&self, failed: &[TestCaseResult]) -> Result<Vec<RcaItem>, AgentError> {
        Ok(failed
            .iter()
            .map(|case| {
                RcaItem::new(
                    new_id(),
                    "Stability Failure",
                    format!("{} did not degrade gracefully under extreme load", case.name),
                    Severity::High,
                )
                .affecting(["Application Server", "Load Balancer", "Database"])
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
                    "Harden behavior under stress",
                    "performance_optimization",
                    "Add rate limiting and back-pressure, configure autoscaling, verify recovery after load is removed",
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn three_profiles_per_endpoint() {
        let agent = StressTestingAgent::new();
        let inputs = AgentInputs::new().with("endpoints", json!("/checkout"));
        let scripts = agent.generate_test_scripts(&inputs).await.unwrap();
        let data = agent.generate_test_data(&inputs, &scripts).await.unwrap();
        let cases = agent.execute_tests(&scripts, &data).await.unwrap();

        let names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Stress_spike_/checkout",
                "Stress_extreme_/checkout",
                "Stress_breaking_point_/checkout"
            ]
        );
        assert_eq!(cases[2].steps[0], "Ramp up to 10000 users");
    }
}
