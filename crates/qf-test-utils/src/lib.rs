//! Testing utilities for QualityForce workspace
//!
//! Scriptable stub agents and manager fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use qf_core::{AgentError, AgentRegistry, ExecutionManager, OrchestratorConfig, TestingAgent};
use qf_model::{
    AgentDescriptor, AgentInputs, ExecutionId, ExecutionRecord, RcaItem, Recommendation, Severity,
    Stage, TestCaseResult, TestData, TestScript,
};
use qf_store::{MemoryStore, ResultStore, StoreError, StoreStats};
use std::sync::Arc;
use std::time::Duration;

/// Agent whose stage outcomes are scripted by the test
#[derive(Debug, Clone)]
pub struct StubAgent {
    descriptor: AgentDescriptor,
    results: Vec<TestCaseResult>,
    fail_at: Option<Stage>,
    hang_at: Option<Stage>,
    panic_at: Option<Stage>,
    stage_delay: Duration,
    dangling_recommendation: bool,
    calls: Arc<Mutex<Vec<Stage>>>,
}

impl StubAgent {
    /// Stub returning one passed test case, no required inputs
    pub fn new(agent_type: &str) -> Self {
        Self {
            descriptor: AgentDescriptor::new(agent_type, format!("Stub {agent_type}"), "scripted stub agent"),
            results: vec![passed_case("stub-1")],
            fail_at: None,
            hang_at: None,
            panic_at: None,
            stage_delay: Duration::ZERO,
            dangling_recommendation: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Test cases returned from `execute_tests`
    #[must_use]
    pub fn with_results(mut self, results: Vec<TestCaseResult>) -> Self {
        self.results = results;
        self
    }

    #[must_use]
    pub fn requires(mut self, inputs: &[&str]) -> Self {
        self.descriptor = self.descriptor.requires(inputs.iter().copied());
        self
    }

    /// Return an agent error from `stage`
    #[must_use]
    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Never return from `stage`
    #[must_use]
    pub fn hanging_at(mut self, stage: Stage) -> Self {
        self.hang_at = Some(stage);
        self
    }

    #[must_use]
    pub fn panicking_at(mut self, stage: Stage) -> Self {
        self.panic_at = Some(stage);
        self
    }

    /// Sleep this long inside every stage
    #[must_use]
    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.stage_delay = delay;
        self
    }

    /// Emit a recommendation pointing at an issue that does not exist
    #[must_use]
    pub fn with_dangling_recommendation(mut self) -> Self {
        self.dangling_recommendation = true;
        self
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    /// Stages entered so far, across all instances cloned from this stub
    pub fn calls(&self) -> Vec<Stage> {
        self.calls.lock().clone()
    }

    async fn enter(&self, stage: Stage) -> Result<(), AgentError> {
        self.calls.lock().push(stage);
        if !self.stage_delay.is_zero() {
            tokio::time::sleep(self.stage_delay).await;
        }
        if self.hang_at == Some(stage) {
            std::future::pending::<()>().await;
        }
        if self.panic_at == Some(stage) {
            panic!("stub agent panicked in {stage}");
        }
        if self.fail_at == Some(stage) {
            return Err(AgentError::failed(format!("stub failure in {stage}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TestingAgent for StubAgent {
    fn metadata(&self) -> AgentDescriptor {
        self.descriptor.clone()
    }

    async fn generate_test_scripts(&self, _inputs: &AgentInputs) -> Result<Vec<TestScript>, AgentError> {
        self.enter(Stage::GenerateTestScripts).await?;
        Ok(self
            .results
            .iter()
            .map(|case| TestScript::new(format!("script-{}", case.id), &case.name, &case.test_type, &case.description))
            .collect())
    }

    async fn generate_test_data(
        &self,
        _inputs: &AgentInputs,
        _scripts: &[TestScript],
    ) -> Result<TestData, AgentError> {
        self.enter(Stage::GenerateTestData).await?;
        Ok(TestData::new())
    }

    async fn execute_tests(
        &self,
        _scripts: &[TestScript],
        _data: &TestData,
    ) -> Result<Vec<TestCaseResult>, AgentError> {
        self.enter(Stage::ExecuteTests).await?;
        Ok(self.results.clone())
    }

    async fn analyze_failures(&self, failed: &[TestCaseResult]) -> Result<Vec<RcaItem>, AgentError> {
        self.enter(Stage::AnalyzeFailures).await?;
        Ok(failed
            .iter()
            .map(|case| {
                RcaItem::new(
                    format!("issue-{}", case.id),
                    "Logic Error",
                    case.error_message.clone().unwrap_or_default(),
                    Severity::Medium,
                )
                .affecting([case.name.clone()])
            })
            .collect())
    }

    async fn generate_recommendations(&self, rca_items: &[RcaItem]) -> Result<Vec<Recommendation>, AgentError> {
        self.enter(Stage::GenerateRecommendations).await?;
        let mut recs: Vec<Recommendation> = rca_items
            .iter()
            .map(|rca| Recommendation::for_rca(format!("rec-{}", rca.issue_id), rca, "Fix issue", "code_fix", "adjust logic"))
            .collect();
        if self.dangling_recommendation {
            if let Some(first) = recs.first_mut() {
                first.related_rca = "issue-does-not-exist".into();
            }
        }
        Ok(recs)
    }
}

pub fn passed_case(id: &str) -> TestCaseResult {
    TestCaseResult::new(id, format!("test_{id}"), "stub", "succeeds")
        .with_actual("succeeded")
        .with_execution_time(0.01)
}

pub fn failed_case(id: &str, message: &str) -> TestCaseResult {
    TestCaseResult::new(id, format!("test_{id}"), "stub", "succeeds")
        .with_execution_time(0.01)
        .failed(message)
}

/// Registry holding the given stubs
pub fn stub_registry(stubs: impl IntoIterator<Item = StubAgent>) -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    for stub in stubs {
        let descriptor = stub.metadata();
        registry
            .register(descriptor, Arc::new(move || -> Box<dyn TestingAgent> { Box::new(stub.clone()) }))
            .unwrap();
    }
    registry
}

/// Config with a small slot pool and a short timeout
pub fn test_config(max_agents: usize, timeout: Duration) -> OrchestratorConfig {
    OrchestratorConfig::new()
        .with_max_agents(max_agents)
        .with_execution_timeout(timeout)
}

/// Manager over an in-memory store; the store is returned for inspection
pub fn setup_manager(
    config: OrchestratorConfig,
    stubs: impl IntoIterator<Item = StubAgent>,
) -> (ExecutionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = ExecutionManager::new(config, Arc::new(stub_registry(stubs)), store.clone()).unwrap();
    (manager, store)
}

/// Manager over any store
pub fn manager_over(
    config: OrchestratorConfig,
    stubs: impl IntoIterator<Item = StubAgent>,
    store: Arc<dyn ResultStore>,
) -> ExecutionManager {
    ExecutionManager::new(config, Arc::new(stub_registry(stubs)), store).unwrap()
}

/// Memory store that rejects the next `n` writes of terminal records
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_terminal_puts: Mutex<usize>,
}

impl FlakyStore {
    pub fn failing_terminal_puts(n: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_terminal_puts: Mutex::new(n),
        }
    }
}

#[async_trait]
impl ResultStore for FlakyStore {
    async fn put(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        if record.status.is_terminal() {
            let mut remaining = self.failing_terminal_puts.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::io_error(
                    "flaky-store",
                    std::io::Error::other("injected write failure"),
                ));
            }
        }
        self.inner.put(record).await
    }

    async fn get(&self, id: &ExecutionId) -> Result<ExecutionRecord, StoreError> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: &ExecutionId) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> Result<Vec<ExecutionId>, StoreError> {
        self.inner.list().await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.inner.stats().await
    }

    fn backend(&self) -> &'static str {
        "flaky"
    }
}
