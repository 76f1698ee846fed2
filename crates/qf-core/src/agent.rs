//! Agent capability contract
//!
//! Every testing agent runs the same five stages. The orchestrator calls
//! them in order, one at a time, and owns everything around them: state,
//! timing, cancellation and persistence.

use crate::error::AgentError;
use async_trait::async_trait;
use qf_model::{
    AgentDescriptor, AgentInputs, RcaItem, Recommendation, TestCaseResult, TestData, TestScript,
};

/// Pluggable five-stage testing agent
#[async_trait]
pub trait TestingAgent: Send + Sync {
    /// Catalog entry for this agent
    fn metadata(&self) -> AgentDescriptor;

    /// Agent-specific input checks run at submission, after required slots
    /// are confirmed present
    ///
    /// # Errors
    /// `AgentError::InvalidInput` rejects the submission; no record is created.
    fn validate_inputs(&self, _inputs: &AgentInputs) -> Result<(), AgentError> {
        Ok(())
    }

    /// Stage 1
    async fn generate_test_scripts(
        &self,
        inputs: &AgentInputs,
    ) -> Result<Vec<TestScript>, AgentError>;

    /// Stage 2
    async fn generate_test_data(
        &self,
        inputs: &AgentInputs,
        scripts: &[TestScript],
    ) -> Result<TestData, AgentError>;

    /// Stage 3
    async fn execute_tests(
        &self,
        scripts: &[TestScript],
        data: &TestData,
    ) -> Result<Vec<TestCaseResult>, AgentError>;

    /// Stage 4, called only with `failed`/`error` cases
    async fn analyze_failures(
        &self,
        failed: &[TestCaseResult],
    ) -> Result<Vec<RcaItem>, AgentError>;

    /// Stage 5, called only with a non-empty RCA list
    ///
    /// Every returned `related_rca` must name one of `rca_items`.
    async fn generate_recommendations(
        &self,
        rca_items: &[RcaItem],
    ) -> Result<Vec<Recommendation>, AgentError>;
}
