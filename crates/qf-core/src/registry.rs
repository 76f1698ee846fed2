//! Agent registry
//!
//! Maps agent types to descriptors and factories. Built once at startup and
//! shared read-only (behind `Arc`) by the execution manager, so lookups take
//! no lock.

use crate::agent::TestingAgent;
use crate::error::RegistryError;
use qf_model::{AgentDescriptor, AgentType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Produces a fresh agent instance per execution
pub type AgentFactory = Arc<dyn Fn() -> Box<dyn TestingAgent> + Send + Sync>;

struct RegistryEntry {
    descriptor: AgentDescriptor,
    factory: AgentFactory,
}

/// Registration-ordered set of available agents
#[derive(Default)]
pub struct AgentRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<AgentType, usize>,
}

impl AgentRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent
    ///
    /// # Errors
    /// - `RegistryError::DuplicateAgentType` if the type is already registered
    pub fn register(
        &mut self,
        descriptor: AgentDescriptor,
        factory: AgentFactory,
    ) -> Result<(), RegistryError> {
        let agent_type = descriptor.agent_type.clone();
        if self.index.contains_key(&agent_type) {
            return Err(RegistryError::DuplicateAgentType(agent_type));
        }
        tracing::debug!(agent_type = %agent_type, "agent registered");
        self.index.insert(agent_type, self.entries.len());
        self.entries.push(RegistryEntry { descriptor, factory });
        Ok(())
    }

    /// Register a default-constructible agent under its own metadata
    ///
    /// # Errors
    /// - `RegistryError::DuplicateAgentType` if the type is already registered
    pub fn register_agent<A>(&mut self) -> Result<(), RegistryError>
    where
        A: TestingAgent + Default + 'static,
    {
        let descriptor = A::default().metadata();
        self.register(descriptor, Arc::new(|| -> Box<dyn TestingAgent> { Box::new(A::default()) }))
    }

    /// Descriptors in registration order
    #[must_use]
    pub fn list(&self) -> Vec<AgentDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Descriptor for a type
    #[must_use]
    pub fn descriptor(&self, agent_type: &AgentType) -> Option<&AgentDescriptor> {
        self.index
            .get(agent_type)
            .map(|&idx| &self.entries[idx].descriptor)
    }

    /// Factory for a type
    ///
    /// # Errors
    /// - `RegistryError::UnknownAgentType` if absent
    pub fn resolve(&self, agent_type: &AgentType) -> Result<AgentFactory, RegistryError> {
        self.index
            .get(agent_type)
            .map(|&idx| Arc::clone(&self.entries[idx].factory))
            .ok_or_else(|| RegistryError::UnknownAgentType(agent_type.clone()))
    }

    #[must_use]
    pub fn contains(&self, agent_type: &AgentType) -> bool {
        self.index.contains_key(agent_type)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.descriptor.agent_type.as_str()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use qf_model::{AgentInputs, RcaItem, Recommendation, TestCaseResult, TestData, TestScript};

    #[derive(Default)]
    struct NoopAgent;

    #[async_trait]
    impl TestingAgent for NoopAgent {
        fn metadata(&self) -> AgentDescriptor {
            AgentDescriptor::new("noop", "Noop Agent", "does nothing")
        }

        async fn generate_test_scripts(
            &self,
            _inputs: &AgentInputs,
        ) -> Result<Vec<TestScript>, AgentError> {
            Ok(Vec::new())
        }

        async fn generate_test_data(
            &self,
            _inputs: &AgentInputs,
            _scripts: &[TestScript],
        ) -> Result<TestData, AgentError> {
            Ok(TestData::new())
        }

        async fn execute_tests(
            &self,
            _scripts: &[TestScript],
            _data: &TestData,
        ) -> Result<Vec<TestCaseResult>, AgentError> {
            Ok(Vec::new())
        }

        async fn analyze_failures(
            &self,
            _failed: &[TestCaseResult],
        ) -> Result<Vec<RcaItem>, AgentError> {
            Ok(Vec::new())
        }

        async fn generate_recommendations(
            &self,
            _rca_items: &[RcaItem],
        ) -> Result<Vec<Recommendation>, AgentError> {
            Ok(Vec::new())
        }
    }

    fn factory() -> AgentFactory {
        Arc::new(|| -> Box<dyn TestingAgent> { Box::new(NoopAgent) })
    }

    #[test]
    fn list_keeps_registration_order() {
        let mut registry = AgentRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(AgentDescriptor::new(name, name, "test"), factory())
                .unwrap();
        }
        let order: Vec<String> = registry
            .list()
            .into_iter()
            .map(|d| d.agent_type.to_string())
            .collect();
        assert_eq!(order, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn duplicate_rejected() {
        let mut registry = AgentRegistry::new();
        registry.register_agent::<NoopAgent>().unwrap();
        let err = registry.register_agent::<NoopAgent>().unwrap_err();
        assert_eq!(err, RegistryError::DuplicateAgentType(AgentType::new("noop")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_builds_fresh_agents() {
        let mut registry = AgentRegistry::new();
        registry.register_agent::<NoopAgent>().unwrap();

        let factory = registry.resolve(&AgentType::new("noop")).unwrap();
        assert_eq!(factory().metadata().name, "Noop Agent");

        let err = registry.resolve(&AgentType::new("nonexistent_agent")).err().unwrap();
        assert!(matches!(err, RegistryError::UnknownAgentType(_)));
    }

    proptest! {
        #[test]
        fn first_registration_wins(names in prop::collection::vec("[a-d]{1,2}", 0..20)) {
            let mut registry = AgentRegistry::new();
            let mut expected: Vec<String> = Vec::new();
            for name in &names {
                let result = registry.register(AgentDescriptor::new(name.as_str(), name.as_str(), "test"), factory());
                if expected.contains(name) {
                    prop_assert!(matches!(result, Err(RegistryError::DuplicateAgentType(_))));
                } else {
                    prop_assert!(result.is_ok());
                    expected.push(name.clone());
                }
            }
            let listed: Vec<String> = registry.list().into_iter().map(|d| d.agent_type.to_string()).collect();
            prop_assert_eq!(listed, expected);
        }
    }
}
