//! Built-in QualityForce testing agents
//!
//! Seven agents covering the common testing disciplines. Outcomes are
//! simulated deterministically: every case passes unless the submission's
//! `config.simulate_failures` names it, or (for regression runs) its result
//! differs from the supplied `baseline`.
//!
//! | Agent type            | Required inputs    |
//! |-----------------------|--------------------|
//! | `unit_testing`        | `source_code`      |
//! | `functional_testing`  | `requirements_doc` |
//! | `integration_testing` | `endpoints`        |
//! | `regression_testing`  | `source_code`      |
//! | `security_testing`    | `endpoints`        |
//! | `load_testing`        | `endpoints`        |
//! | `stress_testing`      | `endpoints`        |
//!
//! # Example
//!
//! ```rust,ignore
//! use qf_agents::builtin_registry;
//! use qf_core::prelude::*;
//!
//! let registry = Arc::new(builtin_registry()?);
//! let manager = ExecutionManager::new(OrchestratorConfig::new(), registry, store)?;
//! let id = manager
//!     .submit("security_testing", AgentInputs::new().with("endpoints", json!(["/login"])))
//!     .await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod functional;
pub mod integration;
pub mod load;
pub mod regression;
pub mod security;
pub mod stress;
pub mod support;
pub mod unit;

pub use functional::FunctionalTestingAgent;
pub use integration::IntegrationTestingAgent;
pub use load::LoadTestingAgent;
pub use regression::RegressionTestingAgent;
pub use security::SecurityTestingAgent;
pub use stress::StressTestingAgent;
pub use unit::UnitTestingAgent;

use qf_core::{AgentRegistry, RegistryError};

/// Add every built-in agent to `registry`
///
/// # Errors
/// - `RegistryError::DuplicateAgentType` if one of the built-in types is
///   already registered
pub fn register_builtin_agents(registry: &mut AgentRegistry) -> Result<(), RegistryError> {
    registry.register_agent::<UnitTestingAgent>()?;
    registry.register_agent::<FunctionalTestingAgent>()?;
    registry.register_agent::<IntegrationTestingAgent>()?;
    registry.register_agent::<RegressionTestingAgent>()?;
    registry.register_agent::<SecurityTestingAgent>()?;
    registry.register_agent::<LoadTestingAgent>()?;
    registry.register_agent::<StressTestingAgent>()?;
    Ok(())
}

/// Registry holding exactly the built-in agents
///
/// # Errors
/// Never in practice; registration errors are propagated for uniformity.
pub fn builtin_registry() -> Result<AgentRegistry, RegistryError> {
    let mut registry = AgentRegistry::new();
    register_builtin_agents(&mut registry)?;
    Ok(registry)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
