//! QualityForce orchestrator
//!
//! Turns requests to run testing agents into tracked, concurrently executing
//! units of work with bounded concurrency, cancellation and timeouts.
//!
//! # Architecture
//!
//! ```text
//!   BatchOrchestrator ──► ExecutionManager ──► AgentRegistry ──► TestingAgent
//!                               │
//!                               ├── ExecutionSlots (global concurrency gate)
//!                               └── ResultStore (terminal records)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use qf_core::prelude::*;
//! use std::sync::Arc;
//!
//! let manager = ExecutionManager::new(
//!     OrchestratorConfig::new().with_max_agents(4),
//!     Arc::new(registry),
//!     Arc::new(MemoryStore::new()),
//! )?;
//! let id = manager.submit("unit_testing", inputs).await?;
//! let record = manager.wait_for_completion(&id).await?;
//! println!("{} tests, status {}", record.counts().total_tests, record.status);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod agent;
pub mod batch;
pub mod config;
pub mod error;
pub mod manager;
pub mod registry;
pub mod slots;

pub use agent::TestingAgent;
pub use batch::{BatchEntry, BatchItem, BatchOrchestrator, BatchOutcome, BatchRejection, BatchRequest};
pub use config::OrchestratorConfig;
pub use error::{AgentError, ConfigError, OrchestratorError, RegistryError};
pub use manager::ExecutionManager;
pub use registry::{AgentFactory, AgentRegistry};
pub use slots::{ExecutionSlots, SlotPermit, SlotStats};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::{
        AgentError, AgentRegistry, BatchItem, BatchOrchestrator, BatchRequest, ExecutionManager,
        OrchestratorConfig, OrchestratorError, TestingAgent,
    };
    pub use qf_model::{AgentInputs, AgentType, ExecutionId, ExecutionRecord, ExecutionStatus};
    pub use qf_store::{FileStore, MemoryStore, ResultStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
