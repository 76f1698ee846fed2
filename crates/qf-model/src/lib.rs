//! QualityForce data model
//!
//! Plain, serializable types shared by every other crate:
//!
//! - [`ExecutionRecord`]: the tracked state of one agent run
//! - [`ExecutionStatus`]: the run's lifecycle, guarded by [`status::validate_transition`]
//! - [`TestCaseResult`], [`RcaItem`], [`Recommendation`]: agent outputs per stage
//! - [`AgentDescriptor`]: catalog entry describing a registered agent
//! - result sub-views (`views`) served to front-door callers
//!
//! # Example
//!
//! ```rust,ignore
//! use qf_model::{AgentInputs, AgentType, ExecutionRecord};
//!
//! let mut record = ExecutionRecord::new(AgentType::new("unit_testing"), AgentInputs::new());
//! record.mark_running()?;
//! record.complete()?;
//! assert!(record.status.is_terminal());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod descriptor;
pub mod error;
pub mod ids;
pub mod inputs;
pub mod record;
pub mod results;
pub mod status;
pub mod views;

pub use descriptor::AgentDescriptor;
pub use error::ModelError;
pub use ids::{AgentType, ExecutionId};
pub use inputs::{AgentInputs, TestData, TestScript};
pub use record::{
    ErrorKind, ExecutionError, ExecutionRecord, IntegrityViolation, LogEntry, LogLevel, Stage,
    TestCounts,
};
pub use results::{CodeChange, Priority, RcaItem, Recommendation, Severity, TestCaseResult, TestStatus};
pub use status::ExecutionStatus;
pub use views::{ExecutionSummary, IssueTotals, RcaView, RecommendationsView, TestCasesView};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
