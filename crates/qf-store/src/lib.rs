//! Result store for execution records
//!
//! The orchestrator persists records through the [`ResultStore`] contract,
//! keyed by [`ExecutionId`]. Writes for distinct ids never contend on a
//! shared lock.
//!
//! Two backends:
//!
//! - [`MemoryStore`]: sharded in-process map, for tests and embedding
//! - [`FileStore`]: one directory per execution under a results root
//!
//! # Example
//!
//! ```rust,ignore
//! use qf_store::{FileStore, ResultStore};
//!
//! let store = FileStore::open("test_results").await?;
//! store.put(&record).await?;
//! let back = store.get(&record.execution_id).await?;
//! assert_eq!(back, record);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod file;
pub mod memory;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use qf_model::{ExecutionId, ExecutionRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate store usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of stored records
    pub count: usize,
    /// Bytes occupied by stored records
    pub total_size: u64,
}

/// Key-value persistence for execution records
#[async_trait]
pub trait ResultStore: Send + Sync + fmt::Debug {
    /// Insert or replace the record under its `execution_id`
    async fn put(&self, record: &ExecutionRecord) -> Result<(), StoreError>;

    /// Fetch a record; [`StoreError::NotFound`] when absent
    async fn get(&self, id: &ExecutionId) -> Result<ExecutionRecord, StoreError>;

    /// Remove a record; [`StoreError::NotFound`] when absent
    async fn delete(&self, id: &ExecutionId) -> Result<(), StoreError>;

    /// Stored ids in ascending order; creation order for ids made by one process
    async fn list(&self) -> Result<Vec<ExecutionId>, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Backend name for diagnostics
    fn backend(&self) -> &'static str;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
