//! In-memory result store

use crate::{ResultStore, StoreError, StoreStats};
use async_trait::async_trait;
use dashmap::DashMap;
use qf_model::{ExecutionId, ExecutionRecord};

/// Records held as serialized JSON in a sharded map
///
/// Keeping the encoded form means reads return a fresh copy and size
/// accounting matches what a persistent backend would write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<ExecutionId, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &ExecutionId) -> bool {
        self.records.contains_key(id)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn put(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(record)?;
        self.records.insert(record.execution_id, encoded);
        Ok(())
    }

    async fn get(&self, id: &ExecutionId) -> Result<ExecutionRecord, StoreError> {
        let entry = self.records.get(id).ok_or(StoreError::NotFound(*id))?;
        Ok(serde_json::from_slice(entry.value())?)
    }

    async fn delete(&self, id: &ExecutionId) -> Result<(), StoreError> {
        self.records
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(*id))
    }

    async fn list(&self) -> Result<Vec<ExecutionId>, StoreError> {
        let mut ids: Vec<ExecutionId> = self.records.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let total_size = self
            .records
            .iter()
            .map(|entry| entry.value().len() as u64)
            .sum();
        Ok(StoreStats {
            count: self.records.len(),
            total_size,
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qf_model::{AgentInputs, AgentType};

    fn record() -> ExecutionRecord {
        ExecutionRecord::new(AgentType::new("unit_testing"), AgentInputs::new())
    }

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryStore::new();
        let rec = record();

        store.put(&rec).await.unwrap();
        assert!(store.contains(&rec.execution_id));
        assert_eq!(store.get(&rec.execution_id).await.unwrap(), rec);

        store.delete(&rec.execution_id).await.unwrap();
        assert!(store.get(&rec.execution_id).await.unwrap_err().is_not_found());
        assert!(store.delete(&rec.execution_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn put_replaces_existing() {
        let store = MemoryStore::new();
        let mut rec = record();
        store.put(&rec).await.unwrap();

        rec.mark_running().unwrap();
        store.put(&rec).await.unwrap();

        assert_eq!(store.len(), 1);
        let back = store.get(&rec.execution_id).await.unwrap();
        assert_eq!(back.status, rec.status);
    }

    #[tokio::test]
    async fn stats_track_encoded_size() {
        let store = MemoryStore::new();
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());

        let rec = record();
        let expected = serde_json::to_vec(&rec).unwrap().len() as u64;
        store.put(&rec).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_size, expected);
    }
}
