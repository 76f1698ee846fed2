//! File-system result store
//!
//! Layout under the results root:
//!
//! ```text
//! <root>/<execution_id>/
//!     result.json            full record (authoritative)
//!     test_cases.json
//!     rca.json
//!     recommendations.json
//!     execution.log          one "[timestamp] [LEVEL] message" line per entry
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place, and
//! `result.json` is written last, so a directory without it is ignored.

use crate::{ResultStore, StoreError, StoreStats};
use async_trait::async_trait;
use qf_model::{ExecutionId, ExecutionRecord};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const RESULT_FILE: &str = "result.json";
const TEST_CASES_FILE: &str = "test_cases.json";
const RCA_FILE: &str = "rca.json";
const RECOMMENDATIONS_FILE: &str = "recommendations.json";
const LOG_FILE: &str = "execution.log";

/// One directory per execution under a results root
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::io_error(&root, e))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one execution's files
    #[must_use]
    pub fn execution_dir(&self, id: &ExecutionId) -> PathBuf {
        self.root.join(id.to_string())
    }

    async fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        write_atomic(&dir.join(name), &bytes).await
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .await
        .map_err(|e| StoreError::io_error(&tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::io_error(path, e))
}

#[async_trait]
impl ResultStore for FileStore {
    async fn put(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let dir = self.execution_dir(&record.execution_id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io_error(&dir, e))?;

        Self::write_json(&dir, TEST_CASES_FILE, &record.test_cases).await?;
        Self::write_json(&dir, RCA_FILE, &record.rca_items).await?;
        Self::write_json(&dir, RECOMMENDATIONS_FILE, &record.recommendations).await?;
        write_atomic(&dir.join(LOG_FILE), record.render_logs().as_bytes()).await?;
        Self::write_json(&dir, RESULT_FILE, record).await?;

        tracing::debug!(execution_id = %record.execution_id, dir = %dir.display(), "record written");
        Ok(())
    }

    async fn get(&self, id: &ExecutionId) -> Result<ExecutionRecord, StoreError> {
        let path = self.execution_dir(id).join(RESULT_FILE);
        match fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(*id)),
            Err(e) => Err(StoreError::io_error(path, e)),
        }
    }

    async fn delete(&self, id: &ExecutionId) -> Result<(), StoreError> {
        let dir = self.execution_dir(id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(*id)),
            Err(e) => Err(StoreError::io_error(dir, e)),
        }
    }

    async fn list(&self) -> Result<Vec<ExecutionId>, StoreError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::io_error(&self.root, e))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io_error(&self.root, e))?
        {
            let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<ExecutionId>().ok())
            else {
                continue;
            };
            if fs::try_exists(entry.path().join(RESULT_FILE)).await.unwrap_or(false) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let ids = self.list().await?;
        let mut total_size = 0u64;
        for id in &ids {
            let dir = self.execution_dir(id);
            let mut files = match fs::read_dir(&dir).await {
                Ok(files) => files,
                // Deleted between list and scan
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io_error(dir, e)),
            };
            while let Some(file) = files
                .next_entry()
                .await
                .map_err(|e| StoreError::io_error(&dir, e))?
            {
                if let Ok(meta) = file.metadata().await {
                    if meta.is_file() {
                        total_size += meta.len();
                    }
                }
            }
        }
        Ok(StoreStats {
            count: ids.len(),
            total_size,
        })
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qf_model::{AgentInputs, AgentType};

    #[tokio::test]
    async fn open_creates_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested").join("results");
        let store = FileStore::open(&root).await.unwrap();
        assert!(store.root().is_dir());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_skips_foreign_and_incomplete_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).await.unwrap();

        std::fs::create_dir(tmp.path().join("not-an-id")).unwrap();
        let orphan = ExecutionId::new();
        std::fs::create_dir(store.execution_dir(&orphan)).unwrap();

        let rec = ExecutionRecord::new(AgentType::new("unit_testing"), AgentInputs::new());
        store.put(&rec).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec![rec.execution_id]);
        assert!(store.get(&orphan).await.unwrap_err().is_not_found());
    }
}
