//! Batch orchestration
//!
//! Submits several `(agent_type, inputs)` items as one logical batch on top
//! of the execution manager. Parallel batches submit everything at once and
//! compete for the manager's slots like any other submission. Sequential
//! batches wait for each item to settle before submitting the next.

use crate::error::OrchestratorError;
use crate::manager::ExecutionManager;
use qf_model::{AgentInputs, AgentType, ExecutionId, ExecutionStatus};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// One batch member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub agent_type: AgentType,
    #[serde(default)]
    pub inputs: AgentInputs,
}

impl BatchItem {
    #[must_use]
    pub fn new(agent_type: impl Into<AgentType>, inputs: AgentInputs) -> Self {
        Self {
            agent_type: agent_type.into(),
            inputs,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Batch submission request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
    /// Submit all items without waiting on each other
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Sequential only: keep going after a FAILED item or rejected submission
    #[serde(default = "default_true")]
    pub continue_on_failure: bool,
}

impl BatchRequest {
    /// Parallel batch, continuing past failures
    #[must_use]
    pub fn new(items: Vec<BatchItem>) -> Self {
        Self {
            items,
            parallel: true,
            continue_on_failure: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    #[inline]
    #[must_use]
    pub fn stop_on_failure(mut self) -> Self {
        self.continue_on_failure = false;
        self
    }
}

/// A submitted member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Position in the request
    pub index: usize,
    pub agent_type: AgentType,
    pub execution_id: ExecutionId,
}

/// A member refused at submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRejection {
    pub index: usize,
    pub agent_type: AgentType,
    pub error: String,
}

/// Per-member result of a batch
///
/// `agent_type` does not identify an execution: a batch may name the same
/// type more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub executions: Vec<BatchEntry>,
    pub rejected: Vec<BatchRejection>,
    /// Items were left unsubmitted: a sequential batch stopped after a
    /// failure, or the batch was interrupted
    pub halted: bool,
}

impl BatchOutcome {
    /// `(agent_type, execution_id)` pairs in submission order
    #[must_use]
    pub fn mapping(&self) -> Vec<(AgentType, ExecutionId)> {
        self.executions
            .iter()
            .map(|e| (e.agent_type.clone(), e.execution_id))
            .collect()
    }

    #[must_use]
    pub fn execution_ids(&self) -> Vec<ExecutionId> {
        self.executions.iter().map(|e| e.execution_id).collect()
    }

    fn reject(&mut self, index: usize, agent_type: AgentType, error: &OrchestratorError) {
        self.rejected.push(BatchRejection {
            index,
            agent_type,
            error: error.to_string(),
        });
    }
}

/// Fans batches out over an [`ExecutionManager`]
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    manager: ExecutionManager,
}

impl BatchOrchestrator {
    #[must_use]
    pub fn new(manager: ExecutionManager) -> Self {
        Self { manager }
    }

    #[must_use]
    pub fn manager(&self) -> &ExecutionManager {
        &self.manager
    }

    /// Submit a batch
    ///
    /// Submission errors are reported per item and never abort a parallel
    /// batch.
    pub async fn execute_batch(&self, request: BatchRequest) -> BatchOutcome {
        self.execute_batch_until(request, &CancellationToken::new()).await
    }

    /// Submit a batch, stopping early once `stop` is cancelled
    ///
    /// On stop no further item is submitted, members already submitted are
    /// cancelled, and the outcome is marked halted if items were left over.
    /// A sequential batch still waits for the member it was awaiting to settle.
    pub async fn execute_batch_until(
        &self,
        request: BatchRequest,
        stop: &CancellationToken,
    ) -> BatchOutcome {
        let BatchRequest {
            items,
            parallel,
            continue_on_failure,
        } = request;
        let total = items.len();
        tracing::info!(total, parallel, continue_on_failure, "batch submitted");

        let outcome = if parallel {
            self.submit_parallel(items, stop).await
        } else {
            self.submit_sequential(items, continue_on_failure, stop).await
        };

        tracing::info!(
            submitted = outcome.executions.len(),
            rejected = outcome.rejected.len(),
            halted = outcome.halted,
            "batch dispatched"
        );
        outcome
    }

    async fn submit_parallel(&self, items: Vec<BatchItem>, stop: &CancellationToken) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (index, item) in items.into_iter().enumerate() {
            if stop.is_cancelled() {
                outcome.halted = true;
                break;
            }
            match self.manager.submit(item.agent_type.clone(), item.inputs).await {
                Ok(execution_id) => outcome.executions.push(BatchEntry {
                    index,
                    agent_type: item.agent_type,
                    execution_id,
                }),
                Err(err) => {
                    tracing::warn!(index, agent_type = %item.agent_type, %err, "batch item rejected");
                    outcome.reject(index, item.agent_type, &err);
                }
            }
        }
        if stop.is_cancelled() {
            tracing::warn!("batch interrupted; cancelling submitted members");
            for entry in &outcome.executions {
                self.cancel_member(&entry.execution_id).await;
            }
        }
        outcome
    }

    async fn submit_sequential(
        &self,
        items: Vec<BatchItem>,
        continue_on_failure: bool,
        stop: &CancellationToken,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let total = items.len();

        for (index, item) in items.into_iter().enumerate() {
            if stop.is_cancelled() {
                tracing::warn!(index, "batch interrupted before submission");
                outcome.halted = true;
                break;
            }
            let execution_id = match self.manager.submit(item.agent_type.clone(), item.inputs).await {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(index, agent_type = %item.agent_type, %err, "batch item rejected");
                    outcome.reject(index, item.agent_type, &err);
                    if continue_on_failure {
                        continue;
                    }
                    outcome.halted = index + 1 < total;
                    break;
                }
            };
            outcome.executions.push(BatchEntry {
                index,
                agent_type: item.agent_type,
                execution_id,
            });

            let settled = tokio::select! {
                result = self.manager.wait_for_completion(&execution_id) => result,
                () = stop.cancelled() => {
                    tracing::warn!(%execution_id, "batch interrupted; cancelling awaited member");
                    self.cancel_member(&execution_id).await;
                    self.manager.wait_for_completion(&execution_id).await
                }
            };
            let status = match settled {
                Ok(record) => record.status,
                Err(err) => {
                    tracing::warn!(%execution_id, %err, "batch item vanished before completion");
                    continue;
                }
            };
            if stop.is_cancelled() {
                outcome.halted = index + 1 < total;
                break;
            }
            if status == ExecutionStatus::Failed && !continue_on_failure {
                tracing::warn!(%execution_id, "batch halted after failed item");
                outcome.halted = index + 1 < total;
                break;
            }
        }
        outcome
    }

    async fn cancel_member(&self, execution_id: &ExecutionId) {
        if let Err(err) = self.manager.cancel(execution_id).await {
            tracing::warn!(%execution_id, %err, "batch member could not be cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_from_json() {
        let request: BatchRequest = serde_json::from_value(json!({
            "items": [{"agent_type": "unit_testing"}]
        }))
        .unwrap();
        assert!(request.parallel);
        assert!(request.continue_on_failure);
        assert!(request.items[0].inputs.is_empty());
    }

    #[test]
    fn builder_flags() {
        let request = BatchRequest::new(vec![]).sequential().stop_on_failure();
        assert!(!request.parallel);
        assert!(!request.continue_on_failure);
    }

    #[test]
    fn mapping_keeps_duplicates() {
        let a = ExecutionId::new();
        let b = ExecutionId::new();
        let outcome = BatchOutcome {
            executions: vec![
                BatchEntry { index: 0, agent_type: "unit_testing".into(), execution_id: a },
                BatchEntry { index: 1, agent_type: "unit_testing".into(), execution_id: b },
            ],
            ..BatchOutcome::default()
        };
        assert_eq!(outcome.mapping().len(), 2);
        assert_eq!(outcome.execution_ids(), vec![a, b]);
    }
}
