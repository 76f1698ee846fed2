//! Execution manager
//!
//! Runs one agent pipeline per execution as an independent tokio task:
//!
//! ```text
//! submit ──► PENDING ──(slot acquired)──► RUNNING ──► COMPLETED | FAILED | CANCELLED
//!                                          │
//!                      scripts → data → tests → analysis → recommendations
//! ```
//!
//! Cancellation and the deadline are checked at stage boundaries. A stage
//! still in flight when the deadline passes is dropped and its output
//! discarded. Agent panics are caught and recorded as failures.
//!
//! While an execution is live its record sits behind a lock readable by
//! status queries; once terminal it is persisted to the result store and the
//! live entry is dropped.

use crate::agent::TestingAgent;
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, RegistryError};
use crate::registry::AgentRegistry;
use crate::slots::{ExecutionSlots, SlotStats};
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::RwLock;
use qf_model::{
    AgentInputs, AgentType, ExecutionError, ExecutionId, ExecutionRecord, ExecutionStatus,
    LogLevel, ModelError, Stage,
};
use qf_store::{ResultStore, StoreError, StoreStats};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{error::Elapsed, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

const PERSIST_ATTEMPTS: u32 = 2;

/// One execution between submission and persistence
#[derive(Debug)]
struct LiveExecution {
    record: RwLock<ExecutionRecord>,
    cancel: CancellationToken,
    /// Published status; turns terminal only after the record is persisted
    published: watch::Sender<ExecutionStatus>,
}

impl LiveExecution {
    fn new(record: ExecutionRecord) -> Self {
        let (published, _) = watch::channel(record.status);
        Self {
            record: RwLock::new(record),
            cancel: CancellationToken::new(),
            published,
        }
    }

    fn read<R>(&self, f: impl FnOnce(&ExecutionRecord) -> R) -> R {
        f(&self.record.read())
    }

    fn update<R>(&self, f: impl FnOnce(&mut ExecutionRecord) -> R) -> R {
        f(&mut self.record.write())
    }

    fn publish(&self, status: ExecutionStatus) {
        self.published.send_replace(status);
    }

    fn is_settled(&self) -> bool {
        self.published.borrow().is_terminal()
    }
}

/// Why a pipeline stopped before its normal end
#[derive(Debug)]
enum Halt {
    Cancelled,
    Failed(ExecutionError),
}

impl From<ExecutionError> for Halt {
    fn from(error: ExecutionError) -> Self {
        Self::Failed(error)
    }
}

struct Inner {
    config: OrchestratorConfig,
    timeout: Duration,
    registry: Arc<AgentRegistry>,
    store: Arc<dyn ResultStore>,
    slots: ExecutionSlots,
    live: DashMap<ExecutionId, Arc<LiveExecution>>,
}

/// Submits, tracks, cancels and persists executions
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ExecutionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ExecutionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionManager")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .field("store", &self.inner.store.backend())
            .field("live", &self.inner.live.len())
            .finish()
    }
}

impl ExecutionManager {
    /// Create manager
    ///
    /// # Errors
    /// - `OrchestratorError::Config` if `config` fails validation
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<AgentRegistry>,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let timeout = config.timeout()?;
        Ok(Self {
            inner: Arc::new(Inner {
                slots: ExecutionSlots::new(config.max_concurrent_agents),
                config,
                timeout,
                registry,
                store,
                live: DashMap::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn registry(&self) -> &AgentRegistry {
        &self.inner.registry
    }

    /// Submit one execution
    ///
    /// Returns as soon as the PENDING record is stored; the pipeline runs in
    /// the background.
    ///
    /// # Errors
    /// - `UnknownAgentType`, `MissingInputs`, `InvalidInputs`: no record created
    /// - `Store` if the PENDING record could not be written
    pub async fn submit(
        &self,
        agent_type: impl Into<AgentType>,
        inputs: AgentInputs,
    ) -> Result<ExecutionId, OrchestratorError> {
        let agent_type = agent_type.into();
        let registry = &self.inner.registry;

        let factory = registry.resolve(&agent_type).map_err(|err| match err {
            RegistryError::UnknownAgentType(t) | RegistryError::DuplicateAgentType(t) => {
                OrchestratorError::UnknownAgentType(t)
            }
        })?;
        if let Some(descriptor) = registry.descriptor(&agent_type) {
            let missing = descriptor.missing_inputs(&inputs);
            if !missing.is_empty() {
                return Err(OrchestratorError::MissingInputs {
                    agent_type,
                    missing,
                });
            }
        }

        let agent = factory();
        agent
            .validate_inputs(&inputs)
            .map_err(|source| OrchestratorError::InvalidInputs {
                agent_type: agent_type.clone(),
                source,
            })?;

        let mut record = ExecutionRecord::new(agent_type.clone(), inputs);
        record.info(format!("Execution submitted for agent {agent_type}"));
        let id = record.execution_id;
        self.inner.store.put(&record).await?;

        let live = Arc::new(LiveExecution::new(record));
        self.inner.live.insert(id, Arc::clone(&live));

        let span = tracing::info_span!("execution", execution_id = %id, agent_type = %agent_type);
        tokio::spawn(run_pipeline(Arc::clone(&self.inner), live, agent).instrument(span));

        tracing::info!(execution_id = %id, agent_type = %agent_type, "execution submitted");
        Ok(id)
    }

    /// Current status
    ///
    /// # Errors
    /// - `UnknownExecution` if no record exists
    pub async fn get_status(&self, id: &ExecutionId) -> Result<ExecutionStatus, OrchestratorError> {
        if let Some(live) = self.live(id) {
            return Ok(live.read(|r| r.status));
        }
        Ok(self.stored(id).await?.status)
    }

    /// Full record, terminal or in progress
    ///
    /// # Errors
    /// - `UnknownExecution` if no record exists
    pub async fn get_result(&self, id: &ExecutionId) -> Result<ExecutionRecord, OrchestratorError> {
        if let Some(live) = self.live(id) {
            return Ok(live.read(Clone::clone));
        }
        self.stored(id).await
    }

    /// Request cooperative cancellation
    ///
    /// Returns `false` when the execution is already terminal (no-op).
    ///
    /// # Errors
    /// - `UnknownExecution` if no record exists
    pub async fn cancel(&self, id: &ExecutionId) -> Result<bool, OrchestratorError> {
        if let Some(live) = self.live(id) {
            if live.read(|r| r.status.is_terminal()) {
                return Ok(false);
            }
            live.cancel.cancel();
            tracing::warn!(execution_id = %id, "cancellation requested");
            return Ok(true);
        }
        self.stored(id).await.map(|_| false)
    }

    /// Wait until the execution is terminal and persisted
    ///
    /// # Errors
    /// - `UnknownExecution` if no record exists
    pub async fn wait_for_completion(
        &self,
        id: &ExecutionId,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        let receiver = self.live(id).map(|live| live.published.subscribe());
        if let Some(mut receiver) = receiver {
            if receiver.wait_for(|status| status.is_terminal()).await.is_err() {
                tracing::debug!(execution_id = %id, "status channel closed while waiting");
            }
        }
        self.get_result(id).await
    }

    /// Live and stored ids, ascending
    ///
    /// # Errors
    /// - `Store` if the store cannot be listed
    pub async fn list(&self) -> Result<Vec<ExecutionId>, OrchestratorError> {
        let mut ids = self.inner.store.list().await?;
        ids.extend(self.inner.live.iter().map(|entry| *entry.key()));
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Remove a terminal execution
    ///
    /// Also evicts a settled execution whose terminal record could not be
    /// persisted; nothing else drops it from memory.
    ///
    /// # Errors
    /// - `ExecutionInProgress` if not yet terminal and persisted
    /// - `UnknownExecution` if no record exists
    pub async fn delete(&self, id: &ExecutionId) -> Result<(), OrchestratorError> {
        let had_live = match self.live(id) {
            Some(live) if !live.is_settled() => {
                return Err(OrchestratorError::ExecutionInProgress(*id));
            }
            Some(_) => self.inner.live.remove(id).is_some(),
            None => false,
        };
        match self.inner.store.delete(id).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) if had_live => {}
            Err(StoreError::NotFound(_)) => return Err(OrchestratorError::UnknownExecution(*id)),
            Err(err) => return Err(err.into()),
        }
        tracing::info!(execution_id = %id, "execution deleted");
        Ok(())
    }

    /// Executions currently RUNNING
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner
            .live
            .iter()
            .filter(|entry| entry.value().read(|r| r.status == ExecutionStatus::Running))
            .count()
    }

    /// Executions not yet settled (pending, running, or persisting)
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.live.len()
    }

    #[must_use]
    pub fn slot_stats(&self) -> SlotStats {
        self.inner.slots.stats()
    }

    /// Result store usage
    ///
    /// # Errors
    /// - `Store` on backend failure
    pub async fn storage_stats(&self) -> Result<StoreStats, OrchestratorError> {
        Ok(self.inner.store.stats().await?)
    }

    /// Request cancellation of every live execution; returns how many were signalled
    pub fn shutdown(&self) -> usize {
        let mut signalled = 0;
        for entry in &self.inner.live {
            if !entry.value().read(|r| r.status.is_terminal()) {
                entry.value().cancel.cancel();
                signalled += 1;
            }
        }
        tracing::info!(signalled, "orchestrator shutdown requested");
        signalled
    }

    fn live(&self, id: &ExecutionId) -> Option<Arc<LiveExecution>> {
        self.inner.live.get(id).map(|entry| Arc::clone(entry.value()))
    }

    async fn stored(&self, id: &ExecutionId) -> Result<ExecutionRecord, OrchestratorError> {
        self.inner.store.get(id).await.map_err(|err| match err {
            StoreError::NotFound(id) => OrchestratorError::UnknownExecution(id),
            other => other.into(),
        })
    }
}

async fn run_pipeline(inner: Arc<Inner>, live: Arc<LiveExecution>, agent: Box<dyn TestingAgent>) {
    let permit = inner.slots.acquire().await;
    if permit.is_err() {
        // Slots closed: nothing to run, still honour the state machine
        live.cancel.cancel();
    }

    live.update(|r| {
        guard(r.mark_running());
        r.info("Execution started");
    });
    live.publish(ExecutionStatus::Running);
    tracing::info!("execution running");

    let limit = inner.timeout;
    let deadline = Instant::now().checked_add(limit);
    let outcome = drive(&live, agent.as_ref(), deadline, limit).await;

    let record = live.update(|r| {
        match outcome {
            Ok(()) => {
                r.info("Execution completed");
                guard(r.complete());
            }
            Err(Halt::Cancelled) => {
                r.warn("Execution cancelled");
                guard(r.cancel());
            }
            Err(Halt::Failed(error)) => {
                r.log(LogLevel::Error, format!("Execution failed: {error}"));
                guard(r.fail(error));
            }
        }
        r.clone()
    });
    drop(permit);

    match record.status {
        ExecutionStatus::Failed => tracing::error!(
            error = ?record.error,
            duration = ?record.duration,
            "execution failed"
        ),
        status => tracing::info!(%status, duration = ?record.duration, "execution finished"),
    }

    if persist(inner.store.as_ref(), &record).await {
        inner.live.remove(&record.execution_id);
    }
    live.publish(record.status);
}

/// Write the terminal record, retrying once
///
/// On `false` the record stays live until `delete` evicts it.
async fn persist(store: &dyn ResultStore, record: &ExecutionRecord) -> bool {
    for attempt in 1..=PERSIST_ATTEMPTS {
        match store.put(record).await {
            Ok(()) => return true,
            Err(err) if attempt < PERSIST_ATTEMPTS => {
                tracing::warn!(%err, attempt, "terminal record write failed; retrying");
            }
            Err(err) => {
                tracing::warn!(%err, "terminal record not persisted; kept in memory until deleted");
            }
        }
    }
    false
}

async fn drive(
    live: &LiveExecution,
    agent: &dyn TestingAgent,
    deadline: Option<Instant>,
    limit: Duration,
) -> Result<(), Halt> {
    let inputs = live.read(|r| r.inputs.clone());

    checkpoint(live, deadline, limit, Stage::GenerateTestScripts)?;
    let scripts = run_stage(
        Stage::GenerateTestScripts,
        deadline,
        limit,
        agent.generate_test_scripts(&inputs),
    )
    .await?;
    live.update(|r| {
        r.info(format!("Generated {} test scripts", scripts.len()));
        r.test_scripts = scripts.clone();
    });

    checkpoint(live, deadline, limit, Stage::GenerateTestData)?;
    let data = run_stage(
        Stage::GenerateTestData,
        deadline,
        limit,
        agent.generate_test_data(&inputs, &scripts),
    )
    .await?;
    live.update(|r| {
        r.info(format!("Generated test data with {} entries", data.0.len()));
        r.test_data = Some(data.clone());
    });

    checkpoint(live, deadline, limit, Stage::ExecuteTests)?;
    let cases = run_stage(
        Stage::ExecuteTests,
        deadline,
        limit,
        agent.execute_tests(&scripts, &data),
    )
    .await?;
    if let Some(case) = ExecutionRecord::find_non_finite(&cases) {
        return Err(Halt::Failed(ExecutionError::invalid_output(
            Stage::ExecuteTests,
            format!(
                "test case {} reported a non-finite execution time ({})",
                case.id, case.execution_time
            ),
        )));
    }
    live.update(|r| {
        r.push_test_cases(cases);
        r.compute_metrics();
        let counts = r.counts();
        r.info(format!(
            "Test execution completed: {} passed, {} failed, {} skipped, {} errors",
            counts.passed_tests, counts.failed_tests, counts.skipped_tests, counts.error_tests
        ));
    });

    checkpoint(live, deadline, limit, Stage::AnalyzeFailures)?;
    let failed = live.read(ExecutionRecord::failed_cases);
    if failed.is_empty() {
        live.update(|r| r.info("No failed tests, skipping failure analysis"));
    } else {
        let rca = run_stage(
            Stage::AnalyzeFailures,
            deadline,
            limit,
            agent.analyze_failures(&failed),
        )
        .await?;
        live.update(|r| {
            r.info(format!("Root cause analysis produced {} issues", rca.len()));
            r.rca_items.extend(rca);
        });
    }

    checkpoint(live, deadline, limit, Stage::GenerateRecommendations)?;
    let rca_items = live.read(|r| r.rca_items.clone());
    if rca_items.is_empty() {
        live.update(|r| r.info("No issues found, skipping recommendations"));
    } else {
        let recommendations = run_stage(
            Stage::GenerateRecommendations,
            deadline,
            limit,
            agent.generate_recommendations(&rca_items),
        )
        .await?;
        let dangling = live.read(|r| {
            r.find_dangling(&recommendations)
                .map(|rec| (rec.recommendation_id.clone(), rec.related_rca.clone()))
        });
        if let Some((recommendation_id, related_rca)) = dangling {
            return Err(Halt::Failed(ExecutionError::invalid_output(
                Stage::GenerateRecommendations,
                format!(
                    "recommendation {recommendation_id} references unknown issue {related_rca}"
                ),
            )));
        }
        live.update(|r| {
            r.info(format!("Generated {} recommendations", recommendations.len()));
            r.recommendations.extend(recommendations);
        });
    }

    Ok(())
}

/// Stage boundary: honour cancellation and the deadline, then log the stage
fn checkpoint(
    live: &LiveExecution,
    deadline: Option<Instant>,
    limit: Duration,
    stage: Stage,
) -> Result<(), Halt> {
    if live.cancel.is_cancelled() {
        tracing::warn!(%stage, "cancellation observed at stage boundary");
        return Err(Halt::Cancelled);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Err(Halt::Failed(ExecutionError::timeout(None, limit.as_secs_f64())));
    }
    live.update(|r| r.info(format!("Stage {}: {stage}", stage.number())));
    tracing::debug!(%stage, "stage started");
    Ok(())
}

/// Run one agent call under the deadline, converting every failure mode
async fn run_stage<T, F>(
    stage: Stage,
    deadline: Option<Instant>,
    limit: Duration,
    call: F,
) -> Result<T, ExecutionError>
where
    F: Future<Output = Result<T, crate::error::AgentError>>,
{
    match within(deadline, AssertUnwindSafe(call).catch_unwind()).await {
        Err(_) => {
            tracing::error!(%stage, "stage abandoned at deadline");
            Err(ExecutionError::timeout(Some(stage), limit.as_secs_f64()))
        }
        Ok(Err(panic)) => Err(ExecutionError::panic(stage, panic_message(panic.as_ref()))),
        Ok(Ok(Err(err))) => Err(ExecutionError::stage(stage, err.to_string())),
        Ok(Ok(Ok(output))) => Ok(output),
    }
}

async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Result<F::Output, Elapsed> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await,
        None => Ok(fut.await),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("agent panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("agent panicked: {s}")
    } else {
        "agent panicked".to_string()
    }
}

/// Transitions made by the owning task are always legal; log if not
fn guard(result: Result<(), ModelError>) {
    if let Err(err) = result {
        tracing::error!(%err, "record transition rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "agent panicked: boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "agent panicked: bang");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "agent panicked");
    }

    #[tokio::test]
    async fn within_without_deadline_awaits() {
        let value = within(None, async { 5 }).await.unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn within_expired_deadline_drops_pending_future() {
        let deadline = Instant::now() + Duration::from_millis(10);
        let result = within(Some(deadline), std::future::pending::<()>()).await;
        assert!(result.is_err());
    }
}
