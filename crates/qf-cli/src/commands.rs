//! Subcommand handlers

use crate::inputs::collect_inputs;
use crate::output::{self, View};
use anyhow::Context;
use clap::ArgMatches;
use qf_core::{BatchItem, BatchOrchestrator, BatchRequest, ExecutionManager, OrchestratorConfig};
use qf_model::{ExecutionId, ExecutionRecord, ExecutionStatus};
use qf_store::{FileStore, ResultStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Command ran but an execution did not complete or a member was rejected
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::FAILURE,
        }
    }
}

/// Configuration with command line overrides applied
///
/// # Errors
/// Config file, environment or override values that fail validation.
pub fn resolve_config(matches: &ArgMatches) -> anyhow::Result<OrchestratorConfig> {
    let path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);
    let mut config = OrchestratorConfig::load(path).context("failed to load configuration")?;
    if let Some(dir) = matches.get_one::<PathBuf>("results-dir") {
        config.results_dir.clone_from(dir);
    }
    if let Some(&max) = matches.get_one::<usize>("max-agents") {
        config.max_concurrent_agents = max;
    }
    if let Some(&secs) = matches.get_one::<f64>("timeout") {
        config.execution_timeout = secs;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Manager over the built-in agents and a file store
pub struct App {
    manager: ExecutionManager,
    store: Arc<FileStore>,
}

impl App {
    /// # Errors
    /// Store directory cannot be created, or the manager rejects `config`.
    pub async fn open(config: OrchestratorConfig) -> anyhow::Result<Self> {
        let store = Arc::new(
            FileStore::open(&config.results_dir)
                .await
                .with_context(|| format!("failed to open result store at {}", config.results_dir.display()))?,
        );
        let registry = Arc::new(qf_agents::builtin_registry()?);
        let manager = ExecutionManager::new(config, registry, store.clone())?;
        Ok(Self { manager, store })
    }

    #[must_use]
    pub fn manager(&self) -> &ExecutionManager {
        &self.manager
    }

    #[must_use]
    pub fn results_dir(&self) -> &Path {
        self.store.root()
    }
}

/// Dispatch the selected subcommand, writing its report to `out`
///
/// # Errors
/// Submission rejections, lookups of unknown executions, store and output failures.
pub async fn execute(matches: &ArgMatches, out: &mut impl Write) -> anyhow::Result<Outcome> {
    let app = App::open(resolve_config(matches)?).await?;
    match matches.subcommand() {
        Some(("agents", args)) => agents(&app, args.get_flag("json"), out),
        Some(("run", args)) => run(&app, args, out).await,
        Some(("batch", args)) => batch(&app, args, out).await,
        Some(("result", args)) => {
            let id = required_id(args)?;
            let view = args.get_one::<View>("view").copied().unwrap_or(View::Full);
            let record = app.manager.get_result(&id).await?;
            writeln!(out, "{}", output::render_view(&record, view)?)?;
            Ok(Outcome::Success)
        }
        Some(("list", _)) => list(&app, out).await,
        Some(("delete", args)) => {
            let id = required_id(args)?;
            app.manager.delete(&id).await?;
            writeln!(out, "deleted {id}")?;
            Ok(Outcome::Success)
        }
        Some(("stats", _)) => {
            let stats = app.manager.storage_stats().await?;
            let report = output::stats_report(app.store.backend(), stats, app.manager.slot_stats());
            write!(out, "{report}")?;
            Ok(Outcome::Success)
        }
        Some((other, _)) => anyhow::bail!("unknown command '{other}'"),
        None => anyhow::bail!("no command given"),
    }
}

fn required_id(args: &ArgMatches) -> anyhow::Result<ExecutionId> {
    args.get_one::<ExecutionId>("id")
        .copied()
        .context("missing execution id")
}

fn agents(app: &App, json: bool, out: &mut impl Write) -> anyhow::Result<Outcome> {
    let agents = app.manager.registry().list();
    if json {
        writeln!(out, "{}", output::to_json(&agents)?)?;
    } else {
        write!(out, "{}", output::agents_table(&agents))?;
    }
    Ok(Outcome::Success)
}

fn shared_inputs(args: &ArgMatches) -> anyhow::Result<qf_model::AgentInputs> {
    let file = args.get_one::<PathBuf>("inputs-file").map(PathBuf::as_path);
    let assignments = args
        .get_many::<String>("input")
        .into_iter()
        .flatten()
        .map(String::as_str);
    collect_inputs(file, assignments)
}

fn outcome_of(status: ExecutionStatus) -> Outcome {
    if status == ExecutionStatus::Completed {
        Outcome::Success
    } else {
        Outcome::Failure
    }
}

/// Token cancelled on the first Ctrl-C; the listener stops when dropped
struct Interrupt {
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl Interrupt {
    fn listen() -> Self {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling executions");
                trigger.cancel();
            }
        });
        Self { token, listener }
    }
}

impl Drop for Interrupt {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Wait for `id` to settle; once `stop` fires every live execution is cancelled
pub(crate) async fn settle(
    manager: &ExecutionManager,
    id: &ExecutionId,
    stop: &CancellationToken,
) -> anyhow::Result<ExecutionRecord> {
    tokio::select! {
        record = manager.wait_for_completion(id) => Ok(record?),
        () = stop.cancelled() => {
            manager.shutdown();
            Ok(manager.wait_for_completion(id).await?)
        }
    }
}

async fn run(app: &App, args: &ArgMatches, out: &mut impl Write) -> anyhow::Result<Outcome> {
    let agent_type = args.get_one::<String>("agent").context("missing --agent")?;
    let inputs = shared_inputs(args)?;

    let id = app.manager.submit(agent_type.as_str(), inputs).await?;
    tracing::info!(execution_id = %id, agent_type = %agent_type, "submitted");

    let interrupt = Interrupt::listen();
    let record = settle(&app.manager, &id, &interrupt.token).await?;
    writeln!(out, "{}", output::render_view(&record, View::Summary)?)?;
    Ok(outcome_of(record.status))
}

async fn batch(app: &App, args: &ArgMatches, out: &mut impl Write) -> anyhow::Result<Outcome> {
    let inputs = shared_inputs(args)?;
    let items = args
        .get_many::<String>("agent")
        .into_iter()
        .flatten()
        .map(|agent_type| BatchItem::new(agent_type.as_str(), inputs.clone()))
        .collect();

    let mut request = BatchRequest::new(items);
    if args.get_flag("sequential") {
        request = request.sequential();
    }
    if args.get_flag("stop-on-failure") {
        request = request.stop_on_failure();
    }

    let interrupt = Interrupt::listen();
    run_batch(app, request, &interrupt.token, out).await
}

/// Dispatch `request`, wait for every member and report; `stop` interrupts the whole batch
pub(crate) async fn run_batch(
    app: &App,
    request: BatchRequest,
    stop: &CancellationToken,
    out: &mut impl Write,
) -> anyhow::Result<Outcome> {
    let orchestrator = BatchOrchestrator::new(app.manager.clone());
    let outcome = orchestrator.execute_batch_until(request, stop).await;

    let mut records = Vec::with_capacity(outcome.executions.len());
    for entry in &outcome.executions {
        records.push(settle(&app.manager, &entry.execution_id, stop).await?);
    }
    write!(out, "{}", output::batch_report(&outcome, &records))?;

    let all_completed = records.iter().all(|r| r.status == ExecutionStatus::Completed);
    Ok(if all_completed && outcome.rejected.is_empty() && !outcome.halted {
        Outcome::Success
    } else {
        Outcome::Failure
    })
}

async fn list(app: &App, out: &mut impl Write) -> anyhow::Result<Outcome> {
    let ids = app.manager.list().await?;
    if ids.is_empty() {
        writeln!(out, "no executions in {}", app.results_dir().display())?;
        return Ok(Outcome::Success);
    }
    for id in ids {
        let record = app.manager.get_result(&id).await?;
        writeln!(out, "{}", output::record_line(&record))?;
    }
    Ok(Outcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qf_model::AgentInputs;
    use serde_json::json;

    async fn app(dir: &tempfile::TempDir) -> App {
        App::open(OrchestratorConfig::new().with_results_dir(dir.path()))
            .await
            .unwrap()
    }

    fn load_items(n: usize) -> Vec<BatchItem> {
        let inputs = AgentInputs::new().with("endpoints", json!(["/search"]));
        (0..n).map(|_| BatchItem::new("load_testing", inputs.clone())).collect()
    }

    #[tokio::test]
    async fn interrupted_batch_submits_nothing_and_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = app(&dir).await;
        let stop = CancellationToken::new();
        stop.cancel();

        let mut out = Vec::new();
        let request = BatchRequest::new(load_items(2)).sequential();
        let outcome = run_batch(&app, request, &stop, &mut out).await.unwrap();

        assert_eq!(outcome, Outcome::Failure);
        assert!(String::from_utf8(out).unwrap().contains("batch halted"));
        assert!(app.manager().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn uninterrupted_batch_settles_every_member() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = app(&dir).await;

        let mut out = Vec::new();
        let outcome = run_batch(&app, BatchRequest::new(load_items(2)), &CancellationToken::new(), &mut out)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
        assert_eq!(app.manager().live_count(), 0);
    }
}
