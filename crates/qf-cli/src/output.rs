//! Text and JSON rendering for command output

use anyhow::Context;
use clap::ValueEnum;
use qf_core::{BatchOutcome, SlotStats};
use qf_model::{
    AgentDescriptor, ExecutionRecord, ExecutionSummary, RcaView, RecommendationsView,
    TestCasesView,
};
use qf_store::StoreStats;
use serde::Serialize;
use std::fmt::Write as _;

/// Projection of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    Full,
    Tests,
    Rca,
    Recommendations,
    Summary,
}

/// Pretty-printed JSON
///
/// # Errors
/// `value` cannot be serialized.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("failed to render JSON")
}

/// Render `record` in the requested projection
///
/// # Errors
/// The projection cannot be serialized.
pub fn render_view(record: &ExecutionRecord, view: View) -> anyhow::Result<String> {
    match view {
        View::Full => to_json(record),
        View::Tests => to_json(&TestCasesView::from(record)),
        View::Rca => to_json(&RcaView::from(record)),
        View::Recommendations => to_json(&RecommendationsView::from(record)),
        View::Summary => to_json(&ExecutionSummary::from(record)),
    }
}

/// Agent catalog as an aligned table
#[must_use]
pub fn agents_table(agents: &[AgentDescriptor]) -> String {
    let width = agents
        .iter()
        .map(|a| a.agent_type.as_str().len())
        .max()
        .unwrap_or(0)
        .max("AGENT".len());
    let mut out = format!("{:<width$}  {:<28}  REQUIRED INPUTS\n", "AGENT", "NAME");
    for agent in agents {
        let required = if agent.required_inputs.is_empty() {
            "-".to_string()
        } else {
            agent.required_inputs.join(", ")
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:<28}  {required}",
            agent.agent_type.as_str(),
            agent.name
        );
    }
    out
}

/// One line per record: id, agent, status, tests and pass rate
#[must_use]
pub fn record_line(record: &ExecutionRecord) -> String {
    let counts = record.counts();
    format!(
        "{}  {:<20}  {:<9}  {:>4} tests  {:>6.1}% passed",
        record.execution_id,
        record.agent_type.as_str(),
        record.status.as_str(),
        counts.total_tests,
        counts.pass_rate()
    )
}

/// Summary of a finished batch; `records` follow `outcome.executions`
#[must_use]
pub fn batch_report(outcome: &BatchOutcome, records: &[ExecutionRecord]) -> String {
    let mut out = String::new();
    for (entry, record) in outcome.executions.iter().zip(records) {
        let _ = writeln!(out, "[{}] {}", entry.index, record_line(record));
    }
    for rejection in &outcome.rejected {
        let _ = writeln!(
            out,
            "[{}] {} rejected: {}",
            rejection.index,
            rejection.agent_type.as_str(),
            rejection.error
        );
    }
    if outcome.halted {
        out.push_str("batch halted; remaining members were not submitted\n");
    }
    out
}

/// Store and slot usage
#[must_use]
pub fn stats_report(backend: &str, store: StoreStats, slots: SlotStats) -> String {
    format!(
        "backend:        {backend}\nexecutions:     {}\nstored bytes:   {}\nslot capacity:  {}\n",
        store.count, store.total_size, slots.capacity
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use qf_model::{AgentInputs, AgentType, TestCaseResult};

    #[test]
    fn agents_table_aligns_columns() {
        let agents = vec![
            AgentDescriptor::new("unit_testing", "Unit Testing Agent", "x").requires(["source_code"]),
            AgentDescriptor::new("noop", "Noop", "x"),
        ];
        let table = agents_table(&agents);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("AGENT         NAME"));
        assert!(lines[1].ends_with("source_code"));
        assert!(lines[2].ends_with('-'));
    }

    #[test]
    fn views_select_record_parts() {
        let mut record = ExecutionRecord::new(AgentType::new("unit_testing"), AgentInputs::new());
        record.push_test_cases(vec![
            TestCaseResult::new("1", "a", "unit", "ok"),
            TestCaseResult::new("2", "b", "unit", "ok").failed("boom"),
        ]);

        let tests: serde_json::Value = serde_json::from_str(&render_view(&record, View::Tests).unwrap()).unwrap();
        assert_eq!(tests["total_tests"], 2);
        assert_eq!(tests["failed_tests"], 1);

        let rca: serde_json::Value = serde_json::from_str(&render_view(&record, View::Rca).unwrap()).unwrap();
        assert_eq!(rca["total_issues"], 0);

        assert!(record_line(&record).contains("50.0% passed"));
    }
}
