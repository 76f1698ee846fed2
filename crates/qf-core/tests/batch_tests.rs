//! Batch orchestration over the execution manager

use qf_core::{BatchItem, BatchOrchestrator, BatchRequest};
use qf_model::{AgentInputs, ExecutionStatus, Stage};
use qf_test_utils::{setup_manager, test_config, StubAgent};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const LONG: Duration = Duration::from_secs(30);

fn items(types: &[&str]) -> Vec<BatchItem> {
    types
        .iter()
        .map(|t| BatchItem::new(*t, AgentInputs::new()))
        .collect()
}

/// Sequential, stop on failure: item 2 fails, item 3 is never submitted.
#[tokio::test]
async fn sequential_batch_halts_after_failure() {
    let first = StubAgent::new("first");
    let second = StubAgent::new("second").failing_at(Stage::GenerateTestData);
    let third = StubAgent::new("third");
    let (manager, store) = setup_manager(test_config(4, LONG), [first, second, third.clone()]);
    let batch = BatchOrchestrator::new(manager.clone());

    let request = BatchRequest::new(items(&["first", "second", "third"]))
        .sequential()
        .stop_on_failure();
    let outcome = batch.execute_batch(request).await;

    let types: Vec<String> = outcome
        .mapping()
        .into_iter()
        .map(|(t, _)| t.to_string())
        .collect();
    assert_eq!(types, vec!["first", "second"]);
    assert!(outcome.halted);
    assert!(outcome.rejected.is_empty());
    assert!(third.calls().is_empty());
    assert_eq!(store.len(), 2);

    let statuses: Vec<ExecutionStatus> = {
        let mut out = Vec::new();
        for id in outcome.execution_ids() {
            out.push(manager.get_status(&id).await.unwrap());
        }
        out
    };
    assert_eq!(statuses, vec![ExecutionStatus::Completed, ExecutionStatus::Failed]);
}

#[tokio::test]
async fn sequential_batch_continues_past_failure() {
    let ok = StubAgent::new("ok");
    let bad = StubAgent::new("bad").failing_at(Stage::ExecuteTests);
    let (manager, _store) = setup_manager(test_config(4, LONG), [ok, bad]);
    let batch = BatchOrchestrator::new(manager.clone());

    let outcome = batch
        .execute_batch(BatchRequest::new(items(&["ok", "bad", "ok"])).sequential())
        .await;

    assert_eq!(outcome.executions.len(), 3);
    assert!(!outcome.halted);

    // Each item settled before the next was submitted
    let mut previous_end = None;
    for id in outcome.execution_ids() {
        let record = manager.get_result(&id).await.unwrap();
        assert!(record.status.is_terminal());
        if let Some(end) = previous_end {
            assert!(record.created_at >= end);
        }
        previous_end = record.end_time;
    }
}

#[tokio::test]
async fn sequential_stop_on_rejected_submission() {
    let (manager, _store) = setup_manager(test_config(2, LONG), [StubAgent::new("ok")]);
    let batch = BatchOrchestrator::new(manager);

    let outcome = batch
        .execute_batch(
            BatchRequest::new(items(&["ok", "nonexistent_agent", "ok"]))
                .sequential()
                .stop_on_failure(),
        )
        .await;

    assert_eq!(outcome.executions.len(), 1);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].index, 1);
    assert!(outcome.halted);
}

#[tokio::test]
async fn parallel_batch_reports_rejections_per_item() {
    let (manager, _store) = setup_manager(test_config(4, LONG), [StubAgent::new("ok")]);
    let batch = BatchOrchestrator::new(manager.clone());

    let outcome = batch
        .execute_batch(BatchRequest::new(items(&["ok", "nonexistent_agent", "ok"])).stop_on_failure())
        .await;

    assert_eq!(outcome.executions.len(), 2);
    assert_eq!(outcome.executions[0].index, 0);
    assert_eq!(outcome.executions[1].index, 2);
    assert_eq!(outcome.rejected.len(), 1);
    assert!(outcome.rejected[0].error.contains("unknown agent type"));
    assert!(!outcome.halted);

    for id in outcome.execution_ids() {
        let record = manager.wait_for_completion(&id).await.unwrap();
        assert_eq!(record.status, ExecutionStatus::Completed);
    }
}

/// Parallel members run regardless of each other's outcome.
#[tokio::test]
async fn parallel_batch_does_not_wait_or_halt() {
    let slow = StubAgent::new("slow").with_stage_delay(Duration::from_millis(50));
    let bad = StubAgent::new("bad").failing_at(Stage::GenerateTestScripts);
    let (manager, _store) = setup_manager(test_config(4, LONG), [slow, bad]);
    let batch = BatchOrchestrator::new(manager.clone());

    let outcome = batch
        .execute_batch(BatchRequest::new(items(&["bad", "slow", "slow"])).stop_on_failure())
        .await;
    assert_eq!(outcome.executions.len(), 3);

    // Returned before the slow members finished
    let slow_id = outcome.executions[1].execution_id;
    assert!(!manager.get_status(&slow_id).await.unwrap().is_terminal());

    let mut statuses = Vec::new();
    for id in outcome.execution_ids() {
        statuses.push(manager.wait_for_completion(&id).await.unwrap().status);
    }
    assert_eq!(
        statuses,
        vec![
            ExecutionStatus::Failed,
            ExecutionStatus::Completed,
            ExecutionStatus::Completed
        ]
    );
}

#[tokio::test]
async fn duplicate_agent_types_get_distinct_ids() {
    let (manager, _store) = setup_manager(test_config(4, LONG), [StubAgent::new("ok")]);
    let batch = BatchOrchestrator::new(manager);

    let outcome = batch
        .execute_batch(BatchRequest::new(items(&["ok", "ok"])))
        .await;

    let ids = outcome.execution_ids();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

/// Stopping a sequential batch cancels the awaited member and submits nothing more.
#[tokio::test]
async fn sequential_batch_stops_when_interrupted() {
    let slow = StubAgent::new("slow").with_stage_delay(Duration::from_millis(100));
    let next = StubAgent::new("next");
    let (manager, store) = setup_manager(test_config(4, LONG), [slow, next.clone()]);
    let batch = BatchOrchestrator::new(manager.clone());

    let stop = CancellationToken::new();
    let trigger = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let request = BatchRequest::new(items(&["slow", "next"])).sequential();
    let outcome = batch.execute_batch_until(request, &stop).await;

    assert_eq!(outcome.executions.len(), 1);
    assert!(outcome.halted);
    assert!(next.calls().is_empty());
    assert_eq!(store.len(), 1);
    let id = outcome.executions[0].execution_id;
    assert_eq!(manager.get_status(&id).await.unwrap(), ExecutionStatus::Cancelled);
    assert_eq!(manager.live_count(), 0);
}

#[tokio::test]
async fn parallel_batch_stopped_up_front_submits_nothing() {
    let (manager, store) = setup_manager(test_config(4, LONG), [StubAgent::new("a")]);
    let batch = BatchOrchestrator::new(manager);

    let stop = CancellationToken::new();
    stop.cancel();
    let outcome = batch
        .execute_batch_until(BatchRequest::new(items(&["a", "a"])), &stop)
        .await;

    assert!(outcome.executions.is_empty());
    assert!(outcome.halted);
    assert!(store.is_empty());
}
