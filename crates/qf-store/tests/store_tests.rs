//! Behaviour shared by every result store backend

use pretty_assertions::assert_eq;
use qf_model::{
    AgentInputs, AgentType, ExecutionError, ExecutionRecord, RcaItem, Recommendation, Severity,
    Stage, TestCaseResult,
};
use qf_store::{FileStore, MemoryStore, ResultStore};
use serde_json::json;
use std::sync::Arc;

fn finished_record() -> ExecutionRecord {
    let inputs = AgentInputs::new()
        .with("source_code", json!("def add(a, b):\n    return a + b"))
        .with("config", json!({"strict": true}));
    let mut rec = ExecutionRecord::new(AgentType::new("unit_testing"), inputs);
    rec.mark_running().unwrap();
    rec.info("Stage 1: generate_test_scripts");
    rec.push_test_cases(vec![
        TestCaseResult::new("t1", "test_add_normal", "unit", "returns sum")
            .with_steps(["call add(1, 2)", "assert 3"])
            .with_actual("3")
            .with_execution_time(0.05),
        TestCaseResult::new("t2", "test_add_edge", "unit", "returns sum")
            .with_execution_time(0.07)
            .failed("expected 0, got -1"),
    ]);
    rec.compute_metrics();
    let rca = RcaItem::new("issue-1", "Logic Error", "expected 0, got -1", Severity::Medium)
        .affecting(["test_add_edge"]);
    rec.recommendations
        .push(Recommendation::for_rca("rec-1", &rca, "Fix edge", "code_fix", "handle negatives"));
    rec.rca_items.push(rca);
    rec.complete().unwrap();
    rec
}

async fn assert_round_trip(store: &dyn ResultStore) {
    let rec = finished_record();
    store.put(&rec).await.unwrap();
    let back = store.get(&rec.execution_id).await.unwrap();
    assert_eq!(back, rec);
    assert!(back.check_integrity().is_empty());
}

async fn assert_list_and_stats(store: &dyn ResultStore) {
    let a = finished_record();
    let b = finished_record();
    store.put(&b).await.unwrap();
    store.put(&a).await.unwrap();

    let mut expected = vec![a.execution_id, b.execution_id];
    expected.sort();
    assert_eq!(store.list().await.unwrap(), expected);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.count, 2);
    assert!(stats.total_size > 0);

    store.delete(&a.execution_id).await.unwrap();
    assert_eq!(store.list().await.unwrap(), vec![b.execution_id]);
    assert_eq!(store.stats().await.unwrap().count, 1);
}

#[tokio::test]
async fn memory_round_trip() {
    assert_round_trip(&MemoryStore::new()).await;
}

#[tokio::test]
async fn file_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    assert_round_trip(&FileStore::open(tmp.path()).await.unwrap()).await;
}

#[tokio::test]
async fn memory_list_and_stats() {
    assert_list_and_stats(&MemoryStore::new()).await;
}

#[tokio::test]
async fn file_list_and_stats() {
    let tmp = tempfile::tempdir().unwrap();
    assert_list_and_stats(&FileStore::open(tmp.path()).await.unwrap()).await;
}

#[tokio::test]
async fn failed_record_round_trips_with_error() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::open(tmp.path()).await.unwrap();

    let mut rec = ExecutionRecord::new(AgentType::new("load_testing"), AgentInputs::new());
    rec.mark_running().unwrap();
    rec.fail(ExecutionError::stage(Stage::GenerateTestData, "no endpoints reachable"))
        .unwrap();
    store.put(&rec).await.unwrap();

    assert_eq!(store.get(&rec.execution_id).await.unwrap(), rec);
}

#[tokio::test]
async fn file_layout_has_per_section_files() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::open(tmp.path()).await.unwrap();
    let rec = finished_record();
    store.put(&rec).await.unwrap();

    let dir = store.execution_dir(&rec.execution_id);
    for name in [
        "result.json",
        "test_cases.json",
        "rca.json",
        "recommendations.json",
        "execution.log",
    ] {
        assert!(dir.join(name).is_file(), "missing {name}");
    }

    let cases: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.join("test_cases.json")).unwrap()).unwrap();
    assert_eq!(cases.as_array().unwrap().len(), 2);

    let log = std::fs::read_to_string(dir.join("execution.log")).unwrap();
    assert!(log.contains("[INFO] Stage 1: generate_test_scripts"));
}

#[tokio::test]
async fn concurrent_writes_to_distinct_ids() {
    let tmp = tempfile::tempdir().unwrap();
    let store: Arc<dyn ResultStore> = Arc::new(FileStore::open(tmp.path()).await.unwrap());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let rec = finished_record();
                store.put(&rec).await.unwrap();
                rec
            })
        })
        .collect();

    for handle in handles {
        let rec = handle.await.unwrap();
        assert_eq!(store.get(&rec.execution_id).await.unwrap(), rec);
    }
    assert_eq!(store.list().await.unwrap().len(), 16);
}
