use proptest::prelude::*;
use qf_model::{AgentInputs, AgentType, ExecutionRecord, ExecutionSummary, TestCaseResult};

fn any_case() -> impl Strategy<Value = TestCaseResult> {
    (0u8..4, 0.0f64..10.0).prop_map(|(status, secs)| {
        let case = TestCaseResult::new("t", "case", "unit", "ok").with_execution_time(secs);
        match status {
            0 => case.passed(),
            1 => case.failed("assertion failed"),
            2 => case.skipped(),
            _ => case.errored("crashed"),
        }
    })
}

proptest! {
    #[test]
    fn prop_counts_partition_test_cases(cases in proptest::collection::vec(any_case(), 0..40)) {
        let mut record = ExecutionRecord::new(AgentType::new("unit_testing"), AgentInputs::new());
        record.push_test_cases(cases.clone());

        let counts = record.counts();
        prop_assert_eq!(counts.total_tests, cases.len());
        prop_assert_eq!(
            counts.passed_tests + counts.failed_tests + counts.skipped_tests + counts.error_tests,
            counts.total_tests
        );
        prop_assert_eq!(record.failed_cases().len(), counts.failures());

        let summary = ExecutionSummary::from(&record);
        prop_assert!(summary.pass_rate >= 0.0 && summary.pass_rate <= 100.0);
    }

    #[test]
    fn prop_completed_record_is_consistent(cases in proptest::collection::vec(any_case(), 0..20)) {
        let mut record = ExecutionRecord::new(AgentType::new("unit_testing"), AgentInputs::new());
        record.mark_running().unwrap();
        record.push_test_cases(cases);
        record.compute_metrics();
        record.complete().unwrap();

        prop_assert!(record.check_integrity().is_empty());
        prop_assert!(record.end_time >= record.start_time);
    }
}
