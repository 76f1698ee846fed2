//! Result sub-views served to front-door callers

use crate::ids::{AgentType, ExecutionId};
use crate::record::{ExecutionError, ExecutionRecord, TestCounts};
use crate::results::{RcaItem, Recommendation, Severity, TestCaseResult};
use crate::status::ExecutionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Test cases with their status partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCasesView {
    pub execution_id: ExecutionId,
    #[serde(flatten)]
    pub counts: TestCounts,
    pub test_cases: Vec<TestCaseResult>,
}

impl From<&ExecutionRecord> for TestCasesView {
    fn from(record: &ExecutionRecord) -> Self {
        Self {
            execution_id: record.execution_id,
            counts: record.counts(),
            test_cases: record.test_cases.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcaView {
    pub execution_id: ExecutionId,
    pub total_issues: usize,
    pub rca_items: Vec<RcaItem>,
}

impl From<&ExecutionRecord> for RcaView {
    fn from(record: &ExecutionRecord) -> Self {
        Self {
            execution_id: record.execution_id,
            total_issues: record.rca_items.len(),
            rca_items: record.rca_items.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationsView {
    pub execution_id: ExecutionId,
    pub total_recommendations: usize,
    pub recommendations: Vec<Recommendation>,
}

impl From<&ExecutionRecord> for RecommendationsView {
    fn from(record: &ExecutionRecord) -> Self {
        Self {
            execution_id: record.execution_id,
            total_recommendations: record.recommendations.len(),
            recommendations: record.recommendations.clone(),
        }
    }
}

/// RCA items by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTotals {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl IssueTotals {
    #[must_use]
    pub fn from_items(items: &[RcaItem]) -> Self {
        items.iter().fold(Self::default(), |mut totals, item| {
            totals.total += 1;
            match item.severity {
                Severity::Critical => totals.critical += 1,
                Severity::High => totals.high += 1,
                Severity::Medium => totals.medium += 1,
                Severity::Low => totals.low += 1,
            }
            totals
        })
    }
}

/// Compact overview of one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub execution_id: ExecutionId,
    pub agent_type: AgentType,
    pub status: ExecutionStatus,
    #[serde(flatten)]
    pub counts: TestCounts,
    /// Percentage, 0 when no tests ran
    pub pass_rate: f64,
    pub issues: IssueTotals,
    pub total_recommendations: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

impl From<&ExecutionRecord> for ExecutionSummary {
    fn from(record: &ExecutionRecord) -> Self {
        let counts = record.counts();
        Self {
            execution_id: record.execution_id,
            agent_type: record.agent_type.clone(),
            status: record.status,
            counts,
            pass_rate: counts.pass_rate(),
            issues: IssueTotals::from_items(&record.rca_items),
            total_recommendations: record.recommendations.len(),
            start_time: record.start_time,
            end_time: record.end_time,
            duration: record.duration,
            error: record.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::AgentInputs;
    use serde_json::json;

    fn record_with_results() -> ExecutionRecord {
        let mut rec = ExecutionRecord::new(AgentType::new("security_testing"), AgentInputs::new());
        rec.push_test_cases(vec![
            TestCaseResult::new("t1", "sqli", "security", "blocked"),
            TestCaseResult::new("t2", "xss", "security", "blocked").failed("reflected"),
            TestCaseResult::new("t3", "csrf", "security", "blocked").failed("no token"),
        ]);
        rec.rca_items.push(RcaItem::new("i1", "Security Vulnerability", "xss", Severity::Critical));
        rec.rca_items.push(RcaItem::new("i2", "Security Vulnerability", "csrf", Severity::High));
        rec
    }

    #[test]
    fn summary_totals() {
        let summary = ExecutionSummary::from(&record_with_results());
        assert_eq!(summary.counts.total_tests, 3);
        assert_eq!(summary.counts.failed_tests, 2);
        assert!((summary.pass_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.issues.total, 2);
        assert_eq!(summary.issues.critical, 1);
        assert_eq!(summary.issues.high, 1);
    }

    #[test]
    fn empty_record_has_zero_pass_rate() {
        let rec = ExecutionRecord::new(AgentType::new("unit_testing"), AgentInputs::new());
        assert_eq!(ExecutionSummary::from(&rec).pass_rate, 0.0);
    }

    #[test]
    fn test_cases_view_flattens_counts() {
        let view = TestCasesView::from(&record_with_results());
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["total_tests"], json!(3));
        assert_eq!(value["passed_tests"], json!(1));
        assert_eq!(value["test_cases"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn rca_view_totals() {
        let view = RcaView::from(&record_with_results());
        assert_eq!(view.total_issues, 2);
    }
}
