//! Stage outputs: test case results, root cause analyses and recommendations

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a single test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Error,
}

impl TestStatus {
    /// Statuses that feed root cause analysis
    #[inline]
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one executed test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub id: String,
    pub name: String,
    pub description: String,
    pub test_type: String,
    pub steps: Vec<String>,
    pub expected_result: String,
    pub actual_result: Option<String>,
    pub status: TestStatus,
    /// Seconds
    pub execution_time: f64,
    /// Present only for `failed` / `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TestCaseResult {
    /// Create a passed test case with no steps
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        test_type: impl Into<String>,
        expected_result: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            test_type: test_type.into(),
            steps: Vec::new(),
            expected_result: expected_result.into(),
            actual_result: None,
            status: TestStatus::Passed,
            execution_time: 0.0,
            error_message: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual_result = Some(actual.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_execution_time(mut self, secs: f64) -> Self {
        self.execution_time = secs;
        self
    }

    /// Mark passed; clears any error message
    #[inline]
    #[must_use]
    pub fn passed(mut self) -> Self {
        self.status = TestStatus::Passed;
        self.error_message = None;
        self
    }

    /// Mark skipped; clears any error message
    #[inline]
    #[must_use]
    pub fn skipped(mut self) -> Self {
        self.status = TestStatus::Skipped;
        self.error_message = None;
        self
    }

    #[inline]
    #[must_use]
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = TestStatus::Failed;
        self.error_message = Some(message.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn errored(mut self, message: impl Into<String>) -> Self {
        self.status = TestStatus::Error;
        self.error_message = Some(message.into());
        self
    }

    /// Drop an `error_message` that a non-failure status must not carry
    pub fn normalize(&mut self) {
        if !self.status.is_failure() {
            self.error_message = None;
        }
    }
}

/// Severity of a diagnosed issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(ModelError::UnknownVariant {
                kind: "severity",
                value: other.to_string(),
            }),
        }
    }
}

/// Recommendation priority shares the severity scale
pub type Priority = Severity;

/// Root cause analysis of one or more failed test cases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcaItem {
    pub issue_id: String,
    pub category: String,
    pub root_cause: String,
    pub affected_components: Vec<String>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl RcaItem {
    #[must_use]
    pub fn new(
        issue_id: impl Into<String>,
        category: impl Into<String>,
        root_cause: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            issue_id: issue_id.into(),
            category: category.into(),
            root_cause: root_cause.into(),
            affected_components: Vec::new(),
            severity,
            stack_trace: None,
        }
    }

    #[must_use]
    pub fn affecting<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_components = components.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_stack_trace(mut self, trace: Option<String>) -> Self {
        self.stack_trace = trace;
        self
    }
}

/// Suggested source edit attached to a recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChange {
    pub file: String,
    pub line: String,
    pub original: String,
    pub suggested: String,
}

impl CodeChange {
    #[must_use]
    pub fn new(
        file: impl Into<String>,
        line: impl Into<String>,
        original: impl Into<String>,
        suggested: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line: line.into(),
            original: original.into(),
            suggested: suggested.into(),
        }
    }
}

/// Remediation proposal derived from an RCA item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub suggested_fix: String,
    #[serde(default)]
    pub code_changes: Vec<CodeChange>,
    /// `issue_id` of an RCA item in the same execution
    pub related_rca: String,
}

impl Recommendation {
    /// Create a recommendation answering `rca`, inheriting its severity as priority
    #[must_use]
    pub fn for_rca(
        recommendation_id: impl Into<String>,
        rca: &RcaItem,
        title: impl Into<String>,
        category: impl Into<String>,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self {
            recommendation_id: recommendation_id.into(),
            title: title.into(),
            description: format!("Root cause: {}", rca.root_cause),
            category: category.into(),
            priority: rca.severity,
            suggested_fix: suggested_fix.into(),
            code_changes: Vec::new(),
            related_rca: rca.issue_id.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_code_changes(mut self, changes: Vec<CodeChange>) -> Self {
        self.code_changes = changes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_statuses() {
        assert!(TestStatus::Failed.is_failure());
        assert!(TestStatus::Error.is_failure());
        assert!(!TestStatus::Passed.is_failure());
        assert!(!TestStatus::Skipped.is_failure());
    }

    #[test]
    fn normalize_strips_message_from_passed_case() {
        let mut case = TestCaseResult::new("t1", "case", "unit", "ok");
        case.error_message = Some("stale".into());
        case.normalize();
        assert!(case.error_message.is_none());

        let mut failed = TestCaseResult::new("t2", "case", "unit", "ok").failed("boom");
        failed.normalize();
        assert_eq!(failed.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn recommendation_links_rca() {
        let rca = RcaItem::new("issue-1", "Logic Error", "off by one", Severity::High);
        let rec = Recommendation::for_rca("rec-1", &rca, "Fix", "code_fix", "check bounds");
        assert_eq!(rec.related_rca, "issue-1");
        assert_eq!(rec.priority, Severity::High);
        assert_eq!(rec.description, "Root cause: off by one");
    }

    #[test]
    fn severity_round_trips_through_text() {
        for sev in [Severity::Low, Severity::Medium, Severity::High, Severity::Critical] {
            assert_eq!(sev.as_str().parse::<Severity>().unwrap(), sev);
        }
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TestStatus::Error).unwrap(), "\"error\"");
    }
}
