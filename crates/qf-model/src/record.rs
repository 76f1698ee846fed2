//! Execution record
//!
//! One [`ExecutionRecord`] tracks one agent run from submission to a terminal
//! state. Only the task running the pipeline mutates it; once terminal it is
//! read-only and persisted.

use crate::error::ModelError;
use crate::ids::{AgentType, ExecutionId};
use crate::inputs::{AgentInputs, TestData, TestScript};
use crate::results::{RcaItem, Recommendation, TestCaseResult, TestStatus};
use crate::status::{validate_transition, ExecutionStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Severity of a record log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamped line in a record's append-only log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.level,
            self.message
        )
    }
}

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    GenerateTestScripts,
    GenerateTestData,
    ExecuteTests,
    AnalyzeFailures,
    GenerateRecommendations,
}

impl Stage {
    pub const ALL: [Self; 5] = [
        Self::GenerateTestScripts,
        Self::GenerateTestData,
        Self::ExecuteTests,
        Self::AnalyzeFailures,
        Self::GenerateRecommendations,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerateTestScripts => "generate_test_scripts",
            Self::GenerateTestData => "generate_test_data",
            Self::ExecuteTests => "execute_tests",
            Self::AnalyzeFailures => "analyze_failures",
            Self::GenerateRecommendations => "generate_recommendations",
        }
    }

    /// 1-based position in the pipeline
    #[must_use]
    pub fn number(self) -> usize {
        self as usize + 1
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an execution failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Agent returned an error from a stage
    Stage,
    /// Execution deadline expired
    Timeout,
    /// Agent panicked inside a stage
    Panic,
    /// Stage output violated a record invariant
    InvalidOutput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stage => "stage",
            Self::Timeout => "timeout",
            Self::Panic => "panic",
            Self::InvalidOutput => "invalid_output",
        })
    }
}

/// Error payload of a FAILED record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub kind: ErrorKind,
    /// Stage in flight when the failure occurred
    pub stage: Option<Stage>,
    pub message: String,
}

impl ExecutionError {
    #[must_use]
    pub fn new(kind: ErrorKind, stage: Option<Stage>, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn stage(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Stage, Some(stage), message)
    }

    #[must_use]
    pub fn timeout(stage: Option<Stage>, limit_secs: f64) -> Self {
        Self::new(
            ErrorKind::Timeout,
            stage,
            format!("execution exceeded timeout of {limit_secs}s"),
        )
    }

    #[must_use]
    pub fn panic(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Panic, Some(stage), message)
    }

    #[must_use]
    pub fn invalid_output(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOutput, Some(stage), message)
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "{} error in {}: {}", self.kind, stage, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

/// Test case counts partitioned by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCounts {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub skipped_tests: usize,
    pub error_tests: usize,
}

impl TestCounts {
    /// Count a sequence of test cases
    #[must_use]
    pub fn from_cases(cases: &[TestCaseResult]) -> Self {
        let mut counts = Self {
            total_tests: cases.len(),
            ..Self::default()
        };
        for case in cases {
            match case.status {
                TestStatus::Passed => counts.passed_tests += 1,
                TestStatus::Failed => counts.failed_tests += 1,
                TestStatus::Skipped => counts.skipped_tests += 1,
                TestStatus::Error => counts.error_tests += 1,
            }
        }
        counts
    }

    /// Percentage of passed tests; 0 when there are none
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        percentage(self.passed_tests, self.total_tests)
    }

    #[must_use]
    pub fn fail_rate(&self) -> f64 {
        percentage(self.failed_tests, self.total_tests)
    }

    /// Failures that feed root cause analysis
    #[inline]
    #[must_use]
    pub fn failures(&self) -> usize {
        self.failed_tests + self.error_tests
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Broken record invariant reported by [`ExecutionRecord::check_integrity`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    DanglingRecommendation {
        recommendation_id: String,
        related_rca: String,
    },
    EndBeforeStart,
    DurationMismatch,
    /// `error` present without FAILED, or FAILED without `error`
    ErrorStatusMismatch,
    /// Terminal record without end time, or live record with one
    TimingStatusMismatch,
    /// `error_message` on a passed/skipped case
    StrayErrorMessage { test_id: String },
    /// NaN or infinite `execution_time`; JSON cannot carry it
    NonFiniteExecutionTime { test_id: String },
}

/// Tracked state of one agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: ExecutionId,
    pub agent_type: AgentType,
    pub status: ExecutionStatus,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Set on entering RUNNING
    pub start_time: Option<DateTime<Utc>>,
    /// Set on reaching a terminal state
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between start and end
    pub duration: Option<f64>,
    pub inputs: AgentInputs,
    #[serde(default)]
    pub test_scripts: Vec<TestScript>,
    #[serde(default)]
    pub test_data: Option<TestData>,
    #[serde(default)]
    pub test_cases: Vec<TestCaseResult>,
    #[serde(default)]
    pub rca_items: Vec<RcaItem>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
    /// Present only when FAILED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

impl ExecutionRecord {
    /// Create a PENDING record with a fresh id
    #[must_use]
    pub fn new(agent_type: AgentType, inputs: AgentInputs) -> Self {
        Self::with_id(ExecutionId::new(), agent_type, inputs)
    }

    #[must_use]
    pub fn with_id(execution_id: ExecutionId, agent_type: AgentType, inputs: AgentInputs) -> Self {
        Self {
            execution_id,
            agent_type,
            status: ExecutionStatus::Pending,
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
            duration: None,
            inputs,
            test_scripts: Vec::new(),
            test_data: None,
            test_cases: Vec::new(),
            rca_items: Vec::new(),
            recommendations: Vec::new(),
            logs: Vec::new(),
            metrics: BTreeMap::new(),
            error: None,
        }
    }

    fn transition(&mut self, to: ExecutionStatus) -> Result<(), ModelError> {
        validate_transition(self.status, to)?;
        self.status = to;
        Ok(())
    }

    /// PENDING -> RUNNING; stamps `start_time`
    ///
    /// # Errors
    /// - `ModelError::IllegalTransition` unless PENDING
    pub fn mark_running(&mut self) -> Result<(), ModelError> {
        self.transition(ExecutionStatus::Running)?;
        self.start_time = Some(Utc::now());
        Ok(())
    }

    /// RUNNING -> COMPLETED
    ///
    /// # Errors
    /// - `ModelError::IllegalTransition` unless RUNNING
    pub fn complete(&mut self) -> Result<(), ModelError> {
        self.finish(ExecutionStatus::Completed)
    }

    /// RUNNING -> FAILED with error payload
    ///
    /// # Errors
    /// - `ModelError::IllegalTransition` unless RUNNING
    pub fn fail(&mut self, error: ExecutionError) -> Result<(), ModelError> {
        self.finish(ExecutionStatus::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    /// RUNNING -> CANCELLED
    ///
    /// # Errors
    /// - `ModelError::IllegalTransition` unless RUNNING
    pub fn cancel(&mut self) -> Result<(), ModelError> {
        self.finish(ExecutionStatus::Cancelled)
    }

    fn finish(&mut self, to: ExecutionStatus) -> Result<(), ModelError> {
        self.transition(to)?;
        let end = Utc::now();
        let start = *self.start_time.get_or_insert(end);
        self.end_time = Some(end);
        self.duration = Some(seconds_between(start, end));
        Ok(())
    }

    /// Append a log line
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push(LogEntry::new(level, message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Append test cases, dropping error messages from non-failures
    pub fn push_test_cases(&mut self, cases: Vec<TestCaseResult>) {
        self.test_cases.extend(cases.into_iter().map(|mut case| {
            case.normalize();
            case
        }));
    }

    /// First case whose `execution_time` is NaN or infinite
    #[must_use]
    pub fn find_non_finite(cases: &[TestCaseResult]) -> Option<&TestCaseResult> {
        cases.iter().find(|case| !case.execution_time.is_finite())
    }

    /// Cases with status `failed` or `error`
    #[must_use]
    pub fn failed_cases(&self) -> Vec<TestCaseResult> {
        self.test_cases
            .iter()
            .filter(|case| case.status.is_failure())
            .cloned()
            .collect()
    }

    /// Derived status counts
    #[must_use]
    pub fn counts(&self) -> TestCounts {
        TestCounts::from_cases(&self.test_cases)
    }

    /// First recommendation whose `related_rca` is not one of this record's issues
    #[must_use]
    pub fn find_dangling<'a>(&self, recommendations: &'a [Recommendation]) -> Option<&'a Recommendation> {
        let issues: HashSet<&str> = self.rca_items.iter().map(|rca| rca.issue_id.as_str()).collect();
        recommendations
            .iter()
            .find(|rec| !issues.contains(rec.related_rca.as_str()))
    }

    /// Populate `metrics` from the current test cases
    ///
    /// Leaves `metrics` untouched when there are no test cases.
    pub fn compute_metrics(&mut self) {
        let counts = self.counts();
        if counts.total_tests == 0 {
            return;
        }
        let total_time: f64 = self.test_cases.iter().map(|case| case.execution_time).sum();
        #[allow(clippy::cast_precision_loss)]
        let average = total_time / counts.total_tests as f64;

        self.metrics.insert("total_tests".into(), Value::from(counts.total_tests));
        self.metrics.insert("pass_rate".into(), Value::from(counts.pass_rate()));
        self.metrics.insert("fail_rate".into(), Value::from(counts.fail_rate()));
        self.metrics.insert("average_execution_time".into(), Value::from(average));
    }

    /// Log lines rendered as `[timestamp] [LEVEL] message`
    #[must_use]
    pub fn render_logs(&self) -> String {
        self.logs.iter().map(|entry| format!("{entry}\n")).collect()
    }

    /// Verify record invariants; empty when consistent
    #[must_use]
    pub fn check_integrity(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();

        if let Some(rec) = self.find_dangling(&self.recommendations) {
            violations.push(IntegrityViolation::DanglingRecommendation {
                recommendation_id: rec.recommendation_id.clone(),
                related_rca: rec.related_rca.clone(),
            });
        }

        for case in &self.test_cases {
            if !case.status.is_failure() && case.error_message.is_some() {
                violations.push(IntegrityViolation::StrayErrorMessage {
                    test_id: case.id.clone(),
                });
            }
            if !case.execution_time.is_finite() {
                violations.push(IntegrityViolation::NonFiniteExecutionTime {
                    test_id: case.id.clone(),
                });
            }
        }

        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if end < start {
                violations.push(IntegrityViolation::EndBeforeStart);
            }
            if self.duration != Some(seconds_between(start, end)) {
                violations.push(IntegrityViolation::DurationMismatch);
            }
        }

        if self.status.is_terminal() != self.end_time.is_some() {
            violations.push(IntegrityViolation::TimingStatusMismatch);
        }

        if (self.status == ExecutionStatus::Failed) != self.error.is_some() {
            violations.push(IntegrityViolation::ErrorStatusMismatch);
        }

        violations
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
}
