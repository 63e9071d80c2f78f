//! Test case and suite reports

use std::fmt;

use super::verify::{FailureCheck, LineDiff};
use crate::common::Error;
use crate::dut::FailureKind;

/// Lifecycle of one test case run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Ready,
    Running,
    Passed,
    Failed,
}

/// Why a test case failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// DUT unreachable, channel broken or timed out
    Connection,
    /// DUT rejected an operation that was not expected to fail
    Validation,
    /// Response did not match its golden file
    ComparisonMismatch,
    /// An operation expected to fail succeeded
    UnexpectedSuccess,
    /// Rejection message did not match the expected pattern
    PatternMismatch,
    /// An input or golden artifact could not be read
    Artifact,
    /// The test case does not fit the command registry
    InvalidCase,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportKind::Connection => "ConnectionError",
            ReportKind::Validation => "DUTValidationError",
            ReportKind::ComparisonMismatch => "ComparisonMismatch",
            ReportKind::UnexpectedSuccess => "UnexpectedSuccess",
            ReportKind::PatternMismatch => "PatternMismatch",
            ReportKind::Artifact => "ArtifactError",
            ReportKind::InvalidCase => "InvalidTestCase",
        };
        f.write_str(name)
    }
}

/// Structured description of the operation that failed a test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub kind: ReportKind,
    /// Label of the failing operation
    pub label: String,
    pub detail: String,
}

impl FailureReport {
    pub fn new(kind: ReportKind, label: &str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.to_string(),
            detail: detail.into(),
        }
    }

    /// Report for a DUT failure on an operation that had to succeed
    pub fn from_dut_failure(kind: FailureKind, label: &str, message: &str) -> Self {
        let kind = match kind {
            FailureKind::Connection => ReportKind::Connection,
            FailureKind::Validation => ReportKind::Validation,
        };
        Self::new(kind, label, message.trim())
    }

    /// Report for a test case that could not be loaded or does not fit the
    /// command registry; labelled with the offending operation when known
    pub fn from_case_error(error: &Error) -> Self {
        let label = match error {
            Error::InvalidOperation { label, .. }
            | Error::UnknownCommand { label, .. }
            | Error::InvalidPattern { label, .. } => label.as_str(),
            _ => "",
        };
        Self::new(ReportKind::InvalidCase, label, error.to_string())
    }

    pub fn from_diff(label: &str, golden: &str, diff: &LineDiff) -> Self {
        Self::new(
            ReportKind::ComparisonMismatch,
            label,
            format!("{} (golden file {})", diff, golden),
        )
    }

    /// Report for a failed expected-failure check; `None` if it passed
    pub fn from_failure_check(label: &str, check: &FailureCheck) -> Option<Self> {
        match check {
            FailureCheck::Matched { .. } => None,
            FailureCheck::DidNotOccur { response } => Some(Self::new(
                ReportKind::UnexpectedSuccess,
                label,
                format!(
                    "expected failure did not occur; response: '{}'",
                    response.trim()
                ),
            )),
            FailureCheck::WrongKind { kind, message } => {
                let mut report = Self::from_dut_failure(*kind, label, message);
                report.detail = format!("wrong failure kind {}: {}", kind, report.detail);
                Some(report)
            }
            FailureCheck::PatternMismatch { message, pattern } => Some(Self::new(
                ReportKind::PatternMismatch,
                label,
                format!("message: '{}', pattern: '{}'", message.trim(), pattern),
            )),
        }
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.label, self.detail)
    }
}

/// Result of running one test case
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub name: String,
    pub state: CaseState,
    /// Operations dispatched, including the failing one
    pub operations_run: usize,
    pub operations_total: usize,
    pub failure: Option<FailureReport>,
}

impl CaseReport {
    /// A failed report for a test case that never started
    pub fn invalid(name: impl Into<String>, error: &Error) -> Self {
        Self {
            name: name.into(),
            state: CaseState::Failed,
            operations_run: 0,
            operations_total: 0,
            failure: Some(FailureReport::from_case_error(error)),
        }
    }

    pub fn passed(&self) -> bool {
        self.state == CaseState::Passed
    }
}

/// Aggregate of independently run test cases
#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Process exit status for the outer runner
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }
}
