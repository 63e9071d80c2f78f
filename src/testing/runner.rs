//! Test runner implementation
//!
//! Walks a test case's operations strictly in order against one DUT
//! handle, verifies each result and stops at the first violation. Every
//! failure is turned into a [`FailureReport`]; nothing escapes a test case.

use colored::Colorize;

use crate::common::Error;
use crate::dut::{CommandRegistry, Outcome, Transport};

use super::case::{Operation, TestCase, Verification};
use super::dispatcher;
use super::report::{CaseReport, CaseState, FailureReport, ReportKind, SuiteReport};
use super::verify::{compare_golden, match_expected_failure};

/// Sequential test case executor
pub struct Engine<'a> {
    registry: &'a CommandRegistry,
    verbose: bool,
}

impl<'a> Engine<'a> {
    pub fn new(registry: &'a CommandRegistry) -> Self {
        Self {
            registry,
            verbose: false,
        }
    }

    /// Echo command lines and raw responses
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run one test case to completion or first failure
    pub async fn run_case<T: Transport + ?Sized>(&self, case: &TestCase, dut: &mut T) -> CaseReport {
        let operations_total = case.operations().len();
        let mut report = CaseReport {
            name: case.name().to_string(),
            state: CaseState::Ready,
            operations_run: 0,
            operations_total,
            failure: None,
        };

        println!(
            "\n{} {}",
            "Running Test:".blue().bold(),
            case.name().white().bold()
        );
        if let Some(desc) = case.description() {
            println!("  {}", desc.dimmed());
        }

        if let Err(e) = case.check(self.registry) {
            let failure = FailureReport::from_case_error(&e);
            println!("  {} {}", "✗".red(), failure);
            report.state = CaseState::Failed;
            report.failure = Some(failure);
            return report;
        }

        report.state = CaseState::Running;
        tracing::info!(case = case.name(), dut = %dut.describe(), operations = operations_total, "Test case started");

        for op in case.operations() {
            report.operations_run += 1;

            if let Err(failure) = self.execute_operation(dut, case, op).await {
                println!("  {} {}", "✗".red(), failure);
                tracing::info!(
                    case = case.name(),
                    label = %failure.label,
                    kind = %failure.kind,
                    "Test case failed"
                );
                report.state = CaseState::Failed;
                report.failure = Some(failure);
                return report;
            }
        }

        report.state = CaseState::Passed;
        tracing::info!(case = case.name(), "Test case passed");
        println!("{} {}", "✓".green().bold(), "Test Passed".green().bold());
        report
    }

    /// Run test cases one after another; a failing case does not stop the rest
    pub async fn run_suite<T: Transport + ?Sized>(
        &self,
        cases: &[TestCase],
        dut: &mut T,
    ) -> SuiteReport {
        let mut suite = SuiteReport::default();
        for case in cases {
            suite.cases.push(self.run_case(case, dut).await);
        }
        suite
    }

    /// Dispatch one operation and verify its outcome
    async fn execute_operation<T: Transport + ?Sized>(
        &self,
        dut: &mut T,
        case: &TestCase,
        op: &Operation,
    ) -> Result<(), FailureReport> {
        if self.verbose {
            println!("  $ {}", op.summary().dimmed());
        }

        let outcome = dispatcher::dispatch(dut, case, op)
            .await
            .map_err(|e| FailureReport::new(ReportKind::Artifact, op.label(), e.to_string()))?;

        if self.verbose {
            if let Outcome::Success(text) = &outcome {
                for line in text.lines() {
                    println!("    {}", line.dimmed());
                }
            }
        }

        match op.verification() {
            Verification::Succeeds => {
                if let Outcome::Failure { kind, message } = &outcome {
                    return Err(FailureReport::from_dut_failure(*kind, op.label(), message));
                }
                println!("  {} {}: {}", "✓".green(), op.label(), op.summary().dimmed());
            }

            Verification::Golden(golden) => {
                let response = match &outcome {
                    Outcome::Success(text) => text,
                    Outcome::Failure { kind, message } => {
                        return Err(FailureReport::from_dut_failure(*kind, op.label(), message))
                    }
                };

                let path = case.resolve(golden);
                let golden_bytes = std::fs::read(&path).map_err(|e| {
                    FailureReport::new(
                        ReportKind::Artifact,
                        op.label(),
                        Error::artifact_read(&path, &e).to_string(),
                    )
                })?;
                // Decoded like the DUT's response so captured output compares equal
                let expected = String::from_utf8_lossy(&golden_bytes);

                let comparison = compare_golden(response, &expected);
                if let Some(diff) = comparison.diff {
                    return Err(FailureReport::from_diff(
                        op.label(),
                        &path.display().to_string(),
                        &diff,
                    ));
                }
                println!(
                    "  {} {}: {} (matches {})",
                    "✓".green(),
                    op.label(),
                    op.summary().dimmed(),
                    golden.display().to_string().dimmed()
                );
            }

            Verification::ExpectFailure(pattern) => {
                let check = match_expected_failure(&outcome, pattern);
                if let Some(failure) = FailureReport::from_failure_check(op.label(), &check) {
                    return Err(failure);
                }
                println!(
                    "  {} {}: {} (expected failure)",
                    "✓".green(),
                    op.label(),
                    op.summary().dimmed()
                );
            }
        }

        Ok(())
    }
}
