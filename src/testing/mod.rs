//! Test case execution
//!
//! Loads declarative YAML test cases, replays their operations against a
//! DUT and verifies each response, either against a golden file or, for
//! negative cases, against a pattern describing the expected rejection.

mod case;
mod config;
pub mod dispatcher;
mod report;
mod runner;
pub mod verify;

pub use case::{Operation, TestCase, Verification};
pub use config::{CaseFile, CaseMode, OperationSpec};
pub use report::{CaseReport, CaseState, FailureReport, ReportKind, SuiteReport};
pub use runner::Engine;
