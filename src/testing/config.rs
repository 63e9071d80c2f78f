//! Test case file types
//!
//! Defines the data structures for deserializing YAML test cases. These
//! are the raw, unvalidated shapes; [`super::case`] turns them into
//! [`TestCase`](super::TestCase) values.

use serde::Deserialize;
use std::path::PathBuf;

use crate::dut::Domain;

/// A test case as written in a YAML file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct CaseFile {
    /// Name of the test case
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Execution contract; derived from the operations when omitted
    pub mode: Option<CaseMode>,
    /// The ordered operations to execute
    pub operations: Vec<OperationSpec>,
}

/// Whether a test case may contain an expected DUT rejection
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseMode {
    /// Every operation must succeed
    Positive,
    /// One operation may be expected to fail with a matching message
    NegativeCapable,
}

/// A single operation as written in a YAML file
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OperationSpec {
    /// Identifier used in failure reports
    pub label: String,
    /// Command domain ("cmd" or "sched")
    pub domain: Domain,
    /// Verb, optionally followed by its target ("reset all")
    pub verb: String,
    /// DUT sub-resource, e.g. a thread address like "0.1"
    pub target: Option<String>,
    /// Input artifact (pattern or command file)
    pub input: Option<PathBuf>,
    /// Golden output file the raw response must match
    pub expected: Option<PathBuf>,
    /// Regex the DUT's rejection message must contain a match for
    pub expect_failure: Option<String>,
}

impl OperationSpec {
    /// Start an operation description
    pub fn new(label: impl Into<String>, domain: Domain, verb: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            domain,
            verb: verb.into(),
            target: None,
            input: None,
            expected: None,
            expect_failure: None,
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    pub fn expected(mut self, path: impl Into<PathBuf>) -> Self {
        self.expected = Some(path.into());
        self
    }

    pub fn expect_failure(mut self, pattern: impl Into<String>) -> Self {
        self.expect_failure = Some(pattern.into());
        self
    }
}
