//! Operation and test case model
//!
//! Both types are immutable once built. All structural checks happen here,
//! at load time; artifact files are only touched when an operation is
//! dispatched.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::common::{Error, Result};
use crate::dut::{CommandRegistry, Domain};

use super::config::{CaseFile, CaseMode, OperationSpec};

/// How an operation's result is verified
#[derive(Debug, Clone)]
pub enum Verification {
    /// The operation must succeed; its response is not inspected
    Succeeds,
    /// The raw response must match a golden file
    Golden(PathBuf),
    /// The DUT must reject the operation with a message matching the pattern
    ExpectFailure(Regex),
}

/// A single DUT instruction
#[derive(Debug, Clone)]
pub struct Operation {
    label: String,
    domain: Domain,
    verb: String,
    target: Option<String>,
    input_artifact: Option<PathBuf>,
    verification: Verification,
}

impl Operation {
    /// Validate an operation description
    ///
    /// A verb with trailing words ("reset all") is split into verb and
    /// target. Missing files are not an error here.
    pub fn from_spec(spec: OperationSpec) -> Result<Self> {
        let label = spec.label.trim().to_string();
        if label.is_empty() {
            return Err(Error::invalid_operation(
                &spec.label,
                "label must not be empty",
            ));
        }

        let mut words = spec.verb.split_whitespace();
        let verb = match words.next() {
            Some(verb) => verb.to_string(),
            None => return Err(Error::invalid_operation(&label, "verb must not be empty")),
        };
        let trailing: Vec<&str> = words.collect();

        let target = match (trailing.is_empty(), spec.target) {
            (true, target) => target.filter(|t| !t.trim().is_empty()),
            (false, None) => Some(trailing.join(" ")),
            (false, Some(_)) => {
                return Err(Error::invalid_operation(
                    &label,
                    format!(
                        "target given twice: in verb '{}' and in 'target'",
                        spec.verb
                    ),
                ))
            }
        };

        let verification = match (spec.expected, spec.expect_failure) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_operation(
                    &label,
                    "'expected' and 'expect_failure' are mutually exclusive",
                ))
            }
            (Some(golden), None) => Verification::Golden(golden),
            (None, Some(pattern)) => {
                let regex = Regex::new(&pattern).map_err(|source| Error::InvalidPattern {
                    label: label.clone(),
                    source,
                })?;
                Verification::ExpectFailure(regex)
            }
            (None, None) => Verification::Succeeds,
        };

        Ok(Self {
            label,
            domain: spec.domain,
            verb,
            target,
            input_artifact: spec.input,
            verification,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn input_artifact(&self) -> Option<&Path> {
        self.input_artifact.as_deref()
    }

    pub fn expected_artifact(&self) -> Option<&Path> {
        match &self.verification {
            Verification::Golden(path) => Some(path),
            _ => None,
        }
    }

    pub fn expected_failure(&self) -> Option<&Regex> {
        match &self.verification {
            Verification::ExpectFailure(regex) => Some(regex),
            _ => None,
        }
    }

    pub fn verification(&self) -> &Verification {
        &self.verification
    }

    /// Short form for logs: "cmd reset all"
    pub fn summary(&self) -> String {
        let mut out = format!("{} {}", self.domain, self.verb);
        if let Some(target) = &self.target {
            out.push(' ');
            out.push_str(target);
        }
        if let Some(input) = &self.input_artifact {
            out.push(' ');
            out.push_str(&input.display().to_string());
        }
        out
    }
}

/// An ordered, named sequence of operations
#[derive(Debug, Clone)]
pub struct TestCase {
    name: String,
    description: Option<String>,
    mode: CaseMode,
    operations: Vec<Operation>,
    artifact_dir: PathBuf,
}

impl TestCase {
    /// Build a test case, checking the rules that span operations
    ///
    /// When `mode` is `None` it is derived: negative-capable if any
    /// operation expects a failure, positive otherwise.
    pub fn new(
        name: impl Into<String>,
        mode: Option<CaseMode>,
        operations: Vec<Operation>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_case(&name, "name must not be empty"));
        }
        if operations.is_empty() {
            return Err(Error::invalid_case(&name, "has no operations"));
        }

        let mut seen = HashSet::new();
        for op in &operations {
            if !seen.insert(op.label()) {
                return Err(Error::invalid_operation(
                    op.label(),
                    format!("label is not unique within '{}'", name),
                ));
            }
        }

        let expecting: Vec<usize> = operations
            .iter()
            .enumerate()
            .filter(|(_, op)| op.expected_failure().is_some())
            .map(|(i, _)| i)
            .collect();

        let mode = mode.unwrap_or(if expecting.is_empty() {
            CaseMode::Positive
        } else {
            CaseMode::NegativeCapable
        });

        if let Some(&first) = expecting.first() {
            let op = &operations[first];
            if mode == CaseMode::Positive {
                return Err(Error::invalid_operation(
                    op.label(),
                    format!("expects a failure but '{}' is a positive test case", name),
                ));
            }
            if expecting.len() > 1 {
                return Err(Error::invalid_case(
                    &name,
                    "at most one operation may expect a failure",
                ));
            }
            if first + 1 != operations.len() {
                return Err(Error::invalid_operation(
                    op.label(),
                    "an expected failure must be the last operation of its test case",
                ));
            }
        }

        Ok(Self {
            name,
            description: None,
            mode,
            operations,
            artifact_dir: PathBuf::from("."),
        })
    }

    /// Build a test case from a parsed YAML file
    pub fn from_file(file: CaseFile, artifact_dir: impl Into<PathBuf>) -> Result<Self> {
        let operations = file
            .operations
            .into_iter()
            .map(Operation::from_spec)
            .collect::<Result<Vec<_>>>()?;

        let mut case = Self::new(file.name, file.mode, operations)?;
        case.description = file.description;
        case.artifact_dir = artifact_dir.into();
        Ok(case)
    }

    /// Load and validate a test case from a YAML file
    ///
    /// Artifact paths resolve relative to the file's directory.
    pub fn load(path: &Path, registry: &CommandRegistry) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let file: CaseFile = serde_yaml::from_str(&content).map_err(|e| Error::CaseParse {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let case = Self::from_file(file, dir)?;
        case.check(registry)?;
        Ok(case)
    }

    /// Check every operation against the command registry
    pub fn check(&self, registry: &CommandRegistry) -> Result<()> {
        for op in &self.operations {
            let spec = registry
                .get(op.domain(), op.verb())
                .ok_or_else(|| Error::UnknownCommand {
                    label: op.label().to_string(),
                    domain: op.domain().to_string(),
                    verb: op.verb().to_string(),
                })?;

            spec.check(op.target().is_some(), op.input_artifact().is_some())
                .map_err(|reason| {
                    Error::invalid_operation(op.label(), format!("'{}' {}", op.verb(), reason))
                })?;
        }
        Ok(())
    }

    /// Directory artifact paths are resolved against
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn mode(&self) -> CaseMode {
        self.mode
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Resolve an artifact path against the case's directory
    pub fn resolve(&self, artifact: &Path) -> PathBuf {
        if artifact.is_relative() {
            self.artifact_dir.join(artifact)
        } else {
            artifact.to_path_buf()
        }
    }
}

impl TestCase {
    /// A pattern file that the DUT must accept when started
    pub fn schedule_ok(name: &str, pattern_file: impl Into<PathBuf>) -> Result<Self> {
        let op = Operation::from_spec(
            OperationSpec::new("startpattern", Domain::Cmd, "startpattern").input(pattern_file),
        )?;
        Self::new(name, Some(CaseMode::Positive), vec![op])
    }

    /// A pattern file that the DUT must reject with a matching message
    pub fn schedule_fail(
        name: &str,
        pattern_file: impl Into<PathBuf>,
        pattern: &str,
    ) -> Result<Self> {
        let op = Operation::from_spec(
            OperationSpec::new("startpattern", Domain::Cmd, "startpattern")
                .input(pattern_file)
                .expect_failure(pattern),
        )?;
        Self::new(name, Some(CaseMode::NegativeCapable), vec![op])
    }
}
