//! DUT request/outcome types
//!
//! One request goes out per operation and exactly one outcome comes back.
//! DUT rejections are values here, not errors, so the verifiers can
//! inspect them directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Command domains understood by the data master tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Generic command channel (`dm-cmd`)
    Cmd,
    /// Schedule channel (`dm-sched`)
    Sched,
}

impl Domain {
    /// All known domains, in display order
    pub const ALL: [Domain; 2] = [Domain::Cmd, Domain::Sched];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Cmd => "cmd",
            Domain::Sched => "sched",
        }
    }

    /// Executable name looked up in PATH when no tool is configured
    pub fn default_tool(&self) -> &'static str {
        match self {
            Domain::Cmd => "dm-cmd",
            Domain::Sched => "dm-sched",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cmd" => Ok(Domain::Cmd),
            "sched" => Ok(Domain::Sched),
            other => Err(format!("unknown command domain '{}'", other)),
        }
    }
}

/// Input artifact contents, read verbatim at dispatch time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Resolved path of the artifact
    pub path: PathBuf,
    /// Artifact contents
    pub contents: String,
}

/// A single command sent to the DUT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Channel the command goes through
    pub domain: Domain,
    /// Command words: verb, then target, then the input artifact path
    pub words: Vec<String>,
    /// Input artifact, when the operation supplies one
    pub payload: Option<Payload>,
}

impl Request {
    /// Command line as the DUT tool sees it (without the data master address)
    pub fn command_line(&self) -> String {
        self.words.join(" ")
    }

    pub fn verb(&self) -> &str {
        self.words.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.domain, self.command_line())
    }
}

/// Why the DUT did not produce a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// DUT unreachable, channel broken or timed out. Always fatal.
    Connection,
    /// DUT rejected the command on semantic grounds
    Validation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Connection => f.write_str("ConnectionError"),
            FailureKind::Validation => f.write_str("DUTValidationError"),
        }
    }
}

/// Result of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Raw response text
    Success(String),
    /// Classified failure with the DUT's message
    Failure { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn connection(message: impl Into<String>) -> Self {
        Outcome::Failure {
            kind: FailureKind::Connection,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Outcome::Failure {
            kind: FailureKind::Validation,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_names_round_trip_through_from_str() {
        for domain in Domain::ALL {
            assert_eq!(domain.as_str().parse::<Domain>().unwrap(), domain);
        }
        assert!("scheduler".parse::<Domain>().is_err());
    }

    #[test]
    fn test_request_command_line() {
        let request = Request {
            domain: Domain::Sched,
            words: vec!["add".into(), "0".into(), "test_sched.dot".into()],
            payload: None,
        };
        assert_eq!(request.command_line(), "add 0 test_sched.dot");
        assert_eq!(request.verb(), "add");
        assert_eq!(request.to_string(), "sched add 0 test_sched.dot");
    }

    #[test]
    fn test_failure_kind_display_uses_taxonomy_names() {
        assert_eq!(FailureKind::Connection.to_string(), "ConnectionError");
        assert_eq!(FailureKind::Validation.to_string(), "DUTValidationError");
    }
}
