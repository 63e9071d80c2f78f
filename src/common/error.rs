//! Error types for the test harness
//!
//! These are harness-side errors: malformed test cases, unreadable
//! artifacts, bad configuration. Anything the DUT itself reports travels
//! as an [`Outcome`](crate::dut::Outcome) instead.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Test Case Construction Errors ===
    #[error("Test case '{case}': {reason}")]
    InvalidCase { case: String, reason: String },

    #[error("Operation '{label}': {reason}")]
    InvalidOperation { label: String, reason: String },

    #[error("Operation '{label}': no command '{verb}' registered for domain '{domain}'")]
    UnknownCommand {
        label: String,
        domain: String,
        verb: String,
    },

    #[error("Operation '{label}': invalid expected-failure pattern: {source}")]
    InvalidPattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to parse test case '{path}': {error}")]
    CaseParse { path: String, error: String },

    // === Artifact Errors ===
    #[error("Failed to read artifact '{path}': {error}")]
    ArtifactRead { path: String, error: String },

    // === DUT Tool Errors ===
    #[error("DUT tool '{name}' not found. Configure [tools.{name}] or add it to PATH")]
    ToolNotFound { name: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },
}

impl Error {
    /// Create an invalid test case error
    pub fn invalid_case(case: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCase {
            case: case.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(label: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            label: label.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an artifact read error
    pub fn artifact_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::ArtifactRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether this error means the test case itself is malformed
    /// (as opposed to an environment problem)
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCase { .. }
                | Error::InvalidOperation { .. }
                | Error::UnknownCommand { .. }
                | Error::InvalidPattern { .. }
                | Error::CaseParse { .. }
        )
    }
}
