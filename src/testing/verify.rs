//! Response verifiers
//!
//! Two strategies: golden-file comparison of a raw response, and matching
//! an expected DUT rejection against a pattern. Neither returns an error
//! for a mismatch; a mismatch is a normal result carrying its diagnosis.

use std::fmt;

use regex::Regex;

use crate::dut::{FailureKind, Outcome};

/// Where a response first departs from its golden file (1-indexed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    /// First differing line; for truncation, the last line of the shorter side
    pub line: usize,
    /// Golden line at the difference (first extra line when truncated)
    pub expected: Option<String>,
    /// Response line at the difference (first extra line when truncated)
    pub actual: Option<String>,
    /// Line counts differ and the shorter side is a prefix of the longer
    pub truncated: bool,
}

impl fmt::Display for LineDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |line: &Option<String>| match line {
            Some(text) => format!("'{}'", text),
            None => "<end of output>".to_string(),
        };

        if self.truncated && self.line == 0 {
            match (&self.expected, &self.actual) {
                (None, actual) => write!(f, "expected empty output, got {}", show(actual)),
                (expected, _) => write!(f, "got empty output, expected {}", show(expected)),
            }
        } else if self.truncated {
            write!(
                f,
                "output diverges in length after line {}: expected {}, got {}",
                self.line,
                show(&self.expected),
                show(&self.actual)
            )
        } else {
            write!(
                f,
                "line {}: expected {}, got {}",
                self.line,
                show(&self.expected),
                show(&self.actual)
            )
        }
    }
}

/// Result of a golden comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldenComparison {
    pub matched: bool,
    pub diff: Option<LineDiff>,
}

/// Split text into lines, ignoring line-ending style, trailing whitespace
/// and trailing blank lines
fn normalized_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

/// Compare a raw response against golden file contents
pub fn compare_golden(actual: &str, golden: &str) -> GoldenComparison {
    let actual_lines = normalized_lines(actual);
    let golden_lines = normalized_lines(golden);

    let first_difference = golden_lines
        .iter()
        .zip(actual_lines.iter())
        .position(|(expected, got)| expected != got);

    if let Some(index) = first_difference {
        return GoldenComparison {
            matched: false,
            diff: Some(LineDiff {
                line: index + 1,
                expected: Some(golden_lines[index].to_string()),
                actual: Some(actual_lines[index].to_string()),
                truncated: false,
            }),
        };
    }

    if golden_lines.len() != actual_lines.len() {
        let shorter = golden_lines.len().min(actual_lines.len());
        return GoldenComparison {
            matched: false,
            diff: Some(LineDiff {
                line: shorter,
                expected: golden_lines.get(shorter).map(|s| s.to_string()),
                actual: actual_lines.get(shorter).map(|s| s.to_string()),
                truncated: true,
            }),
        };
    }

    GoldenComparison {
        matched: true,
        diff: None,
    }
}

/// Result of checking an outcome against an expected failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCheck {
    /// The DUT rejected the command with a matching message
    Matched { message: String },
    /// The command succeeded
    DidNotOccur { response: String },
    /// The command failed, but not as a DUT validation error
    WrongKind { kind: FailureKind, message: String },
    /// The DUT rejected the command with a different message
    PatternMismatch { message: String, pattern: String },
}

impl FailureCheck {
    pub fn passed(&self) -> bool {
        matches!(self, FailureCheck::Matched { .. })
    }
}

/// Check that an outcome is a DUT validation error whose message contains
/// a match for `pattern` (substring search, not a full match)
pub fn match_expected_failure(outcome: &Outcome, pattern: &Regex) -> FailureCheck {
    match outcome {
        Outcome::Success(response) => FailureCheck::DidNotOccur {
            response: response.clone(),
        },
        Outcome::Failure {
            kind: FailureKind::Validation,
            message,
        } => {
            if pattern.is_match(message) {
                FailureCheck::Matched {
                    message: message.clone(),
                }
            } else {
                FailureCheck::PatternMismatch {
                    message: message.clone(),
                    pattern: pattern.as_str().to_string(),
                }
            }
        }
        Outcome::Failure { kind, message } => FailureCheck::WrongKind {
            kind: *kind,
            message: message.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAWVISITED: &str = "0.1 visited:\nBLOCK_A\nEVT_1\nBLOCK_B\n";

    #[test]
    fn test_golden_is_reflexive() {
        assert!(compare_golden(RAWVISITED, RAWVISITED).matched);
        assert!(compare_golden("", "").matched);
    }

    #[test]
    fn test_golden_ignores_line_endings_and_trailing_whitespace() {
        let crlf = "0.1 visited:\r\nBLOCK_A  \r\nEVT_1\r\nBLOCK_B\r\n\r\n\r\n";
        let result = compare_golden(crlf, RAWVISITED);
        assert!(result.matched, "{:?}", result.diff);
        assert!(compare_golden("a\nb", "a\nb\n\n").matched);
    }

    #[test]
    fn test_golden_reports_first_differing_line() {
        let actual = "0.1 visited:\nBLOCK_A\nEVT_2\nBLOCK_C\n";
        let result = compare_golden(actual, RAWVISITED);
        assert!(!result.matched);
        assert_eq!(
            result.diff,
            Some(LineDiff {
                line: 3,
                expected: Some("EVT_1".to_string()),
                actual: Some("EVT_2".to_string()),
                truncated: false,
            })
        );
    }

    #[test]
    fn test_golden_is_sensitive_to_leading_whitespace() {
        let result = compare_golden(" BLOCK_A\n", "BLOCK_A\n");
        assert!(!result.matched);
        assert_eq!(result.diff.unwrap().line, 1);
    }

    #[test]
    fn test_golden_reports_truncation() {
        let actual = "0.1 visited:\nBLOCK_A\n";
        let result = compare_golden(actual, RAWVISITED);
        assert!(!result.matched);
        let diff = result.diff.unwrap();
        assert!(diff.truncated);
        assert_eq!(diff.line, 2);
        assert_eq!(diff.expected.as_deref(), Some("EVT_1"));
        assert_eq!(diff.actual, None);
        assert!(diff.to_string().contains("after line 2"));

        let longer = format!("{}EXTRA\n", RAWVISITED);
        let diff = compare_golden(&longer, RAWVISITED).diff.unwrap();
        assert!(diff.truncated);
        assert_eq!(diff.line, 4);
        assert_eq!(diff.actual.as_deref(), Some("EXTRA"));
    }

    #[test]
    fn test_golden_reports_empty_side() {
        let diff = compare_golden("\n", RAWVISITED).diff.unwrap();
        assert_eq!(diff.line, 0);
        assert_eq!(
            diff.to_string(),
            "got empty output, expected '0.1 visited:'"
        );

        let diff = compare_golden("none\n", "").diff.unwrap();
        assert_eq!(diff.line, 0);
        assert_eq!(diff.to_string(), "expected empty output, got 'none'");
    }

    #[test]
    fn test_expected_failure_matches_substring() {
        let pattern = Regex::new(r"Validation of Neighbourhood: Node (.)+ of type (.)+ cannot be childless").unwrap();
        let outcome = Outcome::validation(
            "dm-cmd: Validation of Neighbourhood: Node Evt_A of type tmsg cannot be childless\n",
        );
        assert!(match_expected_failure(&outcome, &pattern).passed());
    }

    #[test]
    fn test_expected_failure_reports_message_and_pattern() {
        let pattern = Regex::new("cannot be childless").unwrap();
        let outcome = Outcome::validation("Node Evt_A of type tmsg must not have edge of type altdst");
        assert_eq!(
            match_expected_failure(&outcome, &pattern),
            FailureCheck::PatternMismatch {
                message: "Node Evt_A of type tmsg must not have edge of type altdst".to_string(),
                pattern: "cannot be childless".to_string(),
            }
        );
    }

    #[test]
    fn test_expected_failure_did_not_occur() {
        let pattern = Regex::new("childless").unwrap();
        let check = match_expected_failure(&Outcome::Success(String::new()), &pattern);
        assert!(matches!(check, FailureCheck::DidNotOccur { .. }));
    }

    #[test]
    fn test_connection_error_is_wrong_kind_even_if_message_matches() {
        let pattern = Regex::new("childless").unwrap();
        let check = match_expected_failure(&Outcome::connection("childless socket"), &pattern);
        assert!(matches!(
            check,
            FailureCheck::WrongKind {
                kind: FailureKind::Connection,
                ..
            }
        ));
    }
}
