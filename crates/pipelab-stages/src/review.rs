//! Code review stage — a detected vulnerability and its fix.

use pipelab_state::{Finding, Severity};

const VULNERABLE_QUERY: &str = "const query = 'SELECT * FROM users WHERE id=' + user;";
const PATCHED_QUERY: &str = "const query = 'SELECT * FROM users WHERE id=?';";

/// State of the assisted-development stage: one flagged line that the
/// operator can fix.
#[derive(Debug, Default)]
pub struct CodeReview {
    fixed: bool,
}

impl CodeReview {
    pub fn new() -> Self {
        Self::default()
    }

    /// The advisory pending on the flagged line, `None` once fixed.
    pub fn advisory(&self) -> Option<Finding> {
        if self.fixed {
            None
        } else {
            Some(Finding::new(
                Severity::Critical,
                "SQL injection",
                "user input is concatenated into the query; use a bound parameter",
            ))
        }
    }

    /// The flagged line as it currently reads.
    pub fn flagged_line(&self) -> &'static str {
        if self.fixed {
            PATCHED_QUERY
        } else {
            VULNERABLE_QUERY
        }
    }

    /// Apply the suggested fix.
    pub fn apply_fix(&mut self) {
        self.fixed = true;
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Back to the unfixed state.
    pub fn reset(&mut self) {
        self.fixed = false;
    }
}
