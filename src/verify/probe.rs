use std::fmt;

use serde::Serialize;

use crate::common::helpers::truncate;
use crate::error::ClientError;

/// Error text of a policy that ends up evaluating itself.
pub const RECURSION_SIGNATURE: &str = "infinite recursion";

const DIAGNOSTIC_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum ProbeDiagnostic {
    /// The access policies still evaluate recursively.
    InfiniteRecursion(String),
    Error(String),
    Note(String),
}

impl ProbeDiagnostic {
    /// Sorts a client error into the recursion signature or a plain error.
    pub fn from_error(err: &ClientError) -> Self {
        let message = truncate(err.message(), DIAGNOSTIC_CHARS);

        if err.message().contains(RECURSION_SIGNATURE) {
            ProbeDiagnostic::InfiniteRecursion(message)
        } else {
            ProbeDiagnostic::Error(message)
        }
    }
}

impl fmt::Display for ProbeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProbeDiagnostic::InfiniteRecursion(message) => {
                write!(f, "infinite recursion in access policies: {}", message)
            }
            ProbeDiagnostic::Error(message) => write!(f, "{}", message),
            ProbeDiagnostic::Note(message) => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub name: String,
    pub passed: bool,
    pub diagnostic: Option<ProbeDiagnostic>,
}

impl ProbeResult {
    pub fn pass(name: &str) -> Self {
        ProbeResult {
            name: name.to_string(),
            passed: true,
            diagnostic: None,
        }
    }

    pub fn pass_with_note(name: &str, note: impl Into<String>) -> Self {
        ProbeResult {
            name: name.to_string(),
            passed: true,
            diagnostic: Some(ProbeDiagnostic::Note(note.into())),
        }
    }

    pub fn fail(name: &str, diagnostic: ProbeDiagnostic) -> Self {
        ProbeResult {
            name: name.to_string(),
            passed: false,
            diagnostic: Some(diagnostic),
        }
    }

    pub fn from_error(name: &str, err: &ClientError) -> Self {
        Self::fail(name, ProbeDiagnostic::from_error(err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub results: Vec<ProbeResult>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|result| result.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|result| result.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }
}
