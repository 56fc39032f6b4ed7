use serde::Serialize;

use crate::common::helpers::truncate;
use crate::error::ExecutionError;
use crate::migrate::classifier::Verdict;
use crate::sql::Statement;

pub const STATEMENT_PREVIEW_CHARS: usize = 50;
pub const ERROR_PREVIEW_CHARS: usize = 100;

/// What came back from submitting a single statement.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub index: usize,
    pub statement: String,
    pub error: Option<ExecutionError>,
}

impl ExecutionOutcome {
    pub fn new(statement: &Statement, result: Result<(), ExecutionError>) -> Self {
        ExecutionOutcome {
            index: statement.index,
            statement: truncate(&statement.text, STATEMENT_PREVIEW_CHARS),
            error: result.err(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ClassifiedResult {
    pub outcome: ExecutionOutcome,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FatalFailure {
    pub index: usize,
    pub statement: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub total: usize,
    pub succeeded: usize,
    pub acceptable: usize,
    pub fatal: Vec<FatalFailure>,
    pub passed: bool,
}

impl AggregateReport {
    /// Builds the report once every statement has been classified.
    pub fn from_results(results: &[ClassifiedResult], passes: impl Fn(usize, usize) -> bool) -> Self {
        let total = results.len();
        let mut succeeded = 0;
        let mut acceptable = 0;
        let mut fatal = Vec::new();

        for result in results {
            match result.verdict {
                Verdict::Succeeded => succeeded += 1,
                Verdict::AcceptableFailure => acceptable += 1,
                Verdict::FatalFailure => {
                    let message = result
                        .outcome
                        .error
                        .as_ref()
                        .map(|err| truncate(&err.message, ERROR_PREVIEW_CHARS))
                        .unwrap_or_default();

                    fatal.push(FatalFailure {
                        index: result.outcome.index,
                        statement: result.outcome.statement.clone(),
                        message,
                    });
                }
            }
        }

        let passed = passes(succeeded + acceptable, total);

        AggregateReport {
            total,
            succeeded,
            acceptable,
            fatal,
            passed,
        }
    }

    /// Non-fatal results, reported as "successful".
    pub fn successful(&self) -> usize {
        self.succeeded + self.acceptable
    }
}
