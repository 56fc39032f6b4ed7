use serde::Serialize;

use crate::error::ExecutionError;
use crate::sql::Statement;

pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Succeeded,
    /// The statement failed but the desired end state already holds.
    AcceptableFailure,
    FatalFailure,
}

/// A message fragment that turns a failure into an acceptable one.
#[derive(Debug)]
pub struct SubstringRule {
    /// Matched case-insensitively against the error message.
    pub needle: &'static str,
    /// Only applies to `DROP`-like statements.
    pub drop_only: bool,
}

/// Fallback rules used when the backend does not report a usable SQLSTATE,
/// evaluated in order.
pub const SUBSTRING_RULES: &[SubstringRule] = &[
    SubstringRule {
        needle: "already exists",
        drop_only: false,
    },
    SubstringRule {
        needle: "does not exist",
        drop_only: true,
    },
];

// duplicate_object, duplicate_table, duplicate_function, duplicate_schema, duplicate_database
const DUPLICATE_CODES: &[&str] = &["42710", "42P07", "42723", "42P06", "42P04"];

// undefined_object, undefined_table, undefined_function, invalid_schema_name
const UNDEFINED_CODES: &[&str] = &["42704", "42P01", "42883", "3F000"];

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationPolicy {
    /// Treat every failed `DROP`-like statement as acceptable.
    pub lenient_drop: bool,
    /// Fraction of non-fatal results that must be strictly exceeded.
    pub success_threshold: f64,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        ClassificationPolicy {
            lenient_drop: true,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
        }
    }
}

impl ClassificationPolicy {
    pub fn classify(&self, statement: &Statement, error: &ExecutionError) -> Verdict {
        if self.lenient_drop && statement.is_drop() {
            return Verdict::AcceptableFailure;
        }

        if let Some(code) = error.code.as_deref() {
            if DUPLICATE_CODES.contains(&code) {
                return Verdict::AcceptableFailure;
            }
            if statement.is_drop() && UNDEFINED_CODES.contains(&code) {
                return Verdict::AcceptableFailure;
            }
        }

        let message = error.message.to_lowercase();
        let matched = SUBSTRING_RULES
            .iter()
            .filter(|rule| !rule.drop_only || statement.is_drop())
            .any(|rule| message.contains(rule.needle));

        if matched {
            Verdict::AcceptableFailure
        } else {
            Verdict::FatalFailure
        }
    }

    /// Overall verdict: `successful / total` must be strictly above the threshold.
    pub fn passes(&self, successful: usize, total: usize) -> bool {
        successful as f64 > total as f64 * self.success_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> ClassificationPolicy {
        ClassificationPolicy {
            lenient_drop: false,
            ..ClassificationPolicy::default()
        }
    }

    #[test]
    fn failed_drop_is_always_acceptable() {
        let policy = ClassificationPolicy::default();
        let statement = Statement::new(1, "DROP POLICY nonexistent_policy;");

        for message in ["does not exist", "permission denied", "syntax error at or near"] {
            assert_eq!(
                policy.classify(&statement, &ExecutionError::new(message)),
                Verdict::AcceptableFailure
            );
        }
    }

    #[test]
    fn already_exists_is_acceptable_for_create() {
        let policy = ClassificationPolicy::default();
        let statement = Statement::new(1, "CREATE POLICY p1 ON t FOR SELECT USING (true);");
        let error = ExecutionError::new("policy \"p1\" for table \"t\" ALREADY EXISTS");

        assert_eq!(policy.classify(&statement, &error), Verdict::AcceptableFailure);
    }

    #[test]
    fn other_create_failures_are_fatal() {
        let policy = ClassificationPolicy::default();
        let statement = Statement::new(1, "CREATE POLICY p1 ON t FOR SELECT USING (true);");

        assert_eq!(
            policy.classify(&statement, &ExecutionError::new("syntax error")),
            Verdict::FatalFailure
        );
        assert_eq!(
            policy.classify(&statement, &ExecutionError::new("relation \"t\" does not exist")),
            Verdict::FatalFailure
        );
    }

    #[test]
    fn strict_drop_still_accepts_missing_objects() {
        let statement = Statement::new(1, "DROP POLICY p0 ON t;");

        assert_eq!(
            strict().classify(&statement, &ExecutionError::new("policy \"p0\" does not exist")),
            Verdict::AcceptableFailure
        );
        assert_eq!(
            strict().classify(&statement, &ExecutionError::new("permission denied")),
            Verdict::FatalFailure
        );
    }

    #[test]
    fn sqlstate_takes_precedence_over_message() {
        let create = Statement::new(1, "CREATE TABLE t (id int);");
        let drop = Statement::new(2, "DROP FUNCTION f();");

        assert_eq!(
            strict().classify(&create, &ExecutionError::with_code("duplicate", "42P07")),
            Verdict::AcceptableFailure
        );
        assert_eq!(
            strict().classify(&drop, &ExecutionError::with_code("missing", "42883")),
            Verdict::AcceptableFailure
        );
        assert_eq!(
            strict().classify(&create, &ExecutionError::with_code("missing", "42P01")),
            Verdict::FatalFailure
        );
    }

    #[test]
    fn unknown_code_falls_back_to_substring_rules() {
        let create = Statement::new(1, "CREATE INDEX i ON t (id);");
        let error = ExecutionError::with_code("relation \"i\" already exists", "XX000");

        assert_eq!(strict().classify(&create, &error), Verdict::AcceptableFailure);
    }

    #[test]
    fn threshold_is_strict() {
        let policy = ClassificationPolicy::default();

        assert!(policy.passes(9, 10));
        assert!(!policy.passes(8, 10));
        assert!(!policy.passes(4, 5));
        assert!(!policy.passes(0, 0));
    }

    #[test]
    fn threshold_is_configurable() {
        let policy = ClassificationPolicy {
            success_threshold: 0.5,
            ..ClassificationPolicy::default()
        };

        assert!(policy.passes(6, 10));
        assert!(!policy.passes(5, 10));
    }
}
