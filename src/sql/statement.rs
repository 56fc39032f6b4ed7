use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Removes an object that may or may not exist.
    Drop,
    Constructive,
}

impl StatementKind {
    /// Advisory tag only: any occurrence of the case-sensitive token `DROP` counts.
    pub fn of(text: &str) -> Self {
        if text.contains("DROP") {
            StatementKind::Drop
        } else {
            StatementKind::Constructive
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StatementKind::Drop => write!(f, "DROP"),
            StatementKind::Constructive => write!(f, "CREATE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub index: usize,
    pub text: String,
    pub kind: StatementKind,
}

impl Statement {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = StatementKind::of(&text);

        Statement { index, text, kind }
    }

    pub fn is_drop(&self) -> bool {
        self.kind == StatementKind::Drop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_token_is_case_sensitive() {
        assert_eq!(StatementKind::of("DROP POLICY p0;"), StatementKind::Drop);
        assert_eq!(StatementKind::of("drop policy p0;"), StatementKind::Constructive);
    }

    #[test]
    fn drop_token_matches_anywhere() {
        let statement = Statement::new(1, "ALTER TABLE t DROP COLUMN c;");
        assert!(statement.is_drop());
    }
}
