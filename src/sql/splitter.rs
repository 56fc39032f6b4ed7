use crate::sql::statement::Statement;

const LINE_COMMENT: &str = "--";
const TERMINATOR: char = ';';

/// Splits a migration script into terminated statements.
///
/// Lines starting with `--` are dropped, everything else accumulates until a
/// line ends with `;`. Content left without a terminator at the end of input
/// is discarded. There is no awareness of string literals, quoted identifiers
/// or block comments, so statement boundaries must fall on line endings.
pub fn split(raw: &str) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with(LINE_COMMENT) {
            continue;
        }

        buffer.push(line);

        if trimmed.ends_with(TERMINATOR) {
            let text = buffer.join("\n");
            let text = text.trim();

            if !text.is_empty() {
                statements.push(Statement::new(statements.len() + 1, text));
            }

            buffer.clear();
        }
    }

    if buffer.iter().any(|line| !line.trim().is_empty()) {
        debug!(
            "Dropping {} unterminated line(s) at end of migration source",
            buffer.len()
        );
    }

    statements
}
