pub mod splitter;
pub mod statement;

pub use splitter::split;
pub use statement::{Statement, StatementKind};
