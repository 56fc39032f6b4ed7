pub mod classifier;
pub mod migration_result;
pub mod runner;

pub use classifier::{ClassificationPolicy, Verdict};
pub use migration_result::{AggregateReport, FatalFailure};
pub use runner::MigrationRunner;
