use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;

use crate::error::ConfigurationError;
use crate::executor::SqlExecutor;
use crate::migrate::{AggregateReport, ClassificationPolicy, MigrationRunner};
use crate::sql::split;
use crate::verify::{VerificationReport, VerificationSuite};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairOutcome {
    pub report: AggregateReport,
    pub verification: Option<VerificationReport>,
}

impl RepairOutcome {
    pub fn succeeded(&self) -> bool {
        self.report.passed
            && self
                .verification
                .as_ref()
                .map_or(true, VerificationReport::passed)
    }
}

pub fn load_source(path: &Path) -> Result<String, ConfigurationError> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConfigurationError::MissingSource(path.to_path_buf()),
        _ => ConfigurationError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if content.trim().is_empty() {
        return Err(ConfigurationError::EmptySource(path.to_path_buf()));
    }

    debug!("Loaded {} ({} characters)", path.display(), content.len());

    Ok(content)
}

/// Applies a migration source, then optionally verifies its effect.
pub struct RepairPipeline<E: SqlExecutor> {
    runner: MigrationRunner<E>,
}

impl<E: SqlExecutor> RepairPipeline<E> {
    pub fn new(executor: E, policy: ClassificationPolicy) -> Self {
        RepairPipeline {
            runner: MigrationRunner::new(executor, policy),
        }
    }

    pub async fn run_migration(&self, source: &str) -> AggregateReport {
        let statements = split(source);

        info!("Prepared {} SQL statements", statements.len());

        self.runner.run(&statements).await
    }

    /// Probes run whatever the migration verdict was: the verdict tolerates
    /// some fatal statements, so only the probes show the actual effect.
    pub async fn repair(
        &self,
        source_path: &Path,
        suite: Option<&VerificationSuite<'_>>,
    ) -> Result<RepairOutcome, ConfigurationError> {
        let source = load_source(source_path)?;
        let report = self.run_migration(&source).await;

        if !report.passed {
            warn!("Some statements may have failed, continuing with verification");
        }

        let verification = match suite {
            Some(suite) => Some(suite.run().await),
            None => {
                info!("Verification skipped");
                None
            }
        };

        Ok(RepairOutcome {
            report,
            verification,
        })
    }
}
