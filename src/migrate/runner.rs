use tokio::time::Instant;

use crate::executor::SqlExecutor;
use crate::migrate::classifier::{ClassificationPolicy, Verdict};
use crate::migrate::migration_result::{AggregateReport, ClassifiedResult, ExecutionOutcome};
use crate::sql::Statement;

const REPORTED_FAILURES: usize = 5;

pub struct MigrationRunner<E: SqlExecutor> {
    executor: E,
    policy: ClassificationPolicy,
}

impl<E: SqlExecutor> MigrationRunner<E> {
    pub fn new(executor: E, policy: ClassificationPolicy) -> Self {
        MigrationRunner { executor, policy }
    }

    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    /// Executes every statement once, in order. A failing statement never
    /// stops the ones after it; the verdict is the only failure signal.
    pub async fn run(&self, statements: &[Statement]) -> AggregateReport {
        let start_time = Instant::now();
        let total = statements.len();

        info!("Executing {} SQL statements", total);

        let mut results = Vec::with_capacity(total);

        for statement in statements {
            let result = self.execute_statement(statement, total).await;
            results.push(result);
        }

        let report = AggregateReport::from_results(&results, |successful, total| {
            self.policy.passes(successful, total)
        });

        log_summary(&report);

        info!(
            "Migration finished, total time took: {}s",
            Instant::now()
                .saturating_duration_since(start_time)
                .as_secs_f32()
        );

        report
    }

    async fn execute_statement(&self, statement: &Statement, total: usize) -> ClassifiedResult {
        debug!("[{}/{}] {}", statement.index, total, statement.text);

        let result = self.executor.execute(&statement.text).await.map(|_| ());
        let outcome = ExecutionOutcome::new(statement, result);

        let verdict = match &outcome.error {
            None => {
                info!("[{}/{}] {} statement executed", statement.index, total, statement.kind);
                Verdict::Succeeded
            }
            Some(err) => {
                let verdict = self.policy.classify(statement, err);
                match verdict {
                    Verdict::AcceptableFailure => info!(
                        "[{}/{}] {} statement failed acceptably: {}",
                        statement.index, total, statement.kind, err
                    ),
                    _ => warn!(
                        "[{}/{}] Statement failed: {}",
                        statement.index, total, err
                    ),
                }
                verdict
            }
        };

        ClassifiedResult { outcome, verdict }
    }
}

fn log_summary(report: &AggregateReport) {
    info!(
        "Execution summary - Successful: {}/{} | Failed: {}",
        report.successful(),
        report.total,
        report.fatal.len()
    );

    for failure in report.fatal.iter().take(REPORTED_FAILURES) {
        warn!(
            "Statement {}: {}... └> {}",
            failure.index, failure.statement, failure.message
        );
    }

    if report.passed {
        info!("Migration verdict: passed");
    } else {
        warn!("Migration verdict: failed");
    }
}
