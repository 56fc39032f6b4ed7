use serde_json::Value;
use uuid::Uuid;

use crate::client::{ReadQuery, ResourceClient};
use crate::config::{CollectionProbe, VerificationConfig};
use crate::verify::probe::{ProbeDiagnostic, ProbeResult, VerificationReport};

/// Post-migration checks. The privileged client bypasses row-level policies,
/// the unprivileged one is subject to them.
pub struct VerificationSuite<'a> {
    privileged: &'a dyn ResourceClient,
    unprivileged: &'a dyn ResourceClient,
    settings: VerificationConfig,
}

impl<'a> VerificationSuite<'a> {
    pub fn new(
        privileged: &'a dyn ResourceClient,
        unprivileged: &'a dyn ResourceClient,
        settings: VerificationConfig,
    ) -> Self {
        VerificationSuite {
            privileged,
            unprivileged,
            settings,
        }
    }

    /// Runs every probe in order. A failing probe never skips the next one.
    pub async fn run(&self) -> VerificationReport {
        info!("Running verification probes");

        let [first_public, second_public] = &self.settings.public_collections;

        let results = vec![
            self.read_protected_collection().await,
            self.read_public_collection(first_public).await,
            self.create_and_delete_record().await,
            self.read_public_collection(second_public).await,
            self.register_account().await,
        ];

        let report = VerificationReport { results };

        for (index, result) in report.results.iter().enumerate() {
            match (&result.diagnostic, result.passed) {
                (None, _) => info!("[{}] {}: passed", index + 1, result.name),
                (Some(diagnostic), true) => {
                    info!("[{}] {}: passed ({})", index + 1, result.name, diagnostic)
                }
                (Some(diagnostic), false) => {
                    warn!("[{}] {}: failed └> {}", index + 1, result.name, diagnostic)
                }
            }
        }

        info!(
            "Verification summary - Passed: {} | Failed: {}",
            report.passed_count(),
            report.failed_count()
        );

        report
    }

    async fn read_protected_collection(&self) -> ProbeResult {
        let collection = &self.settings.protected_collection;
        let name = format!("privileged read of {}", collection);
        let query = ReadQuery::new("id").limit(1);

        match self.privileged.read_collection(collection, &query).await {
            Ok(_) => ProbeResult::pass(&name),
            Err(err) => ProbeResult::from_error(&name, &err),
        }
    }

    async fn read_public_collection(&self, probe: &CollectionProbe) -> ProbeResult {
        let name = format!("unprivileged read of {}", probe.name);
        let query = probe
            .filters
            .iter()
            .fold(ReadQuery::new(probe.columns.as_str()), |query, (column, value)| {
                query.filter(column.as_str(), value.as_str())
            })
            .limit(probe.limit);

        match self.unprivileged.read_collection(&probe.name, &query).await {
            Ok(rows) if rows.len() <= probe.limit => {
                ProbeResult::pass_with_note(&name, format!("{} records", rows.len()))
            }
            Ok(rows) => ProbeResult::fail(
                &name,
                ProbeDiagnostic::Error(format!(
                    "expected at most {} records, got {}",
                    probe.limit,
                    rows.len()
                )),
            ),
            Err(err) => ProbeResult::from_error(&name, &err),
        }
    }

    async fn create_and_delete_record(&self) -> ProbeResult {
        let collection = &self.settings.writable_collection;
        let name = format!("create and delete a row in {}", collection);

        let record = match self
            .privileged
            .insert_record(collection, &self.settings.throwaway_record)
            .await
        {
            Ok(record) => record,
            Err(err) => return ProbeResult::from_error(&name, &err),
        };

        let id = match record.get("id") {
            Some(id) if !id.is_null() => id.clone(),
            _ => {
                warn!(
                    "Record created in {} without an id, it cannot be cleaned up",
                    collection
                );
                return ProbeResult::fail(
                    &name,
                    ProbeDiagnostic::Error("creation returned no generated id".to_string()),
                );
            }
        };

        debug!("Created throwaway record {} in {}", id, collection);

        match self.privileged.delete_record(collection, &id).await {
            Ok(()) => ProbeResult::pass_with_note(
                &name,
                format!("created and removed {}", display_id(&id)),
            ),
            Err(err) => {
                warn!("Throwaway record {} in {} was not removed", id, collection);
                ProbeResult::fail(
                    &name,
                    ProbeDiagnostic::Error(format!("cleanup failed: {}", err.message())),
                )
            }
        }
    }

    async fn register_account(&self) -> ProbeResult {
        let name = "register an account";
        let identifier = format!(
            "{}-{}@{}",
            self.settings.registration_prefix,
            Uuid::new_v4().simple(),
            self.settings.registration_domain
        );

        debug!("Registering {}", identifier);

        match self
            .unprivileged
            .register_identity(&identifier, &self.settings.registration_secret)
            .await
        {
            Ok(Some(identity)) => {
                ProbeResult::pass_with_note(name, format!("user {}", identity.id))
            }
            Ok(None) => ProbeResult::pass_with_note(name, "registration returned no user"),
            Err(err) => ProbeResult::from_error(name, &err),
        }
    }
}

fn display_id(id: &Value) -> String {
    match id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    }
}
