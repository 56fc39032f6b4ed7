use serde::Serialize;

use crate::client::{ReadQuery, ResourceClient};
use crate::verify::RECURSION_SIGNATURE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message")]
pub enum ProtectedAccess {
    Healthy,
    RecursionDetected(String),
    Unreachable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionAccess {
    pub name: String,
    pub accessible: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosisReport {
    pub protected: ProtectedAccess,
    pub collections: Vec<CollectionAccess>,
}

impl DiagnosisReport {
    pub fn needs_repair(&self) -> bool {
        !matches!(self.protected, ProtectedAccess::Healthy)
    }
}

/// Read-only look at the service before anything is changed: checks the
/// protected collection for recursive policies, then each sweep collection.
pub async fn diagnose(
    client: &dyn ResourceClient,
    protected_collection: &str,
    sweep_collections: &[String],
) -> DiagnosisReport {
    info!("Checking access to {}", protected_collection);

    let query = ReadQuery::new("id").limit(1);

    let protected = match client.read_collection(protected_collection, &query).await {
        Ok(_) => {
            info!("{} is readable", protected_collection);
            ProtectedAccess::Healthy
        }
        Err(err) if err.message().contains(RECURSION_SIGNATURE) => {
            error!(
                "Infinite recursion detected in the policies of {}",
                protected_collection
            );
            ProtectedAccess::RecursionDetected(err.message().to_string())
        }
        Err(err) => {
            warn!("{} is not readable: {}", protected_collection, err);
            ProtectedAccess::Unreachable(err.message().to_string())
        }
    };

    let mut collections = Vec::with_capacity(sweep_collections.len());

    for name in sweep_collections {
        let access = match client.read_collection(name, &query).await {
            Ok(rows) => {
                info!("{}: accessible ({} records)", name, rows.len());
                CollectionAccess {
                    name: name.clone(),
                    accessible: true,
                    error: None,
                }
            }
            Err(err) => {
                warn!("{}: {}", name, err.message());
                CollectionAccess {
                    name: name.clone(),
                    accessible: false,
                    error: Some(err.message().to_string()),
                }
            }
        };
        collections.push(access);
    }

    DiagnosisReport {
        protected,
        collections,
    }
}
