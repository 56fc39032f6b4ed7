use async_trait::async_trait;
use serde_json::Value;

use crate::error::ClientError;

pub mod service_client;

pub use service_client::{ServiceClient, ServiceClientFactory};

/// Column selection, equality filters and row limit for a collection read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadQuery {
    pub columns: String,
    pub filters: Vec<(String, String)>,
    pub limit: Option<usize>,
}

impl ReadQuery {
    pub fn new(columns: impl Into<String>) -> Self {
        ReadQuery {
            columns: columns.into(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

/// Row and account operations against the remote service, as seen by one
/// client identity.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn read_collection(&self, name: &str, query: &ReadQuery)
        -> Result<Vec<Value>, ClientError>;

    /// Returns the created record, including generated columns.
    async fn insert_record(&self, name: &str, fields: &Value) -> Result<Value, ClientError>;

    async fn delete_record(&self, name: &str, id: &Value) -> Result<(), ClientError>;

    /// `Ok(None)` when the service accepted the request without returning a user.
    async fn register_identity(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Option<Identity>, ClientError>;
}
