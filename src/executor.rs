use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExecutionError;

/// Submits raw SQL to the remote service. Calls are independent; no
/// transaction spans two of them.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<Value, ExecutionError>;
}

#[async_trait]
impl<E: SqlExecutor + ?Sized> SqlExecutor for &E {
    async fn execute(&self, sql: &str) -> Result<Value, ExecutionError> {
        (**self).execute(sql).await
    }
}
