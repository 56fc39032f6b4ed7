use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{Identity, ReadQuery, ResourceClient};
use crate::config::{RpcConfig, ServiceConfig};
use crate::error::{ClientError, ExecutionError};
use crate::executor::SqlExecutor;

const REST_PATH: &str = "rest/v1";
const AUTH_PATH: &str = "auth/v1";

/// Error payload of the REST and auth endpoints. Field names differ between
/// the two, so everything is optional.
#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    code: Option<Value>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

impl ErrorBody {
    fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }

    fn message(&self, fallback: &str) -> String {
        let message = self
            .message
            .as_ref()
            .or(self.msg.as_ref())
            .or(self.error_description.as_ref())
            .or(self.error.as_ref())
            .cloned()
            .unwrap_or_else(|| fallback.to_string());

        match &self.details {
            Some(details) if !details.is_empty() => format!("{} ({})", message, details),
            _ => message,
        }
    }

    /// SQLSTATE codes come back as strings; numeric codes are HTTP statuses.
    fn sqlstate(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(code)) => Some(code.clone()),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug)]
struct SignUpResponse {
    user: Option<UserBody>,
    id: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UserBody {
    id: String,
    email: Option<String>,
}

/// One identity on the hosted service: every request carries the same key.
#[derive(Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
    key: String,
    rpc: RpcConfig,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_url", &self.base_url)
            .field("key", &"***")
            .field("rpc", &self.rpc)
            .finish()
    }
}

impl ServiceClient {
    pub fn new(base_url: &str, key: &str, timeout: Duration, rpc: RpcConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(ServiceClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            rpc,
        })
    }

    fn rest_url(&self, resource: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, resource)
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_url, AUTH_PATH, endpoint)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.key).bearer_auth(&self.key)
    }

    async fn query_error(response: Response) -> ClientError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body = ErrorBody::parse(&text);

        ClientError::Query {
            status: status.as_u16(),
            message: body.message(&fallback_message(status, &text)),
            code: body.sqlstate(),
        }
    }

    async fn auth_error(response: Response) -> ClientError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body = ErrorBody::parse(&text);

        ClientError::Auth {
            status: status.as_u16(),
            message: body.message(&fallback_message(status, &text)),
        }
    }
}

fn fallback_message(status: StatusCode, text: &str) -> String {
    if text.trim().is_empty() {
        status.to_string()
    } else {
        text.trim().to_string()
    }
}

fn record_id_param(id: &Value) -> String {
    match id {
        Value::String(id) => format!("eq.{}", id),
        other => format!("eq.{}", other),
    }
}

#[async_trait]
impl SqlExecutor for ServiceClient {
    async fn execute(&self, sql: &str) -> Result<Value, ExecutionError> {
        let url = self.rest_url(&format!("rpc/{}", self.rpc.function));
        let mut body = serde_json::Map::new();
        body.insert(self.rpc.parameter.clone(), Value::String(sql.to_string()));

        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|err| ExecutionError::new(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ExecutionError::new(err.to_string()))?;

        if !status.is_success() {
            let body = ErrorBody::parse(&text);
            let message = body.message(&fallback_message(status, &text));
            return Err(ExecutionError {
                message,
                code: body.sqlstate(),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[async_trait]
impl ResourceClient for ServiceClient {
    async fn read_collection(
        &self,
        name: &str,
        query: &ReadQuery,
    ) -> Result<Vec<Value>, ClientError> {
        let mut params = vec![("select".to_string(), query.columns.clone())];
        params.extend(
            query
                .filters
                .iter()
                .map(|(column, value)| (column.clone(), format!("eq.{}", value))),
        );
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        let response = self
            .authorized(self.client.get(self.rest_url(name)))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::query_error(response).await);
        }

        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn insert_record(&self, name: &str, fields: &Value) -> Result<Value, ClientError> {
        let response = self
            .authorized(self.client.post(self.rest_url(name)))
            .header("Prefer", "return=representation")
            .json(fields)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::query_error(response).await);
        }

        let mut records = response.json::<Vec<Value>>().await?;
        if records.is_empty() {
            return Err(ClientError::Decode(format!(
                "Insert into {} returned no record",
                name
            )));
        }

        Ok(records.swap_remove(0))
    }

    async fn delete_record(&self, name: &str, id: &Value) -> Result<(), ClientError> {
        let response = self
            .authorized(self.client.delete(self.rest_url(name)))
            .query(&[("id", record_id_param(id))])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::query_error(response).await);
        }

        Ok(())
    }

    async fn register_identity(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Option<Identity>, ClientError> {
        let response = self
            .authorized(self.client.post(self.auth_url("signup")))
            .json(&json!({ "email": identifier, "password": secret }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }

        let body = response.json::<SignUpResponse>().await?;

        let identity = match (body.user, body.id) {
            (Some(user), _) => Some(Identity {
                id: user.id,
                email: user.email,
            }),
            (None, Some(id)) => Some(Identity {
                id,
                email: body.email,
            }),
            (None, None) => None,
        };

        Ok(identity)
    }
}

/// Builds the privileged and unprivileged identities for one service endpoint.
pub struct ServiceClientFactory {
    config: ServiceConfig,
    rpc: RpcConfig,
}

impl ServiceClientFactory {
    pub fn new(config: ServiceConfig, rpc: RpcConfig) -> Self {
        ServiceClientFactory { config, rpc }
    }

    /// Uses the service key, which bypasses row-level policies.
    pub fn privileged(&self) -> Result<ServiceClient> {
        ServiceClient::new(
            &self.config.url,
            &self.config.service_key,
            self.config.timeout,
            self.rpc.clone(),
        )
        .context("Failed to create privileged client")
    }

    pub fn unprivileged(&self) -> Result<ServiceClient> {
        ServiceClient::new(
            &self.config.url,
            &self.config.anon_key,
            self.config.timeout,
            self.rpc.clone(),
        )
        .context("Failed to create unprivileged client")
    }
}
