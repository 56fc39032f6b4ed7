use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use toml::Value;

use crate::migrate::classifier::{ClassificationPolicy, DEFAULT_SUCCESS_THRESHOLD};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    service: ServiceConfig,
    migration: MigrationConfig,
    policy: ClassificationPolicy,
    verification: VerificationConfig,
}

#[derive(Clone)]
pub struct ServiceConfig {
    pub url: String,
    pub service_key: String,
    pub anon_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("url", &self.url)
            .field("service_key", &"***")
            .field("anon_key", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub source: PathBuf,
    pub rpc: RpcConfig,
}

/// Remote function that runs raw SQL, and the name of its text argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub function: String,
    pub parameter: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        RpcConfig {
            function: "exec_sql".to_string(),
            parameter: "sql".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionProbe {
    pub name: String,
    pub columns: String,
    pub limit: usize,
    pub filters: Vec<(String, String)>,
}

impl CollectionProbe {
    fn new(name: &str, columns: &str, limit: usize) -> Self {
        CollectionProbe {
            name: name.to_string(),
            columns: columns.to_string(),
            limit,
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationConfig {
    pub protected_collection: String,
    /// Read through the unprivileged identity, in order.
    pub public_collections: [CollectionProbe; 2],
    pub writable_collection: String,
    pub throwaway_record: serde_json::Value,
    pub registration_prefix: String,
    pub registration_domain: String,
    pub registration_secret: String,
    /// Collections checked for accessibility by the diagnosis.
    pub sweep_collections: Vec<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        VerificationConfig {
            protected_collection: "users".to_string(),
            public_collections: [
                CollectionProbe::new("businesses", "id, name", 3),
                CollectionProbe::new("coupons", "id, title", 3),
            ],
            writable_collection: "businesses".to_string(),
            throwaway_record: json!({
                "name": "Test Business Fixed",
                "description": "Testing after RLS fix",
                "category": "Food & Beverage",
                "address": "123 Fixed Street",
                "latitude": 40.7128,
                "longitude": -74.0060,
                "active": true
            }),
            registration_prefix: "fixed-test".to_string(),
            registration_domain: "example.com".to_string(),
            registration_secret: "TestPassword123!".to_string(),
            sweep_collections: ["users", "businesses", "coupons", "redemptions"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl Config {
    pub fn from_toml(config: Value) -> Result<Self> {
        let service = parse_service_config(
            config
                .get("service")
                .ok_or(anyhow!("Missing or invalid service settings"))?,
        )?;
        let migration = parse_migration_config(
            config
                .get("migration")
                .ok_or(anyhow!("Missing or invalid migration settings"))?,
        )?;
        let policy = match config.get("policy") {
            Some(policy) => parse_policy_config(policy).context("Invalid policy settings")?,
            None => ClassificationPolicy::default(),
        };
        let verification = match config.get("verification") {
            Some(verification) => parse_verification_config(verification)
                .context("Invalid verification settings")?,
            None => VerificationConfig::default(),
        };

        Ok(Config {
            service,
            migration,
            policy,
            verification,
        })
    }

    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }

    pub fn migration(&self) -> &MigrationConfig {
        &self.migration
    }

    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    pub fn verification(&self) -> &VerificationConfig {
        &self.verification
    }

    pub fn override_source(&mut self, source: PathBuf) {
        self.migration.source = source;
    }
}

fn required_str(config: &Value, key: &str) -> Result<String> {
    let value = config
        .get(key)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("Missing or invalid {}", key))?;

    if value.trim().is_empty() {
        bail!("Empty {}", key);
    }

    Ok(value.to_string())
}

fn optional_str(config: &Value, key: &str, default: &str) -> Result<String> {
    match config.get(key) {
        Some(value) => Ok(value
            .as_str()
            .ok_or_else(|| anyhow!("Invalid {}", key))?
            .to_string()),
        None => Ok(default.to_string()),
    }
}

fn parse_service_config(config: &Value) -> Result<ServiceConfig> {
    let url = required_str(config, "url")?;
    let service_key = required_str(config, "service_key")?;
    let anon_key = required_str(config, "anon_key")?;

    let timeout_secs: u64 = match config.get("timeout_secs") {
        Some(value) => value
            .as_integer()
            .ok_or_else(|| anyhow!("Invalid timeout_secs"))?
            .try_into()
            .context("timeout_secs must not be negative")?,
        None => DEFAULT_TIMEOUT_SECS,
    };

    if timeout_secs == 0 {
        bail!("timeout_secs must be greater than zero");
    }

    Ok(ServiceConfig {
        url,
        service_key,
        anon_key,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_migration_config(config: &Value) -> Result<MigrationConfig> {
    let source = PathBuf::from(required_str(config, "source")?);
    let defaults = RpcConfig::default();

    let rpc = RpcConfig {
        function: optional_str(config, "rpc_function", &defaults.function)?,
        parameter: optional_str(config, "rpc_parameter", &defaults.parameter)?,
    };

    Ok(MigrationConfig { source, rpc })
}

fn parse_policy_config(config: &Value) -> Result<ClassificationPolicy> {
    let success_threshold = match config.get("success_threshold") {
        Some(value) => value
            .as_float()
            .or_else(|| value.as_integer().map(|v| v as f64))
            .ok_or_else(|| anyhow!("Invalid success_threshold"))?,
        None => DEFAULT_SUCCESS_THRESHOLD,
    };

    if !(0.0..=1.0).contains(&success_threshold) {
        bail!(
            "success_threshold must be between 0 and 1, got {}",
            success_threshold
        );
    }

    let lenient_drop = match config.get("lenient_drop") {
        Some(value) => value
            .as_bool()
            .ok_or_else(|| anyhow!("Invalid lenient_drop"))?,
        None => true,
    };

    Ok(ClassificationPolicy {
        lenient_drop,
        success_threshold,
    })
}

fn parse_collection_probe(config: &Value) -> Result<CollectionProbe> {
    let name = required_str(config, "name")?;
    let columns = optional_str(config, "columns", "id")?;
    let limit: usize = match config.get("limit") {
        Some(value) => value
            .as_integer()
            .ok_or_else(|| anyhow!("Invalid limit"))?
            .try_into()
            .context("limit must not be negative")?,
        None => 3,
    };

    let filters = match config.get("filter") {
        Some(filter) => filter
            .as_table()
            .ok_or_else(|| anyhow!("filter must be a table"))?
            .iter()
            .map(|(column, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (column.clone(), value)
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(CollectionProbe {
        name,
        columns,
        limit,
        filters,
    })
}

fn parse_verification_config(config: &Value) -> Result<VerificationConfig> {
    let defaults = VerificationConfig::default();

    let public_collections = match config.get("public_collections") {
        Some(value) => {
            let probes = value
                .as_array()
                .ok_or_else(|| anyhow!("public_collections must be an array"))?
                .iter()
                .map(parse_collection_probe)
                .collect::<Result<Vec<_>>>()?;

            <[CollectionProbe; 2]>::try_from(probes).map_err(|probes| {
                anyhow!(
                    "public_collections needs exactly 2 entries, got {}",
                    probes.len()
                )
            })?
        }
        None => defaults.public_collections,
    };

    let throwaway_record = match config.get("throwaway_record") {
        Some(value) => {
            if !value.is_table() {
                bail!("throwaway_record must be a table");
            }
            serde_json::to_value(value).context("Invalid throwaway_record")?
        }
        None => defaults.throwaway_record,
    };

    let sweep_collections = match config.get("sweep_collections") {
        Some(value) => value
            .as_array()
            .ok_or_else(|| anyhow!("sweep_collections must be an array"))?
            .iter()
            .filter_map(|value| value.as_str().map(|s| s.to_string()))
            .collect::<Vec<String>>(),
        None => defaults.sweep_collections,
    };

    Ok(VerificationConfig {
        protected_collection: optional_str(
            config,
            "protected_collection",
            &defaults.protected_collection,
        )?,
        public_collections,
        writable_collection: optional_str(
            config,
            "writable_collection",
            &defaults.writable_collection,
        )?,
        throwaway_record,
        registration_prefix: optional_str(
            config,
            "registration_prefix",
            &defaults.registration_prefix,
        )?,
        registration_domain: optional_str(
            config,
            "registration_domain",
            &defaults.registration_domain,
        )?,
        registration_secret: optional_str(
            config,
            "registration_secret",
            &defaults.registration_secret,
        )?,
        sweep_collections,
    })
}
