//! Registry configuration
//!
//! Loads the default connection and the tenant list from TOML or from the
//! environment.
//!
//! ```toml
//! max_connections = 16
//!
//! [default]
//! url = "postgres://app@localhost/app"
//!
//! [[tenants]]
//! id = "acme"
//! host = "db-1.internal"
//! port = 5432
//! database = "acme"
//!
//! [[tenants]]
//! id = "beta"
//! url = "postgres://app@db-2.internal/beta"
//! ```
//!
//! Tenants are registered in file order.

use crate::connection::ConnectionFactory;
use crate::error::{Result, TenantError};
use crate::pool::{ConnectionPool, DEFAULT_MAX_CONNECTIONS};
use crate::registry::TenantRegistry;
use crate::tenant::{DEFAULT_TENANT, TenantConfig};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::Path;
use std::sync::Arc;

/// Environment variable holding the default database URL.
pub const DATABASE_URL_ENV: &str = "APARTMENT_DATABASE_URL";
/// Environment variable bounding cached tenant connections.
pub const MAX_CONNECTIONS_ENV: &str = "APARTMENT_MAX_CONNECTIONS";
/// Environment variable listing tenants as `id=url` pairs separated by commas.
pub const TENANTS_ENV: &str = "APARTMENT_TENANTS";

#[derive(Deserialize)]
struct RawConfig {
    max_connections: Option<usize>,
    default: toml::Table,
    #[serde(default)]
    tenants: Vec<toml::Table>,
}

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum cached tenant connections
    pub max_connections: usize,
    /// Non-tenant-scoped connection
    pub default: TenantConfig,
    /// Tenants, in registration order
    pub tenants: Vec<TenantConfig>,
}

impl RegistryConfig {
    pub fn new(default: TenantConfig) -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            default,
            tenants: Vec::new(),
        }
    }

    pub fn with_tenant(mut self, tenant: TenantConfig) -> Self {
        self.tenants.push(tenant);
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let default = TenantConfig::from_params(DEFAULT_TENANT, stringify(raw.default));
        let tenants = raw
            .tenants
            .into_iter()
            .map(|mut table| {
                let id = match table.remove("id") {
                    Some(toml::Value::String(id)) => id,
                    Some(other) => {
                        return Err(TenantError::Config(format!(
                            "tenant id must be a string, got {}",
                            other
                        )));
                    }
                    None => {
                        return Err(TenantError::Config(
                            "tenant entry is missing 'id'".to_string(),
                        ));
                    }
                };
                Ok(TenantConfig::from_params(id, stringify(table)))
            })
            .collect::<Result<Vec<_>>>()?;

        let config = Self {
            max_connections: raw.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            default,
            tenants,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TenantError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Build from environment variables
    ///
    /// Uses the following environment variables (a `.env` file is honoured):
    /// - `APARTMENT_DATABASE_URL`: Required default database URL
    /// - `APARTMENT_MAX_CONNECTIONS`: Cached tenant connections (default: 32)
    /// - `APARTMENT_TENANTS`: `id=url` pairs, comma separated
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = env::var(DATABASE_URL_ENV)
            .map_err(|_| TenantError::Config(format!("{} not set", DATABASE_URL_ENV)))?;
        let mut config = Self::new(TenantConfig::from_url(DEFAULT_TENANT, url));

        if let Ok(max) = env::var(MAX_CONNECTIONS_ENV) {
            config.max_connections = max
                .trim()
                .parse()
                .map_err(|_| TenantError::Config(format!("Invalid {}", MAX_CONNECTIONS_ENV)))?;
        }

        if let Ok(tenants) = env::var(TENANTS_ENV) {
            for entry in tenants.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let (id, url) = entry.split_once('=').ok_or_else(|| {
                    TenantError::Config(format!("Invalid {} entry: {}", TENANTS_ENV, entry))
                })?;
                config
                    .tenants
                    .push(TenantConfig::from_url(id.trim(), url.trim()));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check ids and limits
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(TenantError::Config(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        if self.default.params().is_empty() {
            return Err(TenantError::Config(
                "default connection has no parameters".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            let id = tenant.tenant_id();
            if id.trim().is_empty() {
                return Err(TenantError::Config("tenant id must not be empty".to_string()));
            }
            if id == DEFAULT_TENANT {
                return Err(TenantError::Config(format!(
                    "'{}' is reserved and cannot be listed as a tenant",
                    DEFAULT_TENANT
                )));
            }
            if !seen.insert(id) {
                return Err(TenantError::Config(format!("duplicate tenant id '{}'", id)));
            }
        }
        Ok(())
    }

    pub fn into_registry(self) -> Result<TenantRegistry> {
        self.validate()?;
        let registry = TenantRegistry::new(self.default);
        for tenant in self.tenants {
            registry.register(tenant)?;
        }
        Ok(registry)
    }

    /// Build a pool with this configuration's registry and connection bound
    pub fn into_pool<F: ConnectionFactory>(self, factory: F) -> Result<ConnectionPool<F>> {
        let max_connections = self.max_connections;
        let registry = Arc::new(self.into_registry()?);
        Ok(ConnectionPool::new(registry, factory).with_max_connections(max_connections))
    }
}

fn stringify(table: toml::Table) -> BTreeMap<String, String> {
    table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}
