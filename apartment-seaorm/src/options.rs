//! Connect options for tenant databases.

use crate::{SeaOrmError, SeaOrmResult};
use apartment_tenancy::TenantConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Pool settings applied to every tenant connection.
///
/// Each tenant's `params` may override `max_connections`,
/// `min_connections`, `connect_timeout` (seconds) and `schema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeaOrmOptions {
    /// Maximum number of connections in each tenant's pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in each tenant's pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout.
    #[serde(default = "default_connect_timeout")]
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Idle timeout for pooled connections.
    #[serde(default = "default_idle_timeout")]
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// Maximum lifetime of a pooled connection.
    #[serde(default = "default_max_lifetime")]
    #[serde(with = "humantime_serde")]
    pub max_lifetime: Duration,

    /// Enable SQLx statement logging.
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    0
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_lifetime() -> Duration {
    Duration::from_secs(30 * 60)
}

impl Default for SeaOrmOptions {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
            max_lifetime: default_max_lifetime(),
            sqlx_logging: false,
        }
    }
}

impl SeaOrmOptions {
    /// Set the maximum number of connections per tenant.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the minimum number of connections per tenant.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum lifetime of a pooled connection.
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Enable or disable SQLx logging.
    pub fn sqlx_logging(mut self, enabled: bool) -> Self {
        self.sqlx_logging = enabled;
        self
    }

    /// Build SeaORM connect options for one tenant.
    pub fn to_connect_options(&self, config: &TenantConfig) -> SeaOrmResult<sea_orm::ConnectOptions> {
        let url = config.database_url()?;
        let mut options = sea_orm::ConnectOptions::new(url);

        let max = param_or(config, "max_connections", self.max_connections)?;
        let min = param_or(config, "min_connections", self.min_connections)?;
        let timeout = param_or(config, "connect_timeout", self.connect_timeout.as_secs())?;

        options
            .max_connections(max)
            .min_connections(min.min(max))
            .connect_timeout(Duration::from_secs(timeout))
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .sqlx_logging(self.sqlx_logging);

        if let Some(schema) = config.param("schema") {
            options.set_schema_search_path(schema.to_string());
        }

        Ok(options)
    }
}

fn param_or<T: FromStr>(config: &TenantConfig, key: &str, fallback: T) -> SeaOrmResult<T> {
    match config.param(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            SeaOrmError::Config(format!(
                "tenant '{}' has invalid {}: {}",
                config.tenant_id(),
                key,
                raw
            ))
        }),
        None => Ok(fallback),
    }
}
