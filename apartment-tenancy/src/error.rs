//! Tenant errors
//!
//! Every failure that leaves this crate names the tenant it concerns, so a
//! bulk run over many databases can be diagnosed from the error alone.

use thiserror::Error;

/// Boxed error used for causes coming from collaborators (resolver hooks,
/// connection factories, caller operations).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for tenancy operations.
pub type Result<T> = std::result::Result<T, TenantError>;

/// Errors raised while resolving, connecting or switching tenants.
#[derive(Debug, Error)]
pub enum TenantError {
    /// No configuration is registered for the tenant and none could be derived.
    #[error("Tenant not found: {tenant_id}")]
    NotFound {
        tenant_id: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The tenant's configuration is known but the database could not be reached.
    #[error("Failed to connect to database for tenant '{tenant_id}'")]
    Connection {
        tenant_id: String,
        #[source]
        source: BoxError,
    },

    /// An operation run on behalf of a tenant failed.
    #[error("Operation failed for tenant '{tenant_id}'")]
    Operation {
        tenant_id: String,
        #[source]
        source: BoxError,
    },

    #[error("Invalid tenant identifier: {0}")]
    Invalid(String),

    /// Provisioning requests; databases are managed outside this crate.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TenantError {
    /// Tenant not found, without an underlying cause.
    pub fn not_found(tenant_id: impl Into<String>) -> Self {
        TenantError::NotFound {
            tenant_id: tenant_id.into(),
            source: None,
        }
    }

    /// The tenant this error concerns, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            TenantError::NotFound { tenant_id, .. }
            | TenantError::Connection { tenant_id, .. }
            | TenantError::Operation { tenant_id, .. } => Some(tenant_id),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TenantError::NotFound { .. })
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, TenantError::Connection { .. })
    }
}

impl From<toml::de::Error> for TenantError {
    fn from(err: toml::de::Error) -> Self {
        TenantError::Config(format!("TOML parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_not_found_has_no_source() {
        let err = TenantError::not_found("ghost");
        assert_eq!(err.to_string(), "Tenant not found: ghost");
        assert_eq!(err.tenant_id(), Some("ghost"));
        assert!(err.source().is_none());
    }

    #[test]
    fn test_connection_keeps_cause() {
        let err = TenantError::Connection {
            tenant_id: "acme".to_string(),
            source: "connection refused".into(),
        };
        assert!(err.is_connection());
        assert!(!err.is_not_found());
        assert_eq!(err.source().unwrap().to_string(), "connection refused");
    }

    #[test]
    fn test_unscoped_errors_have_no_tenant() {
        assert_eq!(TenantError::Invalid("".into()).tenant_id(), None);
        assert_eq!(TenantError::Unsupported("create".into()).tenant_id(), None);
    }
}
