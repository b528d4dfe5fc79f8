//! Config Resolution
//!
//! Pluggable hook that derives a tenant's configuration the first time an
//! unregistered tenant is requested.

use crate::error::BoxError;
use crate::tenant::TenantConfig;
use async_trait::async_trait;

/// Config resolver trait
///
/// Implement this to derive configurations on demand, e.g. from a control
/// database or a naming convention. Returning `Ok(None)` means the tenant
/// does not exist.
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    /// Derive the configuration for `tenant_id`
    async fn derive(&self, tenant_id: &str) -> Result<Option<TenantConfig>, BoxError>;
}

/// Resolver that knows no tenants
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

#[async_trait]
impl ConfigResolver for NoResolver {
    async fn derive(&self, _tenant_id: &str) -> Result<Option<TenantConfig>, BoxError> {
        Ok(None)
    }
}

/// Adapter turning a synchronous closure into a resolver
///
/// # Examples
///
/// ```
/// use apartment_tenancy::{FnResolver, TenantConfig};
///
/// let resolver = FnResolver::new(|tenant_id: &str| {
///     Ok(Some(
///         TenantConfig::new(tenant_id)
///             .with_param("host", "db.internal")
///             .with_param("database", format!("tenant_{}", tenant_id)),
///     ))
/// });
/// ```
pub struct FnResolver<F> {
    derive: F,
}

impl<F> FnResolver<F>
where
    F: Fn(&str) -> Result<Option<TenantConfig>, BoxError> + Send + Sync,
{
    pub fn new(derive: F) -> Self {
        Self { derive }
    }
}

#[async_trait]
impl<F> ConfigResolver for FnResolver<F>
where
    F: Fn(&str) -> Result<Option<TenantConfig>, BoxError> + Send + Sync,
{
    async fn derive(&self, tenant_id: &str) -> Result<Option<TenantConfig>, BoxError> {
        (self.derive)(tenant_id)
    }
}

/// Resolver deriving configs from a database name pattern
///
/// Every parameter of the template is copied; `{id}` in the pattern is
/// replaced with the tenant id and stored as `database`.
#[derive(Debug, Clone)]
pub struct PatternResolver {
    template: TenantConfig,
    database_pattern: String,
}

impl PatternResolver {
    /// # Examples
    ///
    /// ```
    /// use apartment_tenancy::{PatternResolver, TenantConfig};
    ///
    /// let template = TenantConfig::new("template").with_param("host", "db.internal");
    /// let resolver = PatternResolver::new(template, "tenant_{id}");
    /// ```
    pub fn new(template: TenantConfig, database_pattern: impl Into<String>) -> Self {
        Self {
            template,
            database_pattern: database_pattern.into(),
        }
    }

    pub fn database_name(&self, tenant_id: &str) -> String {
        self.database_pattern.replace("{id}", tenant_id)
    }
}

#[async_trait]
impl ConfigResolver for PatternResolver {
    async fn derive(&self, tenant_id: &str) -> Result<Option<TenantConfig>, BoxError> {
        let config = self
            .template
            .clone()
            .rebind(tenant_id)
            .with_param("database", self.database_name(tenant_id));
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_resolver() {
        assert!(NoResolver.derive("acme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fn_resolver_error() {
        let resolver = FnResolver::new(|tenant_id: &str| Err(format!("lookup of {} failed", tenant_id).into()));
        let err = resolver.derive("ghost").await.unwrap_err();
        assert_eq!(err.to_string(), "lookup of ghost failed");
    }

    #[tokio::test]
    async fn test_pattern_resolver() {
        let template = TenantConfig::new("template")
            .with_param("host", "db.internal")
            .with_param("port", "5432");
        let resolver = PatternResolver::new(template, "tenant_{id}");

        let config = resolver.derive("acme").await.unwrap().unwrap();
        assert_eq!(config.tenant_id(), "acme");
        assert_eq!(config.param("database"), Some("tenant_acme"));
        assert_eq!(config.param("port"), Some("5432"));
    }
}
