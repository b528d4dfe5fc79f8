//! Tenant Registry
//!
//! Maps tenant ids to connection configurations, in registration order, with
//! lazy population through a [`ConfigResolver`].

use crate::config::RegistryConfig;
use crate::error::{Result, TenantError};
use crate::resolver::{ConfigResolver, NoResolver};
use crate::tenant::{DEFAULT_TENANT, TenantConfig};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct Entries {
    order: Vec<String>,
    configs: HashMap<String, TenantConfig>,
}

impl Entries {
    fn upsert(&mut self, config: TenantConfig) {
        let id = config.tenant_id().to_string();
        if self.configs.insert(id.clone(), config).is_none() {
            self.order.push(id);
        }
    }

    /// Insert unless present; returns whichever config ends up cached.
    fn insert_if_absent(&mut self, config: TenantConfig) -> TenantConfig {
        if let Some(existing) = self.configs.get(config.tenant_id()) {
            return existing.clone();
        }
        self.upsert(config.clone());
        config
    }
}

/// Tenant registry
///
/// Holds the default configuration plus one configuration per tenant.
/// Unknown tenants are handed to the resolver hook once; its answer is cached
/// for the lifetime of the registry.
pub struct TenantRegistry {
    default: RwLock<TenantConfig>,
    entries: RwLock<Entries>,
    resolver: Arc<dyn ConfigResolver>,
}

impl TenantRegistry {
    /// Create a registry holding only the default configuration
    ///
    /// # Examples
    ///
    /// ```
    /// use apartment_tenancy::{TenantConfig, TenantRegistry};
    ///
    /// let registry = TenantRegistry::new(TenantConfig::from_url("default", "postgres://localhost/app"));
    /// registry.register(TenantConfig::from_url("acme", "postgres://localhost/acme")).unwrap();
    /// assert_eq!(registry.list(), vec!["acme".to_string()]);
    /// ```
    pub fn new(default: TenantConfig) -> Self {
        Self {
            default: RwLock::new(default.rebind(DEFAULT_TENANT)),
            entries: RwLock::new(Entries::default()),
            resolver: Arc::new(NoResolver),
        }
    }

    /// Build from a validated [`RegistryConfig`]
    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        config.into_registry()
    }

    /// Set the hook used for tenants that were never registered
    pub fn with_resolver(mut self, resolver: Arc<dyn ConfigResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Insert or overwrite a tenant's configuration
    ///
    /// Overwriting keeps the tenant's original position in [`list`](Self::list).
    /// Registering the reserved `default` id replaces the default configuration.
    pub fn register(&self, config: TenantConfig) -> Result<()> {
        validate_tenant_id(config.tenant_id())?;

        if config.is_default() {
            *self.default.write() = config;
        } else {
            debug!(tenant_id = config.tenant_id(), "Registering tenant configuration");
            self.entries.write().upsert(config);
        }
        Ok(())
    }

    /// Resolve the configuration for a tenant
    ///
    /// Returns the cached entry, or derives one through the resolver hook and
    /// caches it. Fails with [`TenantError::NotFound`] when the hook errors or
    /// yields nothing; the default configuration is never substituted.
    pub async fn resolve(&self, tenant_id: &str) -> Result<TenantConfig> {
        validate_tenant_id(tenant_id)?;

        if tenant_id == DEFAULT_TENANT {
            return Ok(self.default_config());
        }

        if let Some(config) = self.get(tenant_id) {
            return Ok(config);
        }

        debug!(tenant_id, "Deriving tenant configuration");
        let derived = self
            .resolver
            .derive(tenant_id)
            .await
            .map_err(|e| TenantError::NotFound {
                tenant_id: tenant_id.to_string(),
                source: Some(e),
            })?
            .filter(|config| !config.params().is_empty())
            .ok_or_else(|| TenantError::not_found(tenant_id))?;

        // Another context may have derived the same tenant meanwhile; the
        // first cached answer is kept.
        Ok(self.entries.write().insert_if_absent(derived.rebind(tenant_id)))
    }

    /// Cached configuration, without consulting the resolver
    pub fn get(&self, tenant_id: &str) -> Option<TenantConfig> {
        self.entries.read().configs.get(tenant_id).cloned()
    }

    pub fn contains(&self, tenant_id: &str) -> bool {
        self.entries.read().configs.contains_key(tenant_id)
    }

    pub fn default_config(&self) -> TenantConfig {
        self.default.read().clone()
    }

    /// Known tenant ids in registration order, excluding `default`
    pub fn list(&self) -> Vec<String> {
        self.entries.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn validate_tenant_id(tenant_id: &str) -> Result<()> {
    if tenant_id.trim().is_empty() {
        return Err(TenantError::Invalid(
            "tenant id must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::FnResolver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> TenantRegistry {
        let registry = TenantRegistry::new(TenantConfig::from_url("default", "postgres://localhost/app"));
        registry
            .register(TenantConfig::from_url("acme", "postgres://localhost/acme"))
            .unwrap();
        registry
            .register(TenantConfig::from_url("beta", "postgres://localhost/beta"))
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_resolve_registered() {
        let registry = registry();
        let config = registry.resolve("acme").await.unwrap();
        assert_eq!(config.param("url"), Some("postgres://localhost/acme"));
    }

    #[tokio::test]
    async fn test_resolve_default() {
        let registry = registry();
        let config = registry.resolve("default").await.unwrap();
        assert!(config.is_default());
        assert_eq!(config.param("url"), Some("postgres://localhost/app"));
    }

    #[tokio::test]
    async fn test_unknown_tenant_never_falls_back_to_default() {
        let registry = registry();
        let err = registry.resolve("ghost").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.tenant_id(), Some("ghost"));
        assert!(!registry.contains("ghost"));
    }

    #[tokio::test]
    async fn test_failing_hook_is_attached_as_cause() {
        let registry = registry().with_resolver(Arc::new(FnResolver::new(|_: &str| {
            Err("control plane unavailable".into())
        })));

        let err = registry.resolve("ghost").await.unwrap_err();
        match err {
            TenantError::NotFound { tenant_id, source } => {
                assert_eq!(tenant_id, "ghost");
                assert_eq!(source.unwrap().to_string(), "control plane unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_derivation_is_not_found() {
        let registry = registry().with_resolver(Arc::new(FnResolver::new(|id: &str| {
            Ok(Some(TenantConfig::new(id)))
        })));
        assert!(registry.resolve("hollow").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_derived_config_is_cached_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = registry().with_resolver(Arc::new(FnResolver::new(move |id: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(TenantConfig::from_url(id, format!("postgres://localhost/{id}"))))
        })));

        registry.resolve("gamma").await.unwrap();
        registry.resolve("gamma").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.list(), vec!["acme", "beta", "gamma"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let registry = registry();
        registry
            .register(TenantConfig::from_url("acme", "postgres://replica/acme"))
            .unwrap();

        assert_eq!(registry.list(), vec!["acme", "beta"]);
        assert_eq!(
            registry.get("acme").unwrap().param("url"),
            Some("postgres://replica/acme")
        );
    }

    #[test]
    fn test_register_default_replaces_default() {
        let registry = registry();
        registry
            .register(TenantConfig::from_url("default", "postgres://other/app"))
            .unwrap();

        assert_eq!(registry.default_config().param("url"), Some("postgres://other/app"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_empty_id_rejected() {
        let registry = registry();
        let err = registry.register(TenantConfig::new("  ")).unwrap_err();
        assert!(matches!(err, TenantError::Invalid(_)));
    }
}
