//! Integration tests for common Apartment workflows.
//!
//! These tests verify that the most common use cases work correctly.

use apartment::*;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

// =============================================================================
// Test Factory
// =============================================================================

/// Connection that remembers which database it was opened for.
#[derive(Debug)]
struct Conn {
    url: String,
}

#[derive(Default)]
struct UrlFactory {
    closed: Mutex<Vec<String>>,
}

#[async_trait]
impl ConnectionFactory for UrlFactory {
    type Connection = Conn;

    async fn establish(&self, config: &TenantConfig) -> Result<Conn, BoxError> {
        Ok(Conn {
            url: config.database_url()?,
        })
    }

    async fn close(&self, conn: Conn) -> Result<(), BoxError> {
        self.closed.lock().push(conn.url);
        Ok(())
    }
}

const TENANTS_TOML: &str = r#"
max_connections = 2

[default]
url = "postgres://app@localhost/app"

[[tenants]]
id = "acme"
host = "db-1.internal"
port = 5432
database = "acme"

[[tenants]]
id = "beta"
url = "postgres://app@db-2.internal/beta"

[[tenants]]
id = "gamma"
url = "postgres://app@db-3.internal/gamma"
"#;

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(TENANTS_TOML.as_bytes()).unwrap();

    let config = assert_ok!(RegistryConfig::from_file(file.path()));
    assert_eq!(config.max_connections, 2);

    let ids: Vec<_> = config.tenants.iter().map(|t| t.tenant_id()).collect();
    assert_eq!(ids, vec!["acme", "beta", "gamma"]);
    assert_eq!(
        config.tenants[0].database_url().unwrap(),
        "postgres://db-1.internal:5432/acme"
    );
}

#[test]
fn test_config_from_missing_file() {
    let err = assert_err!(RegistryConfig::from_file("/nonexistent/tenants.toml"));
    assert!(matches!(err, TenantError::Config(_)));
}

#[test]
fn test_config_from_env() {
    // Only test in this binary touching the process environment.
    unsafe {
        std::env::set_var("APARTMENT_DATABASE_URL", "postgres://app@localhost/app");
        std::env::set_var("APARTMENT_MAX_CONNECTIONS", "4");
        std::env::set_var(
            "APARTMENT_TENANTS",
            "acme=postgres://app@db-1/acme, beta=postgres://app@db-2/beta",
        );
    }

    let config = assert_ok!(RegistryConfig::from_env());
    assert_eq!(config.max_connections, 4);
    assert_eq!(config.tenants.len(), 2);
    assert_eq!(config.tenants[1].tenant_id(), "beta");
    assert_eq!(
        config.tenants[1].database_url().unwrap(),
        "postgres://app@db-2/beta"
    );

    unsafe {
        std::env::remove_var("APARTMENT_DATABASE_URL");
        std::env::remove_var("APARTMENT_MAX_CONNECTIONS");
        std::env::remove_var("APARTMENT_TENANTS");
    }
}

// =============================================================================
// Switching Workflow Tests
// =============================================================================

fn pool() -> Arc<ConnectionPool<UrlFactory>> {
    let config = RegistryConfig::from_toml_str(TENANTS_TOML).unwrap();
    Arc::new(config.into_pool(UrlFactory::default()).unwrap())
}

#[tokio::test]
async fn test_scoped_switch_routes_to_tenant_database() {
    let pool = pool();
    let session = pool.session();

    let url = session
        .with_tenant("beta", |db| async move { Ok::<_, BoxError>(db.url.clone()) })
        .await
        .unwrap();
    assert_eq!(url, "postgres://app@db-2.internal/beta");

    // Back on the default connection
    assert_eq!(session.active_tenant(), None);
    assert_eq!(
        session.connection().await.unwrap().url,
        "postgres://app@localhost/app"
    );
}

#[tokio::test]
async fn test_unknown_tenant_is_not_found() {
    let pool = pool();
    let session = pool.session();

    let err = assert_err!(session.activate("ghost").await);
    assert!(err.is_not_found());
    assert_eq!(err.tenant_id(), Some("ghost"));
    assert_eq!(session.active_tenant(), None);
}

#[tokio::test]
async fn test_lru_bound_closes_least_recent_tenant() {
    let pool = pool();
    let session = pool.session();

    for id in ["acme", "beta", "gamma"] {
        session.activate(id).await.unwrap();
    }
    session.deactivate();
    pool.sweep().await;

    assert!(!pool.is_cached("acme"));
    assert!(pool.is_cached("beta"));
    assert!(pool.is_cached("gamma"));
    assert_eq!(
        *pool.factory().closed.lock(),
        vec!["postgres://db-1.internal:5432/acme".to_string()]
    );
}

#[tokio::test]
async fn test_bulk_run_visits_every_tenant() {
    let pool = pool();
    let session = pool.session();

    let urls = session
        .for_each_tenant(|id, db| async move { Ok::<_, BoxError>(format!("{id} -> {}", db.url)) })
        .await
        .unwrap();

    assert_eq!(urls.len(), 3);
    assert!(urls[0].starts_with("acme -> "));
    assert!(urls[2].starts_with("gamma -> "));
    assert_eq!(session.active_tenant(), None);
}

#[test]
fn test_tenant_lifecycle_is_unsupported() {
    let pool = pool();
    assert!(matches!(
        pool.create_tenant("delta"),
        Err(TenantError::Unsupported(_))
    ));
    assert!(matches!(
        pool.drop_tenant("acme"),
        Err(TenantError::Unsupported(_))
    ));
}
