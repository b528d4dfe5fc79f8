//! Integration tests against in-memory SQLite tenants.
//!
//! Run with `--features sqlx-sqlite`.

#![cfg(feature = "sqlx-sqlite")]

use apartment_seaorm::prelude::*;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use std::sync::Arc;

fn pool() -> Arc<ConnectionPool<SeaOrmConnector>> {
    let config = RegistryConfig::new(TenantConfig::from_url("default", "sqlite::memory:"))
        .with_tenant(TenantConfig::from_url("acme", "sqlite::memory:").with_param("max_connections", "1"))
        .with_tenant(TenantConfig::from_url("beta", "sqlite::memory:").with_param("max_connections", "1"));
    Arc::new(config.into_pool(SeaOrmConnector::default()).unwrap())
}

#[tokio::test]
async fn test_migrations_run_in_each_tenant_database() {
    let pool = pool();
    let session = pool.session();
    let migrator = StatementMigrator::new()
        .migration("create_notes", "CREATE TABLE IF NOT EXISTS notes (body TEXT NOT NULL)");

    session.process_migrations(&migrator).await.unwrap();

    session
        .with_tenant("acme", |db| async move {
            db.execute_unprepared("INSERT INTO notes (body) VALUES ('acme only')")
                .await
        })
        .await
        .unwrap();

    let beta_rows = session
        .with_tenant("beta", |db| async move {
            db.query_all(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT body FROM notes",
            ))
            .await
        })
        .await
        .unwrap();

    assert!(beta_rows.is_empty());
    assert_eq!(session.active_tenant(), None);
}

#[tokio::test]
async fn test_reset_closes_sqlite_pools() {
    let pool = pool();
    let session = pool.session();

    session.activate("acme").await.unwrap();
    session.deactivate();
    pool.reset().await;

    assert_eq!(pool.stats().open, 0);
    assert_eq!(pool.stats().closed, 1);
}
