//! Plain-SQL migrations run against every tenant database.

use crate::SeaOrmError;
use apartment_tenancy::{BoxError, MigrationRunner, async_trait};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{debug, info};

/// One named batch of SQL.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration name, reported on failure.
    pub name: String,
    /// SQL executed as-is.
    pub sql: String,
}

/// Runs an ordered list of SQL migrations, each in its own transaction.
///
/// Statements must be idempotent (`CREATE TABLE IF NOT EXISTS ...`); no
/// version table is kept.
///
/// ```rust,ignore
/// let migrator = StatementMigrator::new()
///     .migration("create_users", "CREATE TABLE IF NOT EXISTS users (id BIGINT PRIMARY KEY)");
///
/// pool.session().process_migrations(&migrator).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatementMigrator {
    migrations: Vec<Migration>,
}

impl StatementMigrator {
    /// Create an empty migrator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a migration.
    pub fn migration(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.migrations.push(Migration {
            name: name.into(),
            sql: sql.into(),
        });
        self
    }

    /// Migrations in execution order.
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }
}

#[async_trait]
impl MigrationRunner<DatabaseConnection> for StatementMigrator {
    async fn migrate(&self, tenant_id: &str, conn: &DatabaseConnection) -> Result<(), BoxError> {
        for migration in &self.migrations {
            debug!(tenant_id, migration = %migration.name, "Applying migration");

            let failed = |source| SeaOrmError::Migration {
                name: migration.name.clone(),
                source,
            };
            let txn = conn.begin().await.map_err(failed)?;
            txn.execute_unprepared(&migration.sql).await.map_err(failed)?;
            txn.commit().await.map_err(failed)?;
        }

        info!(tenant_id, count = self.migrations.len(), "Tenant migrations applied");
        Ok(())
    }
}
