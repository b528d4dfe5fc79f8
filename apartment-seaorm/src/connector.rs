//! SeaORM connection factory.

use crate::SeaOrmOptions;
use apartment_tenancy::{BoxError, ConnectionFactory, TenantConfig, async_trait};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::{debug, info};

/// Opens one SeaORM connection pool per tenant database.
#[derive(Debug, Clone, Default)]
pub struct SeaOrmConnector {
    options: SeaOrmOptions,
}

impl SeaOrmConnector {
    /// Create a connector applying `options` to every tenant.
    pub fn new(options: SeaOrmOptions) -> Self {
        Self { options }
    }

    /// Pool settings shared by all tenants.
    pub fn options(&self) -> &SeaOrmOptions {
        &self.options
    }
}

#[async_trait]
impl ConnectionFactory for SeaOrmConnector {
    type Connection = DatabaseConnection;

    async fn establish(&self, config: &TenantConfig) -> Result<DatabaseConnection, BoxError> {
        let options = self.options.to_connect_options(config)?;
        let url = options.get_url();
        debug!(
            tenant_id = config.tenant_id(),
            "Database host: {}",
            url.rsplit('@').next().unwrap_or(url)
        );

        let conn = sea_orm::Database::connect(options).await?;
        // Surface bad credentials or a missing database at switch time.
        conn.ping().await?;

        info!(
            tenant_id = config.tenant_id(),
            backend = ?conn.get_database_backend(),
            "Tenant database connected"
        );
        Ok(conn)
    }

    async fn close(&self, conn: DatabaseConnection) -> Result<(), BoxError> {
        conn.close().await?;
        Ok(())
    }
}
