//! Database Connections
//!
//! The ORM-facing seam: a [`ConnectionFactory`] opens physical connections
//! from a [`TenantConfig`], and the pool wraps each one in a
//! [`ConnectionHandle`].
//!
//! ```rust,ignore
//! struct MyConnector;
//!
//! #[async_trait]
//! impl ConnectionFactory for MyConnector {
//!     type Connection = MyOrmConnection;
//!
//!     async fn establish(&self, config: &TenantConfig) -> Result<Self::Connection, BoxError> {
//!         Ok(MyOrmConnection::connect(&config.database_url()?).await?)
//!     }
//!
//!     async fn close(&self, conn: Self::Connection) -> Result<(), BoxError> {
//!         Ok(conn.close().await?)
//!     }
//! }
//! ```

use crate::error::BoxError;
use crate::tenant::TenantConfig;
use async_trait::async_trait;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};

/// Connection factory trait
///
/// Implement with the database client of choice. `establish` may block on a
/// network handshake; the pool never holds a lock while awaiting it.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// The connection type (e.g., sea_orm::DatabaseConnection)
    type Connection: Send + Sync + 'static;

    /// Open a physical connection for the given configuration
    async fn establish(&self, config: &TenantConfig) -> Result<Self::Connection, BoxError>;

    /// Close a physical connection
    async fn close(&self, conn: Self::Connection) -> Result<(), BoxError> {
        drop(conn);
        Ok(())
    }
}

/// One physical connection serving one tenant
pub struct ConnectionHandle<C> {
    tenant_id: String,
    live: AtomicBool,
    conn: C,
}

impl<C> ConnectionHandle<C> {
    pub(crate) fn new(tenant_id: impl Into<String>, conn: C) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            live: AtomicBool::new(true),
            conn,
        }
    }

    /// Tenant this connection was opened for
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// False once the pool has evicted or invalidated the handle.
    ///
    /// A retired handle stays usable by whoever still holds it; it is closed
    /// as soon as the last holder releases it.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub(crate) fn into_inner(self) -> C {
        self.conn
    }
}

impl<C> Deref for ConnectionHandle<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<C> fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("tenant_id", &self.tenant_id)
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}
