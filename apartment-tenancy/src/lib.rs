//! Database-per-tenant connection switching
//!
//! Each tenant's data lives in its own database. This crate decides which
//! physical connection a unit of work runs on: it resolves tenant
//! configurations, opens and caches one connection per tenant, and lets every
//! execution context switch tenants without affecting any other.
//!
//! # Features
//!
//! - **Tenant Registry** - Static configuration plus a lazy resolver hook
//! - **Bounded Pool** - LRU-capped connection cache with deferred closing
//! - **Scoped Sessions** - Per-context active tenant, restored on every exit path
//! - **Bulk Runs** - Iterate every tenant, e.g. for migrations
//!
//! # Quick Start
//!
//! ## 1. Implement a connection factory (or use `apartment-seaorm`)
//!
//! ```rust,ignore
//! use apartment_tenancy::*;
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl ConnectionFactory for MyConnector {
//!     type Connection = MyConnection;
//!
//!     async fn establish(&self, config: &TenantConfig) -> Result<MyConnection, BoxError> {
//!         Ok(MyConnection::open(&config.database_url()?).await?)
//!     }
//! }
//! ```
//!
//! ## 2. Build the pool from configuration
//!
//! ```rust,ignore
//! let pool = Arc::new(RegistryConfig::from_file("tenants.toml")?.into_pool(MyConnector)?);
//! ```
//!
//! ## 3. Switch tenants per execution context
//!
//! ```rust,ignore
//! let session = pool.session();
//!
//! let invoices = session
//!     .with_tenant("acme", |db| async move { db.query("SELECT * FROM invoices").await })
//!     .await?;
//!
//! // Previous tenant (here: default) is active again
//! assert_eq!(session.active_tenant(), None);
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod migration;
pub mod pool;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod tenant;

pub use config::RegistryConfig;
pub use connection::{ConnectionFactory, ConnectionHandle};
pub use error::{BoxError, TenantError};
pub use logging::{init_tracing, init_tracing_with_level};
pub use migration::MigrationRunner;
pub use pool::{ConnectionPool, DEFAULT_MAX_CONNECTIONS, PoolStats};
pub use registry::TenantRegistry;
pub use resolver::{ConfigResolver, FnResolver, NoResolver, PatternResolver};
pub use session::TenantSession;
pub use tenant::{ActiveTenant, DEFAULT_TENANT, TenantConfig};

// Re-exported for implementors of the collaborator traits
pub use async_trait::async_trait;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::RegistryConfig;
    pub use crate::connection::{ConnectionFactory, ConnectionHandle};
    pub use crate::error::{BoxError, TenantError};
    pub use crate::migration::MigrationRunner;
    pub use crate::pool::ConnectionPool;
    pub use crate::registry::TenantRegistry;
    pub use crate::resolver::{ConfigResolver, FnResolver};
    pub use crate::session::TenantSession;
    pub use crate::tenant::{ActiveTenant, TenantConfig};
}
