//! # Apartment SeaORM
//!
//! SeaORM connection factory for database-per-tenant switching.
//!
//! Every tenant gets its own SeaORM `DatabaseConnection` (an SQLx pool),
//! opened the first time a session switches to the tenant and cached by the
//! `apartment-tenancy` pool.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apartment_seaorm::{SeaOrmConnector, SeaOrmOptions};
//! use apartment_tenancy::RegistryConfig;
//!
//! let connector = SeaOrmConnector::new(SeaOrmOptions::default().max_connections(10));
//! let pool = Arc::new(RegistryConfig::from_file("tenants.toml")?.into_pool(connector)?);
//!
//! let session = pool.session();
//! let users = session
//!     .with_tenant("acme", |db| async move { User::find().all(db.connection()).await })
//!     .await?;
//! ```
//!
//! ## Migrations
//!
//! ```rust,ignore
//! let migrator = StatementMigrator::new()
//!     .migration("create_users", "CREATE TABLE IF NOT EXISTS users (id BIGINT PRIMARY KEY)");
//!
//! session.process_migrations(&migrator).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod connector;
mod error;
mod migrator;
mod options;

pub use connector::*;
pub use error::*;
pub use migrator::*;
pub use options::*;

// Re-export sea-orm for convenience
pub use sea_orm;

/// Prelude module for commonly used types.
pub mod prelude {
    pub use super::{SeaOrmConnector, SeaOrmError, SeaOrmOptions, SeaOrmResult, StatementMigrator};
    pub use apartment_tenancy::prelude::*;
}
