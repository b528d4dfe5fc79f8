//! Error types for the SeaORM connector.

use thiserror::Error;

/// Errors raised while opening or migrating tenant databases through SeaORM.
#[derive(Error, Debug)]
pub enum SeaOrmError {
    /// A tenant parameter could not be turned into connect options.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error from SeaORM.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Tenant configuration error.
    #[error(transparent)]
    Tenant(#[from] apartment_tenancy::TenantError),

    /// A migration statement failed.
    #[error("Migration '{name}' failed: {source}")]
    Migration {
        /// Name of the failing migration.
        name: String,
        /// Underlying database error.
        #[source]
        source: sea_orm::DbErr,
    },
}

/// Result type alias for SeaORM connector operations.
pub type SeaOrmResult<T> = Result<T, SeaOrmError>;
