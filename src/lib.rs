// Apartment - database-per-tenant connection switching for Rust
//
// This library resolves tenant database configurations, keeps a bounded cache
// of per-tenant connections and lets each execution context switch tenants
// without affecting any other.

// Re-export core functionality
pub use apartment_tenancy::*;

// Re-export optional connectors
#[cfg(feature = "seaorm")]
pub use apartment_seaorm;

// Prelude for common imports
pub mod prelude {
    pub use apartment_tenancy::prelude::*;

    #[cfg(feature = "seaorm")]
    pub use apartment_seaorm::{SeaOrmConnector, SeaOrmOptions, StatementMigrator};
}
