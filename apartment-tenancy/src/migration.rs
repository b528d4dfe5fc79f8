//! Tenant Migrations
//!
//! The migration framework itself lives in the host application; this crate
//! only guarantees that each run happens inside a tenant scope.

use crate::error::BoxError;
use async_trait::async_trait;

/// Migration runner trait
///
/// Invoked once per tenant by
/// [`TenantSession::process_migrations`](crate::TenantSession::process_migrations),
/// with that tenant's connection active.
#[async_trait]
pub trait MigrationRunner<C: Send + Sync>: Send + Sync {
    async fn migrate(&self, tenant_id: &str, conn: &C) -> Result<(), BoxError>;
}
