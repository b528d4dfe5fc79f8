//! Tenant Sessions
//!
//! A [`TenantSession`] is the active-tenant slot of one execution context
//! (a request handler, a worker task). Each context opens its own session
//! from the shared pool, so switching tenants in one context can never be
//! observed by another.
//!
//! # Usage
//!
//! ```rust,ignore
//! let session = pool.session();
//!
//! // Scoped: the previous tenant is restored however the operation exits
//! let users = session
//!     .with_tenant("acme", |db| async move { User::find().all(&**db).await })
//!     .await?;
//!
//! // Bulk
//! session.process_migrations(&migrator).await?;
//! ```

use crate::connection::{ConnectionFactory, ConnectionHandle};
use crate::error::{BoxError, Result, TenantError};
use crate::migration::MigrationRunner;
use crate::pool::ConnectionPool;
use crate::registry::validate_tenant_id;
use crate::tenant::{ActiveTenant, DEFAULT_TENANT};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

type Handle<C> = Arc<ConnectionHandle<C>>;

struct SessionState<C> {
    active: ActiveTenant,
    /// `None` only in the default state before the default connection is used.
    handle: Option<Handle<C>>,
}

impl<C> Default for SessionState<C> {
    fn default() -> Self {
        Self {
            active: ActiveTenant::Default,
            handle: None,
        }
    }
}

impl<C> Clone for SessionState<C> {
    fn clone(&self) -> Self {
        Self {
            active: self.active.clone(),
            handle: self.handle.clone(),
        }
    }
}

/// Per-context tenant session
///
/// Starts in the default state. A session is meant to be driven by a single
/// execution context; concurrent contexts each open their own.
pub struct TenantSession<F: ConnectionFactory> {
    pool: Arc<ConnectionPool<F>>,
    state: Mutex<SessionState<F::Connection>>,
}

impl<F: ConnectionFactory> TenantSession<F> {
    pub fn new(pool: Arc<ConnectionPool<F>>) -> Self {
        Self {
            pool,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool<F>> {
        &self.pool
    }

    /// Currently active tenant, `None` in the default state
    pub fn active_tenant(&self) -> Option<String> {
        self.state.lock().active.tenant_id().map(str::to_string)
    }

    pub fn state(&self) -> ActiveTenant {
        self.state.lock().active.clone()
    }

    /// Make `tenant_id` the active tenant of this session
    ///
    /// Re-activating the active tenant returns its handle without touching
    /// the pool. If the switch fails the previous tenant stays active.
    /// Activating `default` is equivalent to [`deactivate`](Self::deactivate).
    pub async fn activate(&self, tenant_id: &str) -> Result<Handle<F::Connection>> {
        validate_tenant_id(tenant_id)?;
        if tenant_id == DEFAULT_TENANT {
            self.deactivate();
            return self.connection().await;
        }

        let current = {
            let state = self.state.lock();
            match (&state.active, &state.handle) {
                (ActiveTenant::Tenant(active), Some(handle)) if active == tenant_id => {
                    Some(Arc::clone(handle))
                }
                _ => None,
            }
        };
        if let Some(handle) = current {
            return Ok(handle);
        }

        let handle = self.pool.acquire(tenant_id).await?;

        let previous = std::mem::replace(
            &mut *self.state.lock(),
            SessionState {
                active: ActiveTenant::from_id(tenant_id),
                handle: Some(Arc::clone(&handle)),
            },
        );
        debug!(from = %previous.active, to = tenant_id, "Switched tenant");
        Ok(handle)
    }

    /// Return this session to the default state
    ///
    /// Releases the tenant's handle but does not open the default connection:
    /// unlike an eager reconnect, nothing is established until
    /// [`connection`](Self::connection) is next called, so a failing default
    /// database surfaces there rather than here. No-op in the default state.
    pub fn deactivate(&self) {
        let released = {
            let mut state = self.state.lock();
            if state.active.is_default() {
                return;
            }
            std::mem::take(&mut *state)
        };
        debug!(tenant_id = %released.active, "Deactivated tenant");
    }

    /// Connection of the active tenant, or the default connection
    ///
    /// In the default state a handle retired by [`ConnectionPool::reset`] is
    /// dropped and replaced with a fresh default connection.
    pub async fn connection(&self) -> Result<Handle<F::Connection>> {
        {
            let mut state = self.state.lock();
            let stale = match &state.handle {
                Some(handle) if handle.is_live() || !state.active.is_default() => {
                    return Ok(Arc::clone(handle));
                }
                Some(_) => true,
                None => false,
            };
            if stale {
                debug!("Dropping retired default connection");
                state.handle = None;
            }
        }

        let handle = self.pool.default_connection().await?;
        let mut state = self.state.lock();
        if state.active.is_default() && state.handle.is_none() {
            state.handle = Some(Arc::clone(&handle));
        }
        Ok(handle)
    }

    /// Run `op` with `tenant_id` active, then restore the previous state
    ///
    /// The tenant (and connection) that was active before the call is
    /// restored when `op` returns, fails, panics, or when the returned future
    /// is dropped before completion. Nested calls restore the enclosing
    /// tenant.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// session
    ///     .with_tenant("acme", |db| async move {
    ///         db.execute_unprepared("DELETE FROM sessions").await
    ///     })
    ///     .await?;
    /// ```
    pub async fn with_tenant<Op, Fut, T, E>(&self, tenant_id: &str, op: Op) -> Result<T>
    where
        Op: FnOnce(Handle<F::Connection>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<BoxError>,
    {
        let _restore = RestoreGuard::new(self);
        let handle = self.activate(tenant_id).await?;

        op(handle).await.map_err(|e| TenantError::Operation {
            tenant_id: tenant_id.to_string(),
            source: e.into(),
        })
    }

    /// Run `op` once per tenant, in registry order
    ///
    /// Switches directly from one tenant to the next. The first failure stops
    /// the iteration and is returned with the failing tenant attached. The
    /// state from before the call is restored once, on every exit path.
    pub async fn for_each_tenant<Op, Fut, T, E>(&self, mut op: Op) -> Result<Vec<T>>
    where
        Op: FnMut(String, Handle<F::Connection>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<BoxError>,
    {
        let _restore = RestoreGuard::new(self);
        let tenants = self.list_tenants();
        let mut results = Vec::with_capacity(tenants.len());

        for tenant_id in tenants {
            let handle = self.activate(&tenant_id).await?;
            match op(tenant_id.clone(), handle).await {
                Ok(value) => results.push(value),
                Err(e) => {
                    return Err(TenantError::Operation {
                        tenant_id,
                        source: e.into(),
                    });
                }
            }
        }

        Ok(results)
    }

    /// Known tenants, in registry order
    pub fn list_tenants(&self) -> Vec<String> {
        self.pool.registry().list()
    }

    /// Run a migration runner against every tenant database
    pub async fn process_migrations<R>(&self, runner: &R) -> Result<()>
    where
        R: MigrationRunner<F::Connection>,
    {
        info!(tenants = self.pool.registry().len(), "Running tenant migrations");
        self.for_each_tenant(|tenant_id, handle| async move {
            runner.migrate(&tenant_id, handle.connection()).await
        })
        .await?;
        info!("Tenant migrations complete");
        Ok(())
    }
}

/// Restores a session's saved state when dropped
struct RestoreGuard<'a, F: ConnectionFactory> {
    session: &'a TenantSession<F>,
    saved: SessionState<F::Connection>,
}

impl<'a, F: ConnectionFactory> RestoreGuard<'a, F> {
    fn new(session: &'a TenantSession<F>) -> Self {
        let saved = session.state.lock().clone();
        Self { session, saved }
    }
}

impl<F: ConnectionFactory> Drop for RestoreGuard<'_, F> {
    fn drop(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        let replaced = std::mem::replace(&mut *self.session.state.lock(), saved);
        debug!(restored_from = %replaced.active, "Restored tenant state");
    }
}
