//! Connection Pool
//!
//! Owns every physical connection, keyed by tenant id. Tenant connections are
//! kept in a least-recently-used cache bounded by `max_connections`; the
//! default connection is cached separately and never evicted.
//!
//! Handles are shared (`Arc`) with the sessions that currently serve the
//! tenant. A handle that leaves the cache while a session still holds it is
//! retired and parked, then closed by the first pool operation that finds it
//! unreferenced.

use crate::connection::{ConnectionFactory, ConnectionHandle};
use crate::error::{Result, TenantError};
use crate::registry::{TenantRegistry, validate_tenant_id};
use crate::session::TenantSession;
use crate::tenant::{DEFAULT_TENANT, TenantConfig};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Default bound on cached tenant connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 32;

type Handle<F> = Arc<ConnectionHandle<<F as ConnectionFactory>::Connection>>;

struct PoolState<C> {
    tenants: LruCache<String, Arc<ConnectionHandle<C>>>,
    default: Option<Arc<ConnectionHandle<C>>>,
    parked: Vec<Arc<ConnectionHandle<C>>>,
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Cached tenant connections
    pub open: usize,
    /// Retired connections still held by a session
    pub parked: usize,
    /// Maximum cached tenant connections
    pub capacity: usize,
    /// Physical connections established since creation
    pub established: u64,
    /// Physical connections closed since creation
    pub closed: u64,
}

/// Tenant connection pool
pub struct ConnectionPool<F: ConnectionFactory> {
    registry: Arc<TenantRegistry>,
    factory: Arc<F>,
    state: Mutex<PoolState<F::Connection>>,
    established: AtomicU64,
    closed: AtomicU64,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    /// Create a pool over a registry and a connection factory
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let registry = Arc::new(TenantRegistry::new(default_config));
    /// let pool = Arc::new(ConnectionPool::new(registry, SeaOrmConnector::default()));
    ///
    /// let session = pool.session();
    /// session.with_tenant("acme", |db| async move { run_report(&db).await }).await?;
    /// ```
    pub fn new(registry: Arc<TenantRegistry>, factory: F) -> Self {
        Self {
            registry,
            factory: Arc::new(factory),
            state: Mutex::new(PoolState {
                tenants: LruCache::new(capacity(DEFAULT_MAX_CONNECTIONS)),
                default: None,
                parked: Vec::new(),
            }),
            established: AtomicU64::new(0),
            closed: AtomicU64::new(0),
        }
    }

    /// Bound the number of cached tenant connections (minimum 1)
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.state.get_mut().tenants.resize(capacity(max));
        self
    }

    /// Open a session for one execution context
    pub fn session(self: &Arc<Self>) -> TenantSession<F> {
        TenantSession::new(Arc::clone(self))
    }

    pub fn registry(&self) -> &Arc<TenantRegistry> {
        &self.registry
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Connection for a tenant, opened on first use
    ///
    /// Resolution failures surface as [`TenantError::NotFound`]; a known
    /// tenant whose database cannot be reached surfaces as
    /// [`TenantError::Connection`].
    pub async fn acquire(&self, tenant_id: &str) -> Result<Handle<F>> {
        validate_tenant_id(tenant_id)?;
        if tenant_id == DEFAULT_TENANT {
            return self.default_connection().await;
        }

        let cached = self.state.lock().tenants.get(tenant_id).cloned();
        if let Some(handle) = cached {
            debug!(tenant_id, "Reusing cached tenant connection");
            self.sweep().await;
            return Ok(handle);
        }

        let config = self.registry.resolve(tenant_id).await?;
        let handle = Arc::new(ConnectionHandle::new(tenant_id, self.establish(&config).await?));

        let (winner, displaced) = {
            let mut state = self.state.lock();
            match state.tenants.get(tenant_id) {
                // Lost a race with another context opening the same tenant.
                Some(existing) => (Arc::clone(existing), Some(handle)),
                None => {
                    let evicted = state
                        .tenants
                        .push(tenant_id.to_string(), Arc::clone(&handle))
                        .map(|(_, evicted)| evicted);
                    (handle, evicted)
                }
            }
        };

        if let Some(displaced) = displaced {
            debug!(tenant_id = displaced.tenant_id(), "Evicting tenant connection");
            self.release(displaced).await;
        }
        self.sweep().await;
        Ok(winner)
    }

    /// Connection for the default configuration, opened on first use
    pub async fn default_connection(&self) -> Result<Handle<F>> {
        let cached = self.state.lock().default.clone();
        if let Some(handle) = cached {
            return Ok(handle);
        }

        let config = self.registry.default_config();
        let handle = Arc::new(ConnectionHandle::new(DEFAULT_TENANT, self.establish(&config).await?));

        let (winner, loser) = {
            let mut state = self.state.lock();
            match &state.default {
                Some(existing) => (Arc::clone(existing), Some(handle)),
                None => {
                    state.default = Some(Arc::clone(&handle));
                    (handle, None)
                }
            }
        };
        if let Some(loser) = loser {
            self.release(loser).await;
        }
        Ok(winner)
    }

    /// Drop one tenant's cached connection
    ///
    /// The next acquisition opens a fresh connection. Returns whether a
    /// connection was cached.
    pub async fn invalidate(&self, tenant_id: &str) -> bool {
        let removed = self.state.lock().tenants.pop(tenant_id);
        match removed {
            Some(handle) => {
                info!(tenant_id, "Invalidating tenant connection");
                self.release(handle).await;
                true
            }
            None => false,
        }
    }

    /// Close every connection, including the default one
    ///
    /// Connections still held by a session are closed once released.
    pub async fn reset(&self) {
        let handles: Vec<_> = {
            let mut state = self.state.lock();
            let mut handles = Vec::with_capacity(state.tenants.len() + 1);
            while let Some((_, handle)) = state.tenants.pop_lru() {
                handles.push(handle);
            }
            handles.extend(state.default.take());
            handles
        };

        info!(connections = handles.len(), "Resetting all tenant connections");
        for handle in handles {
            self.release(handle).await;
        }
        self.sweep().await;
    }

    /// Close parked connections no session references any more
    pub async fn sweep(&self) {
        let idle: Vec<_> = {
            let mut state = self.state.lock();
            let (idle, busy) = std::mem::take(&mut state.parked)
                .into_iter()
                .partition(|handle| Arc::strong_count(handle) == 1);
            state.parked = busy;
            idle
        };

        for handle in idle {
            self.release(handle).await;
        }
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            open: state.tenants.len(),
            parked: state.parked.len(),
            capacity: state.tenants.cap().get(),
            established: self.established.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
        }
    }

    /// Whether a tenant currently has a cached connection
    pub fn is_cached(&self, tenant_id: &str) -> bool {
        self.state.lock().tenants.contains(tenant_id)
    }

    /// Tenant databases are managed externally
    pub fn create_tenant(&self, tenant_id: &str) -> Result<()> {
        Err(TenantError::Unsupported(format!(
            "cannot create tenant '{}': tenant databases are managed externally",
            tenant_id
        )))
    }

    /// Tenant databases are managed externally
    pub fn drop_tenant(&self, tenant_id: &str) -> Result<()> {
        Err(TenantError::Unsupported(format!(
            "cannot drop tenant '{}': tenant databases are managed externally",
            tenant_id
        )))
    }

    async fn establish(&self, config: &TenantConfig) -> Result<F::Connection> {
        let tenant_id = config.tenant_id();
        debug!(tenant_id, "Establishing database connection");

        let conn = self
            .factory
            .establish(config)
            .await
            .map_err(|source| TenantError::Connection {
                tenant_id: tenant_id.to_string(),
                source,
            })?;

        self.established.fetch_add(1, Ordering::Relaxed);
        info!(tenant_id, "Database connection established");
        Ok(conn)
    }

    /// Retire a handle that left the cache; close it now if unreferenced,
    /// otherwise park it.
    async fn release(&self, handle: Handle<F>) {
        handle.retire();
        match Arc::try_unwrap(handle) {
            Ok(handle) => self.close(handle).await,
            Err(handle) => {
                debug!(tenant_id = handle.tenant_id(), "Parking connection still in use");
                self.state.lock().parked.push(handle);
            }
        }
    }

    async fn close(&self, handle: ConnectionHandle<F::Connection>) {
        let tenant_id = handle.tenant_id().to_string();
        self.closed.fetch_add(1, Ordering::Relaxed);

        match self.factory.close(handle.into_inner()).await {
            Ok(()) => info!(tenant_id = %tenant_id, "Database connection closed"),
            Err(e) => warn!(tenant_id = %tenant_id, error = %e, "Failed to close database connection"),
        }
    }
}

fn capacity(max: usize) -> NonZeroUsize {
    NonZeroUsize::new(max).unwrap_or(NonZeroUsize::MIN)
}
