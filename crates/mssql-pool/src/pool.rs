//! Connection pool implementation.
//!
//! This module provides a purpose-built connection pool for SQL Server
//! with SQL Server-specific lifecycle management including connection reset.
//!
//! The pool is driven entirely by blocking calls: checkout, checkin, and the
//! background cleaner all use `std::sync::{Mutex, Condvar}` (via
//! `parking_lot`) and an OS thread rather than an async runtime.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use mssql_client::{Client, Config, Ready};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::lifecycle::ConnectionMetadata;

/// A connection pool for SQL Server.
///
/// The pool manages a set of [`Client<Ready>`] connections, providing
/// automatic connection reuse, health checking, and lifecycle management.
///
/// # Features
///
/// - Session reset on connection return
/// - Health checks via the configured health check query
/// - Configurable min/max pool sizes
/// - Connection timeout and idle timeout
/// - Background eviction of expired/unhealthy idle connections, run on a
///   dedicated cleaner thread
///
/// # Example
///
/// ```rust,ignore
/// use mssql_driver_pool::{Pool, PoolConfig};
/// use mssql_client::Config;
///
/// let pool_config = PoolConfig::new()
///     .min_connections(5)
///     .max_connections(20);
///
/// let pool = Pool::builder()
///     .client_config(client_config)
///     .pool_config(pool_config)
///     .build()?;
///
/// let conn = pool.get()?;
/// // Use connection...
/// ```
pub struct Pool {
    inner: Arc<PoolInner>,
    cleaner: Mutex<Option<JoinHandle<()>>>,
}

struct Slot {
    client: Client<Ready>,
    metadata: ConnectionMetadata,
}

struct PoolInner {
    conn_config: Config,
    pool_config: PoolConfig,
    idle: Mutex<VecDeque<Slot>>,
    /// Signalled whenever the idle queue or total count might have changed,
    /// so a blocked `acquire` can re-check its condition.
    idle_changed: Condvar,
    total: AtomicU32,
    next_id: AtomicU64,
    closed: AtomicBool,
    /// Mutex + condvar pair used to wake the cleaner thread early on close.
    shutdown: (Mutex<bool>, Condvar),
    created_at: Instant,
    metrics: Mutex<PoolMetricsInner>,
}

/// Internal metrics tracking.
#[derive(Debug, Default)]
struct PoolMetricsInner {
    connections_created: u64,
    connections_closed: u64,
    checkouts_successful: u64,
    checkouts_failed: u64,
    health_checks_performed: u64,
    health_checks_failed: u64,
    resets_performed: u64,
    resets_failed: u64,
}

impl PoolInner {
    fn try_reserve(&self) -> bool {
        loop {
            let current = self.total.load(Ordering::SeqCst);
            if current >= self.pool_config.max_connections {
                return false;
            }
            if self
                .total
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn notify_idle_changed(&self) {
        self.idle_changed.notify_all();
    }

    fn create_connection(&self) -> Result<Slot, PoolError> {
        let client = Client::connect(self.conn_config.clone())
            .map_err(|e| PoolError::ConnectFailed(e.to_string()))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.metrics.lock().connections_created += 1;
        Ok(Slot {
            client,
            metadata: ConnectionMetadata::new(id),
        })
    }

    fn close_connection(&self, client: Client<Ready>) {
        self.total.fetch_sub(1, Ordering::SeqCst);
        self.metrics.lock().connections_closed += 1;
        let _ = client.close();
    }

    /// Return a checked-out connection to the idle queue, marking it for a
    /// session reset and running an optional checkin health check first.
    fn release(&self, mut slot: Slot) {
        if self.closed.load(Ordering::SeqCst) {
            self.close_connection(slot.client);
            self.notify_idle_changed();
            return;
        }

        slot.metadata.mark_checkin();

        if self.pool_config.sp_reset_connection {
            slot.client.mark_needs_reset();
            self.metrics.lock().resets_performed += 1;
        }

        if self.pool_config.test_on_checkin {
            self.metrics.lock().health_checks_performed += 1;
            if !slot.client.ping() {
                tracing::debug!(id = slot.metadata.id, "checkin health check failed, dropping connection");
                self.metrics.lock().health_checks_failed += 1;
                self.close_connection(slot.client);
                self.notify_idle_changed();
                return;
            }
            slot.metadata.mark_health_check();
        }

        self.idle.lock().push_back(slot);
        self.notify_idle_changed();
    }

    /// Sweep the idle queue, evicting expired/unhealthy connections and
    /// pinging those due for a health check.
    fn sweep_idle(&self) {
        let candidates: Vec<Slot> = self.idle.lock().drain(..).collect();
        let mut keep = Vec::with_capacity(candidates.len());

        for mut slot in candidates {
            if slot.metadata.is_expired(self.pool_config.max_lifetime)
                || slot.metadata.is_idle_expired(self.pool_config.idle_timeout)
            {
                tracing::debug!(id = slot.metadata.id, "evicting expired pooled connection");
                self.close_connection(slot.client);
                continue;
            }

            if slot.metadata.needs_health_check(self.pool_config.health_check_interval) {
                self.metrics.lock().health_checks_performed += 1;
                if slot.client.ping() {
                    slot.metadata.mark_health_check();
                    keep.push(slot);
                } else {
                    tracing::debug!(id = slot.metadata.id, "evicting unhealthy idle connection");
                    self.metrics.lock().health_checks_failed += 1;
                    self.close_connection(slot.client);
                }
            } else {
                keep.push(slot);
            }
        }

        while self.total.load(Ordering::SeqCst) < self.pool_config.min_connections {
            if !self.try_reserve() {
                break;
            }
            match self.create_connection() {
                Ok(slot) => keep.push(slot),
                Err(error) => {
                    self.total.fetch_sub(1, Ordering::SeqCst);
                    tracing::warn!(%error, "failed to replenish pool to min_connections");
                    break;
                }
            }
        }

        *self.idle.lock() = keep.into();
        self.notify_idle_changed();
    }
}

impl Pool {
    /// Create a new pool builder.
    ///
    /// Use the builder to configure the pool before creating it.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Create a new pool.
    ///
    /// Returns immediately without blocking on `min_connections`; the
    /// background cleaner thread opens connections up to `min_connections`
    /// shortly after the pool is created, and keeps topping up to that
    /// floor as idle connections are evicted for being expired or
    /// unhealthy. It also health-checks long-idle connections on
    /// `health_check_interval`. For more control, use [`Pool::builder()`].
    pub fn new(conn_config: Config, pool_config: PoolConfig) -> Result<Self, PoolError> {
        pool_config.validate()?;

        let inner = Arc::new(PoolInner {
            conn_config,
            pool_config: pool_config.clone(),
            idle: Mutex::new(VecDeque::new()),
            idle_changed: Condvar::new(),
            total: AtomicU32::new(0),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            shutdown: (Mutex::new(false), Condvar::new()),
            created_at: Instant::now(),
            metrics: Mutex::new(PoolMetricsInner::default()),
        });

        tracing::info!(
            min = pool_config.min_connections,
            max = pool_config.max_connections,
            "connection pool created"
        );

        let cleaner_inner = Arc::clone(&inner);
        let cleaner = std::thread::Builder::new()
            .name("mssql-pool-cleaner".to_string())
            .spawn(move || Self::run_cleaner(cleaner_inner))
            .map_err(|e| PoolError::Configuration(format!("failed to spawn cleaner thread: {e}")))?;

        Ok(Self {
            inner,
            cleaner: Mutex::new(Some(cleaner)),
        })
    }

    fn run_cleaner(inner: Arc<PoolInner>) {
        inner.sweep_idle();

        let (lock, condvar) = &inner.shutdown;
        loop {
            let mut shutting_down = lock.lock();
            condvar.wait_for(&mut shutting_down, inner.pool_config.health_check_interval);
            let stop = *shutting_down || inner.closed.load(Ordering::SeqCst);
            drop(shutting_down);

            if stop {
                break;
            }
            inner.sweep_idle();
        }
    }

    /// Get a connection from the pool.
    ///
    /// This will either return an existing idle connection or create a new one
    /// if the pool is not at capacity. If all connections are in use and the
    /// pool is at capacity, this blocks the calling thread until a connection
    /// becomes available or `connection_timeout` elapses.
    pub fn get(&self) -> Result<PooledConnection, PoolError> {
        match self.acquire() {
            Ok(conn) => {
                self.inner.metrics.lock().checkouts_successful += 1;
                Ok(conn)
            }
            Err(error) => {
                self.inner.metrics.lock().checkouts_failed += 1;
                Err(error)
            }
        }
    }

    /// Try to get a connection without waiting for one to free up.
    ///
    /// Returns `Ok(None)` if no idle connection is available and the pool is
    /// already at `max_connections`, without attempting to create a new one.
    pub fn try_get(&self) -> Result<Option<PooledConnection>, PoolError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(PoolError::PoolClosed);
        }

        if let Some(mut slot) = self.inner.idle.lock().pop_front() {
            slot.metadata.mark_checkout();
            self.inner.metrics.lock().checkouts_successful += 1;
            return Ok(Some(PooledConnection {
                slot: Some(slot),
                pool: Arc::clone(&self.inner),
            }));
        }

        if self.inner.try_reserve() {
            return match self.inner.create_connection() {
                Ok(mut slot) => {
                    slot.metadata.mark_checkout();
                    self.inner.metrics.lock().checkouts_successful += 1;
                    Ok(Some(PooledConnection {
                        slot: Some(slot),
                        pool: Arc::clone(&self.inner),
                    }))
                }
                Err(error) => {
                    self.inner.total.fetch_sub(1, Ordering::SeqCst);
                    self.inner.notify_idle_changed();
                    Err(error)
                }
            };
        }

        Ok(None)
    }

    fn acquire(&self) -> Result<PooledConnection, PoolError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(PoolError::PoolClosed);
        }

        tracing::trace!("acquiring connection from pool");

        let deadline = Instant::now() + self.inner.pool_config.connection_timeout;

        loop {
            if self.inner.closed.load(Ordering::SeqCst) {
                return Err(PoolError::PoolClosed);
            }

            if let Some(mut slot) = self.inner.idle.lock().pop_front() {
                if self.inner.pool_config.test_on_checkout
                    && slot
                        .metadata
                        .needs_health_check(self.inner.pool_config.health_check_interval)
                {
                    self.inner.metrics.lock().health_checks_performed += 1;
                    if !slot.client.ping() {
                        tracing::debug!(id = slot.metadata.id, "checkout health check failed, dropping connection");
                        self.inner.metrics.lock().health_checks_failed += 1;
                        self.inner.close_connection(slot.client);
                        self.inner.notify_idle_changed();
                        continue;
                    }
                    slot.metadata.mark_health_check();
                }

                slot.metadata.mark_checkout();
                tracing::trace!(id = slot.metadata.id, "checked out idle connection");
                return Ok(PooledConnection {
                    slot: Some(slot),
                    pool: Arc::clone(&self.inner),
                });
            }

            if self.inner.try_reserve() {
                match self.inner.create_connection() {
                    Ok(mut slot) => {
                        slot.metadata.mark_checkout();
                        tracing::trace!(id = slot.metadata.id, "created new pooled connection");
                        return Ok(PooledConnection {
                            slot: Some(slot),
                            pool: Arc::clone(&self.inner),
                        });
                    }
                    Err(error) => {
                        self.inner.total.fetch_sub(1, Ordering::SeqCst);
                        self.inner.notify_idle_changed();
                        return Err(error);
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PoolError::AcquireTimeout(
                    self.inner.pool_config.connection_timeout,
                ));
            }

            let mut idle = self.inner.idle.lock();
            if !idle.is_empty() {
                continue;
            }
            self.inner
                .idle_changed
                .wait_for(&mut idle, deadline - now);
        }
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let total = self.inner.total.load(Ordering::SeqCst);
        let available = self.inner.idle.lock().len() as u32;
        PoolStatus {
            available,
            in_use: total.saturating_sub(available),
            total,
            max: self.inner.pool_config.max_connections,
        }
    }

    /// Get pool metrics.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let inner = self.inner.metrics.lock();
        PoolMetrics {
            connections_created: inner.connections_created,
            connections_closed: inner.connections_closed,
            checkouts_successful: inner.checkouts_successful,
            checkouts_failed: inner.checkouts_failed,
            health_checks_performed: inner.health_checks_performed,
            health_checks_failed: inner.health_checks_failed,
            resets_performed: inner.resets_performed,
            resets_failed: inner.resets_failed,
            uptime: self.inner.created_at.elapsed(),
        }
    }

    /// Close the pool, stopping the background cleaner and closing all
    /// idle connections. Connections currently checked out are closed as
    /// they are returned.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);

        {
            let (lock, condvar) = &self.inner.shutdown;
            *lock.lock() = true;
            condvar.notify_all();
        }

        if let Some(handle) = self.cleaner.lock().take() {
            let _ = handle.join();
        }

        let drained: Vec<Slot> = self.inner.idle.lock().drain(..).collect();
        for slot in drained {
            self.inner.close_connection(slot.client);
        }

        self.inner.notify_idle_changed();
        tracing::info!("connection pool closed");
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.pool_config
    }
}

/// Builder for creating a connection pool.
///
/// # Example
///
/// ```rust,ignore
/// let pool = Pool::builder()
///     .client_config(client_config)
///     .pool_config(pool_config)
///     .build()?;
/// ```
pub struct PoolBuilder {
    conn_config: Option<Config>,
    pool_config: PoolConfig,
}

impl PoolBuilder {
    /// Create a new pool builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conn_config: None,
            pool_config: PoolConfig::default(),
        }
    }

    /// Set the connection configuration used to open new connections.
    #[must_use]
    pub fn client_config(mut self, config: Config) -> Self {
        self.conn_config = Some(config);
        self
    }

    /// Set the pool configuration.
    #[must_use]
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Set the minimum number of connections.
    #[must_use]
    pub fn min_connections(mut self, count: u32) -> Self {
        self.pool_config.min_connections = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.pool_config.max_connections = count;
        self
    }

    /// Set the connection acquisition timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.pool_config.connection_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.pool_config.idle_timeout = timeout;
        self
    }

    /// Enable or disable session reset on return.
    #[must_use]
    pub fn sp_reset_connection(mut self, enabled: bool) -> Self {
        self.pool_config.sp_reset_connection = enabled;
        self
    }

    /// Build the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Configuration`] if no connection configuration
    /// was supplied via [`PoolBuilder::client_config`].
    pub fn build(self) -> Result<Pool, PoolError> {
        let conn_config = self.conn_config.ok_or_else(|| {
            PoolError::Configuration("client_config is required".to_string())
        })?;
        Pool::new(conn_config, self.pool_config)
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: u32,
    /// Number of connections currently in use.
    pub in_use: u32,
    /// Total number of connections.
    pub total: u32,
    /// Maximum allowed connections.
    pub max: u32,
}

impl PoolStatus {
    /// Calculate the utilization percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (f64::from(self.in_use) / f64::from(self.max)) * 100.0
    }

    /// Check if the pool is at capacity.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.total >= self.max
    }
}

/// Metrics collected from the pool.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Total connections created since pool start.
    pub connections_created: u64,
    /// Total connections closed since pool start.
    pub connections_closed: u64,
    /// Successful connection checkouts.
    pub checkouts_successful: u64,
    /// Failed connection checkouts (timeouts, pool closed, etc.).
    pub checkouts_failed: u64,
    /// Health checks performed.
    pub health_checks_performed: u64,
    /// Health checks that failed.
    pub health_checks_failed: u64,
    /// Connection resets performed.
    pub resets_performed: u64,
    /// Connection resets that failed.
    pub resets_failed: u64,
    /// Time since pool creation.
    pub uptime: std::time::Duration,
}

impl PoolMetrics {
    /// Calculate checkout success rate (0.0 to 1.0).
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        let total = self.checkouts_successful + self.checkouts_failed;
        if total == 0 {
            return 1.0;
        }
        self.checkouts_successful as f64 / total as f64
    }

    /// Calculate health check success rate (0.0 to 1.0).
    #[must_use]
    pub fn health_check_success_rate(&self) -> f64 {
        if self.health_checks_performed == 0 {
            return 1.0;
        }
        let successful = self.health_checks_performed - self.health_checks_failed;
        successful as f64 / self.health_checks_performed as f64
    }
}

/// A connection retrieved from the pool.
///
/// When dropped, the connection is returned to the pool: a session reset is
/// marked (if configured) and, if still healthy, the connection goes back to
/// the idle queue. An unhealthy connection is closed and the pool's total
/// count is decremented, freeing a slot for a new connection.
pub struct PooledConnection {
    slot: Option<Slot>,
    pool: Arc<PoolInner>,
}

impl PooledConnection {
    /// Get the connection metadata.
    #[must_use]
    pub fn metadata(&self) -> &ConnectionMetadata {
        &self
            .slot
            .as_ref()
            .expect("pooled connection used after detach")
            .metadata
    }

    /// Detach the connection from the pool.
    ///
    /// The connection is removed from the pool's accounting and returned to
    /// the caller; it will not be health-checked, reset, or returned to the
    /// idle queue.
    #[must_use]
    pub fn detach(mut self) -> Client<Ready> {
        let slot = self
            .slot
            .take()
            .expect("pooled connection slot already taken");
        self.pool.total.fetch_sub(1, Ordering::SeqCst);
        self.pool.notify_idle_changed();
        std::mem::forget(self);
        slot.client
    }
}

impl std::ops::Deref for PooledConnection {
    type Target = Client<Ready>;

    fn deref(&self) -> &Self::Target {
        &self
            .slot
            .as_ref()
            .expect("pooled connection used after detach")
            .client
    }
}

impl std::ops::DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self
            .slot
            .as_mut()
            .expect("pooled connection used after detach")
            .client
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.release(slot);
        }
    }
}
