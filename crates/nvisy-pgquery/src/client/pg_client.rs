use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use deadpool::managed::{Hook, Pool};
use derive_more::{Deref, DerefMut};
use diesel::QueryableByName;
use diesel::pg::Pg;
use diesel::result::QueryResult;
use diesel_async::AsyncConnection;
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};
use diesel_async::scoped_futures::ScopedBoxFuture;

use super::custom_hooks;
use crate::executor::{CursorExecutor, Executor, Loader, Model, Transactional};
use crate::query::{Query, SelectQuery};
use crate::types::{PrimaryKey, SqlValue};
use crate::{
    AdvisoryLock, ConnectionPool, PgConfig, PgError, PgResult, PooledConnection,
    TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION, expect_success,
};

/// Connection pool status information.
#[derive(Debug, Clone)]
pub struct PgPoolStatus {
    /// Maximum number of connections in the pool
    pub max_size: usize,
    /// Current number of connections in the pool
    pub size: usize,
    /// Number of available connections
    pub available: usize,
    /// Number of requests waiting for connections
    pub waiting: usize,
}

impl PgPoolStatus {
    /// Returns the utilization of the pool (0.0 to 1.0).
    #[inline]
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.size.saturating_sub(self.available) as f64 / self.max_size as f64
        }
    }

    /// Returns whether the pool is under pressure (high utilization or waiting requests).
    #[inline]
    pub fn is_under_pressure(&self) -> bool {
        self.waiting > 0 || self.utilization() > 0.8
    }
}

/// Database client owning the connection pool.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct PgClient {
    inner: Arc<PgClientInner>,
}

struct PgClientInner {
    pool: ConnectionPool,
    config: PgConfig,
}

impl PgClient {
    /// Creates a client and its connection pool without connecting.
    ///
    /// Prefer [`PgConfig::build`], which validates the configuration first.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built.
    #[tracing::instrument(
        skip(config),
        target = TRACING_TARGET_CLIENT,
        fields(database_url = %config.database_url_masked())
    )]
    pub fn new(config: PgConfig) -> PgResult<Self> {
        tracing::info!(target: TRACING_TARGET_CLIENT, "Initializing database client");

        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup = Box::new(custom_hooks::setup_callback);
        let manager =
            AsyncDieselConnectionManager::new_with_config(&config.postgres_url, manager_config);

        let pool = Pool::builder(manager)
            .max_size(config.postgres_max_connections as usize)
            .wait_timeout(config.connection_timeout())
            .create_timeout(config.connection_timeout())
            .recycle_timeout(config.idle_timeout())
            .runtime(deadpool::Runtime::Tokio1)
            .post_create(Hook::sync_fn(custom_hooks::post_create))
            .pre_recycle(Hook::sync_fn(custom_hooks::pre_recycle))
            .build()
            .map_err(|e| {
                tracing::error!(target: TRACING_TARGET_CLIENT, error = %e, "Failed to create connection pool");
                PgError::Unexpected(format!("Failed to build connection pool: {e}").into())
            })?;

        Ok(Self {
            inner: Arc::new(PgClientInner { pool, config }),
        })
    }

    /// Creates a client and verifies connectivity with `SELECT 1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built, no connection can be
    /// acquired, or the probe fails.
    #[tracing::instrument(
        skip(config),
        target = TRACING_TARGET_CLIENT,
        fields(database_url = %config.database_url_masked())
    )]
    pub async fn new_with_test(config: PgConfig) -> PgResult<Self> {
        let this = Self::new(config)?;

        let mut conn = this.get_connection().await?;
        expect_success(conn.execute_raw("SELECT 1", Vec::new()).await).inspect_err(|e| {
            tracing::error!(target: TRACING_TARGET_CLIENT, error = %e, "Database connectivity test failed");
        })?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            max_connections = this.inner.config.postgres_max_connections,
            connection_timeout_secs = this.inner.config.postgres_connection_timeout_secs,
            idle_timeout_secs = this.inner.config.postgres_idle_timeout_secs,
            "Database client initialized"
        );

        Ok(this)
    }

    /// Gets a connection from the pool.
    ///
    /// Waits up to the configured connection timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Timeout`] if no connection is available in time.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn get_connection(&self) -> PgResult<PgConn> {
        let start = Instant::now();
        let conn = self.inner.pool.get().await.map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_CONNECTION,
                error = %e,
                elapsed = ?start.elapsed(),
                "Failed to acquire connection from pool"
            );
            PgError::from(e)
        })?;

        let elapsed = start.elapsed();
        if elapsed > Duration::from_millis(100) {
            tracing::warn!(
                target: TRACING_TARGET_CONNECTION,
                elapsed = ?elapsed,
                "Connection acquisition took longer than expected"
            );
        }

        Ok(PgConn::new(conn))
    }

    /// Returns an advisory-lock helper using the configured hash seed.
    #[inline]
    pub fn advisory_lock(&self) -> AdvisoryLock {
        self.inner.config.advisory_lock()
    }

    /// Gets the current pool status.
    #[inline]
    pub fn pool_status(&self) -> PgPoolStatus {
        let status = self.inner.pool.status();
        PgPoolStatus {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
            waiting: status.waiting,
        }
    }

    /// Gets the configuration used by this client.
    #[inline]
    pub fn config(&self) -> &PgConfig {
        &self.inner.config
    }
}

impl fmt::Debug for PgClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pool_status = self.pool_status();
        f.debug_struct("PgClient")
            .field("database_url", &self.inner.config.database_url_masked())
            .field(
                "pool_max_connections",
                &self.inner.config.postgres_max_connections,
            )
            .field("pool_current_size", &pool_status.size)
            .field("pool_available", &pool_status.available)
            .field("pool_waiting", &pool_status.waiting)
            .finish()
    }
}

/// A pooled connection.
///
/// Implements [`Executor`], [`Loader`], [`Transactional`] and
/// [`CursorExecutor`] by delegating to the underlying
/// [`AsyncPgConnection`], which it also dereferences to. The connection
/// returns to the pool on drop.
///
/// ```ignore
/// let mut conn = client.get_connection().await?;
/// let documents = Select::<Document>::new().all(&mut conn, &[]).await?;
/// ```
///
/// [`AsyncPgConnection`]: crate::PgConnection
#[derive(Deref, DerefMut)]
pub struct PgConn {
    #[deref]
    #[deref_mut]
    conn: PooledConnection,
}

impl PgConn {
    /// Creates a new connection wrapper from a pooled connection.
    pub fn new(conn: PooledConnection) -> Self {
        Self { conn }
    }

    /// Runs `f` in a transaction, committing on `Ok` and rolling back on `Err`.
    pub async fn transaction<'a, T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: for<'r> FnOnce(&'r mut PooledConnection) -> ScopedBoxFuture<'a, 'r, Result<T, E>>
            + Send
            + 'a,
        T: Send + 'a,
        E: From<diesel::result::Error> + Send + 'a,
    {
        self.conn.transaction(f).await
    }
}

impl fmt::Debug for PgConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConn").finish_non_exhaustive()
    }
}

impl Executor for PgConn {
    async fn execute(&mut self, query: &Query) -> QueryResult<usize> {
        Executor::execute(&mut *self.conn, query).await
    }

    async fn execute_raw(&mut self, sql: &str, binds: Vec<SqlValue>) -> QueryResult<usize> {
        Executor::execute_raw(&mut *self.conn, sql, binds).await
    }
}

impl<M> Loader<M> for PgConn
where
    M: Model + QueryableByName<Pg>,
{
    async fn load(&mut self, query: &Query) -> QueryResult<Vec<M>> {
        Loader::<M>::load(&mut *self.conn, query).await
    }

    async fn count(&mut self, query: &SelectQuery) -> QueryResult<i64> {
        Loader::<M>::count(&mut *self.conn, query).await
    }
}

impl Transactional for PgConn {
    async fn begin(&mut self) -> QueryResult<()> {
        Transactional::begin(&mut *self.conn).await
    }

    async fn commit(&mut self) -> QueryResult<()> {
        Transactional::commit(&mut *self.conn).await
    }

    async fn rollback(&mut self) -> QueryResult<()> {
        Transactional::rollback(&mut *self.conn).await
    }

    fn in_transaction(&mut self) -> bool {
        Transactional::in_transaction(&mut *self.conn)
    }
}

impl CursorExecutor for PgConn {
    async fn declare_cursor(&mut self, name: &str, query: &SelectQuery) -> QueryResult<()> {
        CursorExecutor::declare_cursor(&mut *self.conn, name, query).await
    }

    async fn fetch_forward<K: PrimaryKey>(
        &mut self,
        name: &str,
        count: usize,
    ) -> QueryResult<Vec<K>> {
        CursorExecutor::fetch_forward(&mut *self.conn, name, count).await
    }

    async fn close_cursor(&mut self, name: &str) -> QueryResult<()> {
        CursorExecutor::close_cursor(&mut *self.conn, name).await
    }
}
