//! Pooled PostgreSQL connections.
//!
//! [`PgClient`] owns a [`deadpool`] pool of [`AsyncPgConnection`]s and
//! hands out [`PgConn`] wrappers that implement every execution contract of
//! this crate.
//!
//! [`AsyncPgConnection`]: diesel_async::AsyncPgConnection

mod custom_hooks;
mod pg_client;
mod pg_config;

use deadpool::managed::{Object, Pool};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;

pub use self::pg_client::{PgClient, PgConn, PgPoolStatus};
pub use self::pg_config::PgConfig;

/// Type alias for the connection pool.
pub type ConnectionPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Type alias for a connection object from the pool.
pub type PooledConnection = Object<AsyncDieselConnectionManager<AsyncPgConnection>>;
