//! Transaction-scoped PostgreSQL advisory locks.

use xxhash_rust::xxh32::xxh32;

use crate::executor::{Executor, Transactional};
use crate::expect::expect_result;
use crate::types::SqlValue;
use crate::{PgError, PgResult, TRACING_TARGET_LOCK};

const LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(?::regclass::oid::int4, ?)";

/// An integer id of up to 32 bits usable as an advisory lock id.
///
/// Unsigned ids keep their bits, so values above `i32::MAX` map to negative
/// lock ids.
pub trait LockId {
    /// Converts the id into the `int4` lock id.
    fn into_lock_id(self) -> i32;
}

macro_rules! impl_lock_id {
    ($($ty:ty),*) => {
        $(
            impl LockId for $ty {
                #[inline]
                fn into_lock_id(self) -> i32 {
                    i32::from(self)
                }
            }
        )*
    };
}

impl_lock_id!(i8, i16, i32, u8, u16);

impl LockId for u32 {
    #[inline]
    fn into_lock_id(self) -> i32 {
        i32::from_ne_bytes(self.to_ne_bytes())
    }
}

/// Takes `pg_advisory_xact_lock` locks namespaced by a registry table.
///
/// The lock key pairs the OID of the registry table with a 32-bit id, so
/// equal ids under different registries never collide. Locks are released
/// when the surrounding transaction ends and cannot be released earlier.
///
/// String and byte ids are hashed with xxHash32 under a configurable seed.
/// Every process contending for the same locks must use the same seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvisoryLock {
    seed: u32,
}

impl AdvisoryLock {
    /// Creates a lock helper hashing with `seed`.
    #[inline]
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// Returns the hash seed.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Hashes a string or byte id into a lock id.
    #[inline]
    pub fn hash_key(&self, key: impl AsRef<[u8]>) -> u32 {
        xxh32(key.as_ref(), self.seed)
    }

    /// Locks a string or byte id by its hash.
    ///
    /// Blocks until the lock is granted.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Config`] outside a transaction and
    /// [`PgError::Query`] when the statement fails.
    pub async fn lock_by_hash<C>(
        &self,
        conn: &mut C,
        registry: &str,
        key: impl AsRef<[u8]>,
    ) -> PgResult<()>
    where
        C: Executor + Transactional,
    {
        self.lock_by_int(conn, registry, self.hash_key(key)).await
    }

    /// Locks an integer id of up to 32 bits.
    ///
    /// Blocks until the lock is granted.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Config`] outside a transaction and
    /// [`PgError::Query`] when the statement fails.
    #[tracing::instrument(skip(self, conn, id), target = TRACING_TARGET_LOCK)]
    pub async fn lock_by_int<C>(
        &self,
        conn: &mut C,
        registry: &str,
        id: impl LockId,
    ) -> PgResult<()>
    where
        C: Executor + Transactional,
    {
        let id = id.into_lock_id();
        if !conn.in_transaction() {
            return Err(PgError::Config(format!(
                "advisory lock on {registry}/{id} requires an open transaction"
            )));
        }

        tracing::debug!(target: TRACING_TARGET_LOCK, id, "Acquiring advisory lock");
        let binds = vec![SqlValue::Text(registry.to_owned()), SqlValue::Int(id)];
        expect_result(conn.execute_raw(LOCK_SQL, binds).await, &[])?;
        tracing::debug!(target: TRACING_TARGET_LOCK, id, "Advisory lock acquired");

        Ok(())
    }
}
