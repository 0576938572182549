//! Per-dictionary advisory lock.
//!
//! All mutating operations on one dictionary (import, undo, redo) must be
//! mutually exclusive across every server instance. The guard holds an open
//! transaction that has taken `pg_advisory_xact_lock` on the dictionary's
//! derived key; committing or dropping the guard ends the transaction and
//! frees the lock, so a crashed operation can never wedge a dictionary.
//! Reads never take this lock.

use sqlx::{PgPool, Postgres, Transaction};

use refdata_core::dictionary::dictionary_lock_key;

/// Guard for the advisory lock of one dictionary.
pub struct DictionaryLock {
    tx: Transaction<'static, Postgres>,
    key: i64,
}

impl DictionaryLock {
    /// Block until the dictionary's lock is acquired.
    pub async fn acquire(pool: &PgPool, dictionary_code: &str) -> Result<Self, sqlx::Error> {
        let key = dictionary_lock_key(dictionary_code);
        let mut tx = pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut *tx)
            .await?;
        tracing::debug!(dictionary_code, key, "Acquired dictionary lock");
        Ok(Self { tx, key })
    }

    /// Attempt to acquire without blocking. Returns `None` when another
    /// operation currently holds the dictionary's lock.
    pub async fn try_acquire(
        pool: &PgPool,
        dictionary_code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let key = dictionary_lock_key(dictionary_code);
        let mut tx = pool.begin().await?;
        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
            .bind(key)
            .fetch_one(&mut *tx)
            .await?;
        if locked {
            Ok(Some(Self { tx, key }))
        } else {
            tx.rollback().await?;
            Ok(None)
        }
    }

    /// The derived advisory-lock key this guard holds.
    pub fn key(&self) -> i64 {
        self.key
    }

    /// Release the lock by closing the guard transaction.
    ///
    /// Dropping the guard instead also releases the lock (the transaction
    /// rolls back when returned to the pool); `release` just makes the
    /// happy path explicit.
    pub async fn release(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}
