//! Rank-locked PostgreSQL transactions.
//!
//! Every mutation that reads or rewrites ranks runs inside a
//! [`RankTransaction`]: begin, acquire the [`RankLock`] the operation needs,
//! do the work, commit. The underlying sqlx transaction rolls back on drop, so
//! a future that is cancelled mid-way (deadline, client disconnect) leaves no
//! partial shift behind.

use ordinal_storage::{RankLock, RankRange, StorageError};
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::{PgPool, PgTransaction};
use tracing::{debug, warn};

use crate::error::storage_error;

/// A PostgreSQL transaction holding a rank lock until commit or rollback.
pub struct RankTransaction {
    /// `None` once committed or rolled back.
    tx: Option<PgTransaction<'static>>,
    /// Most recently acquired lock; earlier ones stay held too.
    lock: Option<RankLock>,
}

impl RankTransaction {
    /// Begins a transaction and acquires `lock` before returning.
    ///
    /// For [`RankLock::Row`] a missing row yields `StorageError::NotFound`.
    pub async fn begin(pool: &PgPool, lock: RankLock) -> Result<Self, StorageError> {
        let mut this = Self::start(pool).await?;
        if let Err(err) = this.acquire(lock).await {
            this.abandon().await;
            return Err(err);
        }
        Ok(this)
    }

    /// Begins a transaction without taking any lock yet.
    ///
    /// Used when the lock range depends on a value read first.
    pub async fn start(pool: &PgPool) -> Result<Self, StorageError> {
        let tx = pool.begin().await.map_err(|e| {
            StorageError::transaction_error(format!("Failed to begin transaction: {e}"))
        })?;
        Ok(Self {
            tx: Some(tx),
            lock: None,
        })
    }

    /// Mutable access to the open transaction.
    pub fn conn(&mut self) -> Result<&mut PgTransaction<'static>, StorageError> {
        self.tx.as_mut().ok_or_else(|| {
            StorageError::transaction_error("Transaction already completed (committed or rolled back)")
        })
    }

    /// Acquires an additional lock inside this transaction.
    ///
    /// Locks are only released at commit or rollback, so widening is allowed
    /// and narrowing is a no-op.
    pub async fn acquire(&mut self, lock: RankLock) -> Result<(), StorageError> {
        let tx = self.conn()?;
        match lock {
            RankLock::All => {
                // SHARE ROW EXCLUSIVE conflicts with itself and with row writers,
                // and holds even when the table is empty.
                query("LOCK TABLE items IN SHARE ROW EXCLUSIVE MODE")
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| storage_error("lock items table", e))?;
            }
            RankLock::Range(range) => {
                lock_range(tx, range).await?;
            }
            RankLock::Row(key) => {
                let found: Option<i64> =
                    query_scalar("SELECT id FROM items WHERE id = $1 AND scope = $2 FOR UPDATE")
                        .bind(key.id)
                        .bind(key.scope)
                        .fetch_optional(&mut **tx)
                        .await
                        .map_err(|e| storage_error("lock item row", e))?;
                if found.is_none() {
                    return Err(StorageError::not_found(key));
                }
            }
        }
        debug!(?lock, "rank lock acquired");
        self.lock = Some(lock);
        Ok(())
    }

    /// Commits the transaction, releasing the lock.
    ///
    /// A deferred rank collision surfaces here as `StorageError::TransactionError`.
    pub async fn commit(mut self) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.take() {
            tx.commit()
                .await
                .map_err(|e| storage_error("commit rank transaction", e))?;
            debug!(lock = ?self.lock, "rank transaction committed");
        }
        Ok(())
    }

    /// Rolls the transaction back explicitly.
    pub async fn rollback(mut self) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(|e| {
                StorageError::transaction_error(format!("Failed to rollback transaction: {e}"))
            })?;
            debug!(lock = ?self.lock, "rank transaction rolled back");
        }
        Ok(())
    }

    /// Rolls back on an expected early exit (not found, out of range).
    /// A rollback failure is logged; the connection is discarded by the pool.
    pub async fn abandon(self) {
        if let Err(error) = self.rollback().await {
            warn!(%error, "rank transaction rollback failed");
        }
    }
}

impl Drop for RankTransaction {
    fn drop(&mut self) {
        if self.tx.is_some() {
            // The inner sqlx transaction issues ROLLBACK on drop.
            warn!(lock = ?self.lock, "RankTransaction dropped without commit, rolling back");
        }
    }
}

/// Locks every row whose rank lies in `range`, in ascending rank order.
async fn lock_range(tx: &mut PgTransaction<'static>, range: RankRange) -> Result<(), StorageError> {
    let locked: Vec<i64> = query_scalar(
        "SELECT id FROM items WHERE priority BETWEEN $1 AND $2 ORDER BY priority FOR UPDATE",
    )
    .bind(range.lo)
    .bind(range.hi)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| storage_error("lock rank range", e))?;

    debug!(lo = range.lo, hi = range.hi, rows = locked.len(), "rank range locked");
    Ok(())
}
