//! PostgreSQL implementation of the PriorityStore trait.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};

use ordinal_core::{Item, ItemDraft, ItemKey, ItemUpdate, Priority};
use ordinal_storage::{
    PageRequest, PriorityStore, RankLock, ShiftPlan, StorageError, check_target,
};

use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;
use crate::queries::items;
use crate::transaction::RankTransaction;

/// How often reprioritize re-locks when the target moved while it waited.
const MAX_LOCK_ATTEMPTS: usize = 3;

/// PostgreSQL priority store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new `PostgresStore` with the given configuration.
    ///
    /// This will create a connection pool and run migrations if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Creates a new `PostgresStore` from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Checks that the database answers.
    pub async fn ping(&self) -> Result<(), StorageError> {
        pool::test_connection(&self.pool).await.map_err(Into::into)
    }
}

#[async_trait]
impl PriorityStore for PostgresStore {
    #[instrument(skip(self), fields(item.id = key.id, item.scope = key.scope))]
    async fn fetch_one(&self, key: ItemKey) -> Result<Option<Item>, StorageError> {
        items::fetch_one(&self.pool, key).await
    }

    #[instrument(skip(self))]
    async fn fetch_page(&self, page: PageRequest) -> Result<Vec<Item>, StorageError> {
        items::fetch_page(&self.pool, page).await
    }

    #[instrument(skip(self, draft), fields(item.scope = draft.scope))]
    async fn insert(&self, draft: &ItemDraft) -> Result<Item, StorageError> {
        draft.validate()?;

        let mut tx = RankTransaction::begin(&self.pool, RankLock::All).await?;
        let item = items::insert_at_end(tx.conn()?, draft).await?;
        tx.commit().await?;

        debug!(item.id = item.id, priority = item.priority, "item inserted");
        Ok(item)
    }

    #[instrument(skip(self, update), fields(item.id = update.id, item.scope = update.scope))]
    async fn update(&self, update: &ItemUpdate) -> Result<(), StorageError> {
        update.validate()?;

        let mut tx = RankTransaction::begin(&self.pool, RankLock::Row(update.key())).await?;
        items::update_text(tx.conn()?, update).await?;
        tx.commit().await
    }

    #[instrument(skip(self), fields(item.id = key.id, item.scope = key.scope))]
    async fn soft_delete(&self, key: ItemKey) -> Result<(), StorageError> {
        items::soft_delete(&self.pool, key).await
    }

    #[instrument(skip(self), fields(item.id = key.id, item.scope = key.scope))]
    async fn reprioritize(
        &self,
        key: ItemKey,
        new_priority: Priority,
    ) -> Result<Vec<Item>, StorageError> {
        let mut tx = RankTransaction::start(&self.pool).await?;

        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            let Some(old) = items::current_priority(tx.conn()?, key).await? else {
                tx.abandon().await;
                return Err(StorageError::not_found(key));
            };
            let Some(plan) = ShiftPlan::new(old, new_priority) else {
                tx.commit().await?;
                return Ok(Vec::new());
            };
            let max = items::max_priority(tx.conn()?).await?;
            if let Err(err) = check_target(new_priority, max) {
                tx.abandon().await;
                return Err(err.into());
            }

            tx.acquire(plan.lock()).await?;

            // The target may have been shifted while we waited for the range.
            if items::current_priority(tx.conn()?, key).await? != Some(old) {
                debug!(attempt, "target rank moved while locking, retrying");
                continue;
            }

            let affected = items::apply_shift(tx.conn()?, key, plan).await?;
            tx.commit().await?;

            debug!(
                from = old,
                to = new_priority,
                affected = affected.len(),
                "item reprioritized"
            );
            return Ok(affected);
        }

        tx.abandon().await;
        Err(StorageError::transaction_error(format!(
            "rank of item {key} kept moving after {MAX_LOCK_ATTEMPTS} lock attempts"
        )))
    }

    async fn count_all(&self) -> Result<i64, StorageError> {
        items::count_all(&self.pool).await
    }

    async fn count_removed(&self) -> Result<i64, StorageError> {
        items::count_removed(&self.pool).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
