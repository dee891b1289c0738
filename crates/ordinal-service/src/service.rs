//! Composition of store, cache and relay.
//!
//! Every write runs in two phases. The transactional phase commits through the
//! store under `store_timeout`; if it fails or times out, nothing else
//! happens. The best-effort phase then invalidates cache entries and enqueues
//! events, in that order, and cannot fail the call.
//!
//! Writes run on a spawned task. Dropping the caller (a request timeout or a
//! client disconnect) detaches the task instead of cancelling it, so a commit
//! is always followed by its invalidations and enqueues.

use std::future::Future;
use std::time::Duration;

use ordinal_cache::BestEffortCache;
use ordinal_core::{Item, ItemDraft, ItemKey, ItemUpdate, Priority};
use ordinal_relay::RelayHandle;
use ordinal_storage::{DynStore, PageRequest, StorageError};
use tracing::{Instrument, debug, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::listing::{ItemList, ListMeta};

/// Cache TTL for a read-through entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Upper bound for one transactional phase.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub cache_ttl: Duration,
    pub store_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct ItemService {
    store: DynStore,
    cache: BestEffortCache,
    relay: RelayHandle,
    settings: ServiceSettings,
}

impl ItemService {
    pub fn new(
        store: DynStore,
        cache: BestEffortCache,
        relay: RelayHandle,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            cache,
            relay,
            settings,
        }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Cache-aside read.
    ///
    /// A miss that reads the row just before a concurrent write commits can
    /// repopulate the entry after that write's invalidation. Such an entry is
    /// stale for at most `cache_ttl`.
    #[instrument(skip(self), fields(item.id = key.id, item.scope = key.scope))]
    pub async fn get(&self, key: ItemKey) -> ServiceResult<Item> {
        if let Some(item) = self.cache.get(key).await {
            return Ok(item);
        }

        let item = self
            .committed(self.store.fetch_one(key))
            .await?
            .ok_or_else(|| ServiceError::not_found(key))?;

        self.cache.set(&item, self.settings.cache_ttl).await;
        Ok(item)
    }

    /// Checks the store answers within the same deadline as any other call.
    pub async fn ready(&self) -> ServiceResult<()> {
        self.committed(self.store.count_all()).await.map(|_| ())
    }

    /// Reads one page straight from the store, never from the cache.
    #[instrument(skip(self))]
    pub async fn list(&self, page: PageRequest) -> ServiceResult<ItemList> {
        let (items, total, removed) = self
            .committed(async {
                let items = self.store.fetch_page(page).await?;
                let total = self.store.count_all().await?;
                let removed = self.store.count_removed().await?;
                Ok((items, total, removed))
            })
            .await?;

        Ok(ItemList {
            meta: ListMeta {
                total,
                removed,
                limit: page.limit,
                offset: page.offset,
            },
            items,
        })
    }

    #[instrument(skip(self, draft), fields(item.scope = draft.scope))]
    pub async fn create(&self, draft: ItemDraft) -> ServiceResult<Item> {
        draft.validate()?;
        self.detached(self.clone().apply_create(draft)).await
    }

    /// Replaces name and description.
    ///
    /// Returns the re-read row, or `None` when that read failed after a
    /// successful commit; in that case no event is sent.
    #[instrument(skip(self, update), fields(item.id = update.id, item.scope = update.scope))]
    pub async fn update(&self, update: ItemUpdate) -> ServiceResult<Option<Item>> {
        update.validate()?;
        self.detached(self.clone().apply_update(update)).await
    }

    /// Soft-deletes and returns the removal record that was published.
    #[instrument(skip(self), fields(item.id = key.id, item.scope = key.scope))]
    pub async fn delete(&self, key: ItemKey) -> ServiceResult<Item> {
        self.detached(self.clone().apply_delete(key)).await
    }

    /// Moves an item and returns every row whose rank changed.
    #[instrument(skip(self), fields(item.id = key.id, item.scope = key.scope))]
    pub async fn reprioritize(&self, key: ItemKey, new_priority: Priority) -> ServiceResult<Vec<Item>> {
        self.detached(self.clone().apply_reprioritize(key, new_priority))
            .await
    }

    async fn apply_create(self, draft: ItemDraft) -> ServiceResult<Item> {
        let item = self.committed(self.store.insert(&draft)).await?;
        self.publish(item.clone()).await;
        Ok(item)
    }

    async fn apply_update(self, update: ItemUpdate) -> ServiceResult<Option<Item>> {
        let key = update.key();
        self.committed(self.store.update(&update)).await?;

        self.cache.invalidate(key).await;
        match self.committed(self.store.fetch_one(key)).await {
            Ok(Some(item)) => {
                self.publish(item.clone()).await;
                Ok(Some(item))
            }
            Ok(None) => {
                debug!("updated item vanished before re-read, event skipped");
                Ok(None)
            }
            Err(error) => {
                debug!(%error, "re-read after update failed, event skipped");
                Ok(None)
            }
        }
    }

    async fn apply_delete(self, key: ItemKey) -> ServiceResult<Item> {
        self.committed(self.store.soft_delete(key)).await?;

        self.cache.invalidate(key).await;
        let tombstone = Item::tombstone(key.id, key.scope);
        self.publish(tombstone.clone()).await;
        Ok(tombstone)
    }

    async fn apply_reprioritize(
        self,
        key: ItemKey,
        new_priority: Priority,
    ) -> ServiceResult<Vec<Item>> {
        let affected = self
            .committed(self.store.reprioritize(key, new_priority))
            .await?;

        for item in &affected {
            self.cache.invalidate(item.key()).await;
        }
        for item in &affected {
            self.publish(item.clone()).await;
        }
        Ok(affected)
    }

    /// Runs a write to completion on its own task. Dropping the returned
    /// future detaches the task instead of cancelling it.
    async fn detached<T>(
        &self,
        write: impl Future<Output = ServiceResult<T>> + Send + 'static,
    ) -> ServiceResult<T>
    where
        T: Send + 'static,
    {
        match tokio::spawn(write.in_current_span()).await {
            Ok(result) => result,
            Err(error) => Err(ServiceError::Store(StorageError::internal(format!(
                "write task failed: {error}"
            )))),
        }
    }

    /// Runs a store call under the deadline. Expiry drops the call, which
    /// rolls back any open transaction.
    async fn committed<T>(
        &self,
        op: impl Future<Output = Result<T, StorageError>>,
    ) -> ServiceResult<T> {
        match tokio::time::timeout(self.settings.store_timeout, op).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => Err(ServiceError::Store(StorageError::transaction_error(
                "deadline exceeded",
            ))),
        }
    }

    async fn publish(&self, item: Item) {
        // Drops are logged and counted by the relay.
        let _ = self.relay.enqueue(item).await;
    }
}
