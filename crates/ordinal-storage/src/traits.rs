//! The storage trait every priority store backend implements.

use std::sync::Arc;

use async_trait::async_trait;
use ordinal_core::{Item, ItemDraft, ItemKey, ItemUpdate, Priority};

use crate::error::StorageError;
use crate::types::PageRequest;

/// Durable record of truth for items and their ranks.
///
/// Implementations own rank assignment: `insert` gives the new item
/// `max(priority) + 1` and `reprioritize` keeps ranks dense and unique. Both
/// must run as one atomic unit holding the matching [`RankLock`]; dropping an
/// in-flight call must leave no partial shift behind.
///
/// [`RankLock`]: crate::RankLock
#[async_trait]
pub trait PriorityStore: Send + Sync {
    /// Reads one item by address.
    ///
    /// Returns `None` if no row matches. Soft-deleted items are returned.
    async fn fetch_one(&self, key: ItemKey) -> Result<Option<Item>, StorageError>;

    /// Reads a page of items ordered by ascending priority, removed items included.
    async fn fetch_page(&self, page: PageRequest) -> Result<Vec<Item>, StorageError>;

    /// Inserts a new item at the end of the order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidItem` if the draft has an empty name.
    async fn insert(&self, draft: &ItemDraft) -> Result<Item, StorageError>;

    /// Replaces name and description of the addressed item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row matches `(id, scope)`.
    async fn update(&self, update: &ItemUpdate) -> Result<(), StorageError>;

    /// Flags the addressed item as removed. Its rank is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row matches `(id, scope)`.
    async fn soft_delete(&self, key: ItemKey) -> Result<(), StorageError>;

    /// Moves the addressed item to `new_priority`, shifting the rows in between.
    ///
    /// Returns every row whose rank changed, target included, ordered by
    /// ascending priority. Returns an empty vector when the item already holds
    /// `new_priority`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the target does not exist and
    /// `StorageError::InvalidItem` if `new_priority` is outside `1..=max`.
    async fn reprioritize(
        &self,
        key: ItemKey,
        new_priority: Priority,
    ) -> Result<Vec<Item>, StorageError>;

    /// Number of items in the store, removed included.
    async fn count_all(&self) -> Result<i64, StorageError>;

    /// Number of removed items in the store.
    async fn count_removed(&self) -> Result<i64, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl<S: PriorityStore + ?Sized> PriorityStore for Arc<S> {
    async fn fetch_one(&self, key: ItemKey) -> Result<Option<Item>, StorageError> {
        (**self).fetch_one(key).await
    }

    async fn fetch_page(&self, page: PageRequest) -> Result<Vec<Item>, StorageError> {
        (**self).fetch_page(page).await
    }

    async fn insert(&self, draft: &ItemDraft) -> Result<Item, StorageError> {
        (**self).insert(draft).await
    }

    async fn update(&self, update: &ItemUpdate) -> Result<(), StorageError> {
        (**self).update(update).await
    }

    async fn soft_delete(&self, key: ItemKey) -> Result<(), StorageError> {
        (**self).soft_delete(key).await
    }

    async fn reprioritize(
        &self,
        key: ItemKey,
        new_priority: Priority,
    ) -> Result<Vec<Item>, StorageError> {
        (**self).reprioritize(key, new_priority).await
    }

    async fn count_all(&self) -> Result<i64, StorageError> {
        (**self).count_all().await
    }

    async fn count_removed(&self) -> Result<i64, StorageError> {
        (**self).count_removed().await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
