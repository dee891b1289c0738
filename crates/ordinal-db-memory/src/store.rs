use std::collections::BTreeMap;

use async_trait::async_trait;
use ordinal_core::{Item, ItemDraft, ItemId, ItemKey, ItemUpdate, Priority, now_utc};
use ordinal_storage::{PageRequest, PriorityStore, ShiftPlan, StorageError, check_target};
use tokio::sync::RwLock;
use tracing::debug;

/// Rows plus a rank index. Both maps are always mutated together.
#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<ItemId, Item>,
    /// priority -> id; unique by construction.
    by_rank: BTreeMap<Priority, ItemId>,
    last_id: ItemId,
}

impl Table {
    fn max_priority(&self) -> Priority {
        self.by_rank.keys().next_back().copied().unwrap_or(0)
    }

    fn find(&self, key: ItemKey) -> Option<&Item> {
        self.rows.get(&key.id).filter(|item| item.scope == key.scope)
    }

    fn find_mut(&mut self, key: ItemKey) -> Option<&mut Item> {
        self.rows
            .get_mut(&key.id)
            .filter(|item| item.scope == key.scope)
    }
}

/// In-memory priority store.
///
/// Writers hold the table's write lock for the whole mutation, which covers
/// every `RankLock` a backend can be asked for. No `.await` happens while a
/// shift is half-applied, so a dropped call never leaves ranks inconsistent.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    table: RwLock<Table>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rows.is_empty()
    }
}

#[async_trait]
impl PriorityStore for InMemoryStore {
    async fn fetch_one(&self, key: ItemKey) -> Result<Option<Item>, StorageError> {
        Ok(self.table.read().await.find(key).cloned())
    }

    async fn fetch_page(&self, page: PageRequest) -> Result<Vec<Item>, StorageError> {
        let table = self.table.read().await;
        let items = table
            .by_rank
            .values()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .filter_map(|id| table.rows.get(id).cloned())
            .collect();
        Ok(items)
    }

    async fn insert(&self, draft: &ItemDraft) -> Result<Item, StorageError> {
        draft.validate()?;

        let mut table = self.table.write().await;
        let priority = table.max_priority() + 1;
        table.last_id += 1;

        let item = Item {
            id: table.last_id,
            scope: draft.scope,
            name: draft.name.clone(),
            description: draft.description.clone(),
            priority,
            removed: false,
            created_at: now_utc(),
        };
        table.by_rank.insert(priority, item.id);
        table.rows.insert(item.id, item.clone());

        debug!(item.id = item.id, priority, "item inserted");
        Ok(item)
    }

    async fn update(&self, update: &ItemUpdate) -> Result<(), StorageError> {
        update.validate()?;

        let mut table = self.table.write().await;
        let item = table
            .find_mut(update.key())
            .ok_or_else(|| StorageError::not_found(update.key()))?;
        item.name = update.name.clone();
        item.description = update.description.clone();
        Ok(())
    }

    async fn soft_delete(&self, key: ItemKey) -> Result<(), StorageError> {
        let mut table = self.table.write().await;
        let item = table
            .find_mut(key)
            .ok_or_else(|| StorageError::not_found(key))?;
        item.removed = true;
        Ok(())
    }

    async fn reprioritize(
        &self,
        key: ItemKey,
        new_priority: Priority,
    ) -> Result<Vec<Item>, StorageError> {
        let mut table = self.table.write().await;

        let old = table
            .find(key)
            .map(|item| item.priority)
            .ok_or_else(|| StorageError::not_found(key))?;
        let Some(plan) = ShiftPlan::new(old, new_priority) else {
            return Ok(Vec::new());
        };
        check_target(new_priority, table.max_priority())?;

        let range = plan.lock_range();
        let moved: Vec<(Priority, ItemId)> = table
            .by_rank
            .range(range.lo..=range.hi)
            .map(|(priority, id)| (*priority, *id))
            .collect();

        for (priority, _) in &moved {
            table.by_rank.remove(priority);
        }

        let mut affected = Vec::with_capacity(moved.len());
        for (priority, id) in moved {
            let next = if id == key.id {
                new_priority
            } else {
                plan.apply(priority)
            };
            table.by_rank.insert(next, id);
            if let Some(item) = table.rows.get_mut(&id) {
                item.priority = next;
                affected.push(item.clone());
            }
        }
        affected.sort_by_key(|item| item.priority);

        debug!(
            item.id = key.id,
            item.scope = key.scope,
            from = old,
            to = new_priority,
            affected = affected.len(),
            "item reprioritized"
        );
        Ok(affected)
    }

    async fn count_all(&self) -> Result<i64, StorageError> {
        Ok(self.table.read().await.rows.len() as i64)
    }

    async fn count_removed(&self) -> Result<i64, StorageError> {
        let table = self.table.read().await;
        Ok(table.rows.values().filter(|item| item.removed).count() as i64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
