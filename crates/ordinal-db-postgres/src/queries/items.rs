//! Item queries.
//!
//! Functions taking a `PgPool` run as standalone statements. Functions taking
//! a `PgTransaction` expect the caller to already hold the matching rank lock.

use chrono::{DateTime, Utc};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::{PgPool, PgTransaction};
use time::OffsetDateTime;

use ordinal_core::{Item, ItemDraft, ItemKey, ItemUpdate, Priority};
use ordinal_storage::{PageRequest, ShiftPlan, StorageError};

use crate::error::storage_error;

const ITEM_COLUMNS: &str = "id, scope, name, description, priority, removed, created_at";

type ItemRow = (i64, i64, String, String, i64, bool, DateTime<Utc>);

/// Converts chrono DateTime to time OffsetDateTime.
fn chrono_to_time(dt: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(dt.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        + time::Duration::nanoseconds(dt.timestamp_subsec_nanos() as i64)
}

fn row_to_item(row: ItemRow) -> Item {
    let (id, scope, name, description, priority, removed, created_at) = row;
    Item {
        id,
        scope,
        name,
        description,
        priority,
        removed,
        created_at: chrono_to_time(created_at),
    }
}

/// Reads one item by address. Removed items are returned.
pub async fn fetch_one(pool: &PgPool, key: ItemKey) -> Result<Option<Item>, StorageError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 AND scope = $2");
    let row: Option<ItemRow> = query_as(&sql)
        .bind(key.id)
        .bind(key.scope)
        .fetch_optional(pool)
        .await
        .map_err(|e| storage_error("fetch item", e))?;
    Ok(row.map(row_to_item))
}

/// Reads a page ordered by ascending priority.
pub async fn fetch_page(pool: &PgPool, page: PageRequest) -> Result<Vec<Item>, StorageError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY priority LIMIT $1 OFFSET $2");
    let rows: Vec<ItemRow> = query_as(&sql)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
        .map_err(|e| storage_error("fetch item page", e))?;
    Ok(rows.into_iter().map(row_to_item).collect())
}

/// Inserts a draft at `max(priority) + 1`. Requires `RankLock::All`.
pub async fn insert_at_end(
    tx: &mut PgTransaction<'_>,
    draft: &ItemDraft,
) -> Result<Item, StorageError> {
    let sql = format!(
        r#"INSERT INTO items (scope, name, description, priority)
           SELECT $1, $2, $3, COALESCE(MAX(priority), 0) + 1 FROM items
           RETURNING {ITEM_COLUMNS}"#
    );
    let row: ItemRow = query_as(&sql)
        .bind(draft.scope)
        .bind(&draft.name)
        .bind(&draft.description)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| storage_error("insert item", e))?;
    Ok(row_to_item(row))
}

/// Replaces name and description. Requires `RankLock::Row` on the same key.
pub async fn update_text(
    tx: &mut PgTransaction<'_>,
    update: &ItemUpdate,
) -> Result<(), StorageError> {
    let result = query("UPDATE items SET name = $3, description = $4 WHERE id = $1 AND scope = $2")
        .bind(update.id)
        .bind(update.scope)
        .bind(&update.name)
        .bind(&update.description)
        .execute(&mut **tx)
        .await
        .map_err(|e| storage_error("update item", e))?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found(update.key()));
    }
    Ok(())
}

/// Flags the addressed row as removed. Idempotent.
pub async fn soft_delete(pool: &PgPool, key: ItemKey) -> Result<(), StorageError> {
    let result = query("UPDATE items SET removed = TRUE WHERE id = $1 AND scope = $2")
        .bind(key.id)
        .bind(key.scope)
        .execute(pool)
        .await
        .map_err(|e| storage_error("soft delete item", e))?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found(key));
    }
    Ok(())
}

/// Current rank of the addressed row, read inside the transaction.
pub async fn current_priority(
    tx: &mut PgTransaction<'_>,
    key: ItemKey,
) -> Result<Option<Priority>, StorageError> {
    query_scalar("SELECT priority FROM items WHERE id = $1 AND scope = $2")
        .bind(key.id)
        .bind(key.scope)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| storage_error("read item priority", e))
}

/// Highest rank over the whole table, or 0 when empty.
pub async fn max_priority(tx: &mut PgTransaction<'_>) -> Result<Priority, StorageError> {
    query_scalar("SELECT COALESCE(MAX(priority), 0)::BIGINT FROM items")
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| storage_error("read max priority", e))
}

/// Moves the target to `plan.to` and shifts its neighbors in one statement.
///
/// Requires `RankLock::Range(plan.lock_range())` and that the target still
/// holds `plan.from`. Returns every changed row ordered by priority.
pub async fn apply_shift(
    tx: &mut PgTransaction<'_>,
    key: ItemKey,
    plan: ShiftPlan,
) -> Result<Vec<Item>, StorageError> {
    let shifted = plan.shifted();
    let sql = format!(
        r#"UPDATE items
           SET priority = CASE
               WHEN id = $1 AND scope = $2 THEN $3
               ELSE priority + $4
           END
           WHERE (id = $1 AND scope = $2)
              OR (priority BETWEEN $5 AND $6)
           RETURNING {ITEM_COLUMNS}"#
    );
    let rows: Vec<ItemRow> = query_as(&sql)
        .bind(key.id)
        .bind(key.scope)
        .bind(plan.to)
        .bind(plan.neighbor_delta())
        .bind(shifted.lo)
        .bind(shifted.hi)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| storage_error("shift item ranks", e))?;

    let mut affected: Vec<Item> = rows.into_iter().map(row_to_item).collect();
    affected.sort_by_key(|item| item.priority);
    Ok(affected)
}

/// Total number of rows, removed included.
pub async fn count_all(pool: &PgPool) -> Result<i64, StorageError> {
    query_scalar("SELECT COUNT(*) FROM items")
        .fetch_one(pool)
        .await
        .map_err(|e| storage_error("count items", e))
}

/// Number of removed rows.
pub async fn count_removed(pool: &PgPool) -> Result<i64, StorageError> {
    query_scalar("SELECT COUNT(*) FROM items WHERE removed")
        .fetch_one(pool)
        .await
        .map_err(|e| storage_error("count removed items", e))
}
