use ordinal_core::Item;
use serde::Serialize;

/// Listing metadata. Counts cover the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListMeta {
    pub total: i64,
    pub removed: i64,
    pub limit: i64,
    pub offset: i64,
}

/// One page of items in priority order, with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemList {
    pub meta: ListMeta,
    pub items: Vec<Item>,
}
