//! In-memory priority store backend for Ordinal.
//!
//! This crate provides an in-process implementation of the `PriorityStore`
//! trait from `ordinal-storage`. It is used by development deployments
//! (`storage.backend = "memory"`) and by the test suites of the crates above it.
//!
//! # Example
//!
//! ```ignore
//! use ordinal_core::ItemDraft;
//! use ordinal_db_memory::InMemoryStore;
//! use ordinal_storage::PriorityStore;
//!
//! let store = InMemoryStore::new();
//! let item = store.insert(&ItemDraft::new(1, "first", "")).await?;
//! assert_eq!(item.priority, 1);
//! ```

mod store;

pub use ordinal_storage::{PriorityStore, StorageError};
pub use store::InMemoryStore;

/// Creates a new shared in-memory store.
pub fn create_store() -> ordinal_storage::DynStore {
    std::sync::Arc::new(InMemoryStore::new())
}
