//! # ordinal-storage
//!
//! Storage abstraction layer for Ordinal.
//!
//! This crate defines the [`PriorityStore`] trait, the shared error taxonomy
//! and the rank-shift arithmetic. It contains no backend; those live in
//! `ordinal-db-memory` and `ordinal-db-postgres`.
//!
//! ## Example
//!
//! ```ignore
//! use ordinal_core::ItemKey;
//! use ordinal_storage::{PriorityStore, StorageError};
//!
//! async fn move_to_front(store: &dyn PriorityStore, key: ItemKey) -> Result<usize, StorageError> {
//!     let affected = store.reprioritize(key, 1).await?;
//!     Ok(affected.len())
//! }
//! ```

mod error;
pub mod rank;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use rank::{RankLock, RankRange, ShiftDirection, ShiftPlan, check_target};
pub use traits::PriorityStore;
pub use types::PageRequest;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn PriorityStore>;
