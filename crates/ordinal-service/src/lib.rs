//! Orchestration service for Ordinal.
//!
//! [`ItemService`] composes the priority store (record of truth), the
//! best-effort item cache and the event relay. Reads are cache-aside; writes
//! commit first, then evict cache entries, then enqueue events, then return.

mod error;
mod listing;
mod service;

pub use error::{ServiceError, ServiceResult};
pub use listing::{ItemList, ListMeta};
pub use service::{DEFAULT_CACHE_TTL, DEFAULT_STORE_TIMEOUT, ItemService, ServiceSettings};
