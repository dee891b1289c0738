//! Core domain types for Ordinal.
//!
//! An [`Item`] carries a globally unique, dense `priority`. Every other crate
//! in the workspace speaks in these types; the serialized form of [`Item`] is
//! the wire shape shared by the HTTP layer, the cache and the analytics sink.

pub mod error;
pub mod item;
pub mod time;

pub use error::{CoreError, Result};
pub use item::{Item, ItemDraft, ItemId, ItemKey, ItemUpdate, Priority, ScopeId, validate_name};
pub use time::now_utc;
