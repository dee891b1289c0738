//! The managed entity and the request shapes that produce it.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::error::{CoreError, Result};

/// Store-assigned item identifier.
pub type ItemId = i64;

/// Caller-supplied grouping key ("project"). Used for addressing only; ranks
/// are unique across the whole store, not per scope.
pub type ScopeId = i64;

/// Position in the dense, 1-based total order.
pub type Priority = i64;

/// An item as persisted by the priority store.
///
/// The serialized form is the wire shape consumed by HTTP clients, the cache
/// and the analytics sink:
/// `{id, scope, name, description, priority, removed, createdAt}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(alias = "projectId")]
    pub scope: ScopeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    #[serde(default)]
    pub removed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Item {
    /// Address of this item.
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.id, self.scope)
    }

    /// Synthetic removal record carrying only the identity of a soft-deleted
    /// item. Name, description and priority are left at their zero values and
    /// `created_at` is the Unix epoch.
    pub fn tombstone(id: ItemId, scope: ScopeId) -> Self {
        Self {
            id,
            scope,
            name: String::new(),
            description: String::new(),
            priority: 0,
            removed: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

/// Composite address `(id, scope)` used by every single-item operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub id: ItemId,
    pub scope: ScopeId,
}

impl ItemKey {
    pub fn new(id: ItemId, scope: ScopeId) -> Self {
        Self { id, scope }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.scope)
    }
}

/// Candidate for insertion. The store assigns id, priority and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    #[serde(alias = "projectId")]
    pub scope: ScopeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ItemDraft {
    pub fn new(scope: ScopeId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }
}

/// In-place edit of the mutable text fields of an existing item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    pub id: ItemId,
    #[serde(alias = "projectId")]
    pub scope: ScopeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ItemUpdate {
    pub fn new(
        key: ItemKey,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: key.id,
            scope: key.scope,
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.id, self.scope)
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }
}

/// Rejects an empty name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::EmptyName);
    }
    Ok(())
}
