//! Query strings and bodies of the item routes.

use ordinal_core::{Item, ItemId, ItemKey, Priority, ScopeId};
use ordinal_storage::PageRequest;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// `?id=..&scope=..` with `projectId` accepted for `scope`.
///
/// Values stay strings so a malformed number becomes a JSON 400 rather than
/// the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub id: Option<String>,
    #[serde(alias = "projectId")]
    pub scope: Option<String>,
}

impl ItemQuery {
    pub fn key(&self) -> Result<ItemKey, ApiError> {
        let id: ItemId = parse_required("id", self.id.as_deref())?;
        let scope: ScopeId = parse_required("scope", self.scope.as_deref())?;
        Ok(ItemKey::new(id, scope))
    }
}

/// `?scope=..` for create.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    #[serde(alias = "projectId")]
    pub scope: Option<String>,
}

impl ScopeQuery {
    pub fn scope(&self) -> Result<ScopeId, ApiError> {
        parse_required("scope", self.scope.as_deref())
    }
}

/// `?limit=..&offset=..`; absent or malformed values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> PageRequest {
        let limit = parse_optional(self.limit.as_deref()).unwrap_or(PageRequest::DEFAULT_LIMIT);
        let offset = parse_optional(self.offset.as_deref()).unwrap_or(0);
        PageRequest::new(limit, offset)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprioritizeBody {
    pub new_priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedResponse {
    pub id: ItemId,
    pub scope: ScopeId,
    pub removed: bool,
}

impl From<&Item> for RemovedResponse {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            scope: item.scope,
            removed: item.removed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrioritiesResponse {
    pub priorities: Vec<Item>,
}

fn parse_required(name: &str, raw: Option<&str>) -> Result<i64, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::bad_request(format!("missing query parameter `{name}`")))?;
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("query parameter `{name}` must be an integer")))
}

fn parse_optional(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse().ok())
}
