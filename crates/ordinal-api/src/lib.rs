//! HTTP-facing types for Ordinal.
//!
//! [`ApiError`] maps orchestration outcomes to status codes with a
//! `{"error": "..."}` body; the payload module holds the query and body
//! shapes of the `/api/v1` routes.

mod error;
mod payload;

pub use error::{ApiError, ApiResult};
pub use payload::{
    ItemBody, ItemQuery, ListQuery, PrioritiesResponse, RemovedResponse, ReprioritizeBody,
    ScopeQuery,
};
