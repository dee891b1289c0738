use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use ordinal_api::{
    ApiError, ApiResult, ItemBody, ItemQuery, ListQuery, PrioritiesResponse, RemovedResponse,
    ReprioritizeBody, ScopeQuery,
};
use ordinal_core::{Item, ItemDraft, ItemUpdate};
use ordinal_service::ItemList;
use serde::Serialize;
use serde_json::json;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.service.store().backend_name();
    match state.service.ready().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready", "store": backend }))),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": e.to_string() })),
            )
        }
    }
}

pub async fn metrics() -> impl IntoResponse {
    match crate::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn get_item(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> ApiResult<Json<Item>> {
    let item = state.service.get(query.key()?).await?;
    Ok(Json(item))
}

pub async fn create_item(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
    body: Result<Json<ItemBody>, JsonRejection>,
) -> ApiResult<Json<Item>> {
    let body = json_body(body)?;
    let draft = ItemDraft::new(query.scope()?, body.name, body.description);
    let item = state.service.create(draft).await?;
    Ok(Json(item))
}

/// Returns the stored row, or the request as sent if the follow-up read
/// missed after a successful commit.
pub async fn update_item(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
    body: Result<Json<ItemBody>, JsonRejection>,
) -> ApiResult<axum::response::Response> {
    let body = json_body(body)?;
    let update = ItemUpdate::new(query.key()?, body.name, body.description);
    let response = match state.service.update(update.clone()).await? {
        Some(item) => Json(item).into_response(),
        None => Json(update).into_response(),
    };
    Ok(response)
}

pub async fn remove_item(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> ApiResult<Json<RemovedResponse>> {
    let tombstone = state.service.delete(query.key()?).await?;
    Ok(Json(RemovedResponse::from(&tombstone)))
}

pub async fn reprioritize_item(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
    body: Result<Json<ReprioritizeBody>, JsonRejection>,
) -> ApiResult<Json<PrioritiesResponse>> {
    let key = query.key()?;
    let body = json_body(body)?;
    let priorities = state.service.reprioritize(key, body.new_priority).await?;
    Ok(Json(PrioritiesResponse { priorities }))
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ItemList>> {
    let page = state.service.list(query.page()).await?;
    Ok(Json(page))
}

/// Malformed bodies become a JSON 400 instead of the extractor's plain-text rejection.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}
