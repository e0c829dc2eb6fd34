//! Group endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use postboard_common::AppResult;
use postboard_core::GroupInput;
use postboard_db::entities::group;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// List all groups.
async fn list(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<group::Model>>> {
    let groups = state.group_service.list().await?;
    Ok(ApiResponse::ok(groups))
}

/// Create a group (staff only).
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<GroupInput>,
) -> AppResult<ApiResponse<group::Model>> {
    let group = state.group_service.create(&user, req).await?;
    Ok(ApiResponse::created(group))
}

/// Get a group.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<group::Model>> {
    let group = state.group_service.get(id).await?;
    Ok(ApiResponse::ok(group))
}

/// Replace a group (staff only).
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<GroupInput>,
) -> AppResult<ApiResponse<group::Model>> {
    let group = state.group_service.update(&user, id, req).await?;
    Ok(ApiResponse::ok(group))
}

/// Delete a group (staff only).
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    state.group_service.delete(&user, id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups/", get(list).post(create))
        .route("/groups/{id}/", get(show).put(update).delete(delete))
}
