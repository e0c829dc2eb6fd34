//! Follow endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use postboard_common::AppResult;
use postboard_core::FollowEntry;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Follow list query.
#[derive(Debug, Default, Deserialize)]
pub struct FollowQuery {
    /// Case-insensitive filter on the followed username.
    pub search: Option<String>,
}

/// Follow request.
#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    /// Username to follow.
    pub following: String,
}

/// Authors the caller follows.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FollowQuery>,
) -> AppResult<ApiResponse<Vec<FollowEntry>>> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let edges = state.follow_service.list_following(&user, search).await?;
    Ok(ApiResponse::ok(edges))
}

/// Follow an author. Self-follows and duplicates are rejected with 400.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ApiResponse<FollowEntry>> {
    let entry = state.follow_service.follow_checked(&user, &req.following).await?;
    Ok(ApiResponse::created(entry))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/follow/", get(list).post(create))
}
