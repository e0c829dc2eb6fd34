//! Post endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use postboard_common::{AppResult, Page, PageQuery};
use postboard_core::{PostEntry, PostInput};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Post representation.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i32,
    pub text: String,
    pub pub_date: DateTimeWithTimeZone,
    /// Author's username.
    pub author: String,
    /// Group ID.
    pub group: Option<i32>,
    /// Image URL.
    pub image: Option<String>,
}

impl PostResponse {
    fn new(entry: PostEntry, state: &AppState) -> Self {
        Self {
            id: entry.post.id,
            image: entry
                .post
                .image
                .as_deref()
                .map(|key| state.post_service.image_url(key)),
            text: entry.post.text,
            pub_date: entry.post.pub_date,
            author: entry.author,
            group: entry.post.group_id,
        }
    }
}

/// Post create/update request. `author` is never read from the body.
#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub text: String,
    #[serde(default)]
    pub group: Option<i32>,
}

impl From<PostRequest> for PostInput {
    fn from(req: PostRequest) -> Self {
        Self {
            text: req.text,
            group_id: req.group,
        }
    }
}

/// List posts, newest first.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Page<PostResponse>>> {
    let page = state.feed_service.index_feed(query.raw()).await?;
    Ok(ApiResponse::ok(page.map(|entry| PostResponse::new(entry, &state))))
}

/// Publish a post as the caller.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PostRequest>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.post_service.create(&user, req.into(), None).await?;
    let entry = state.post_service.get_entry(post.id).await?;
    Ok(ApiResponse::created(PostResponse::new(entry, &state)))
}

/// Get a post.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<PostResponse>> {
    let entry = state.post_service.get_entry(id).await?;
    Ok(ApiResponse::ok(PostResponse::new(entry, &state)))
}

/// Edit a post (author only).
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<PostRequest>,
) -> AppResult<ApiResponse<PostResponse>> {
    state.post_service.update(&user, id, req.into(), None).await?;
    let entry = state.post_service.get_entry(id).await?;
    Ok(ApiResponse::ok(PostResponse::new(entry, &state)))
}

/// Delete a post (author only).
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    state.post_service.delete(&user, id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/", get(list).post(create))
        .route("/posts/{id}/", get(show).put(update).delete(delete))
}
