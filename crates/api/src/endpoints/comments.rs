//! Comment endpoints, nested under a post.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use postboard_common::AppResult;
use postboard_core::{CommentEntry, CommentInput};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Comment representation. `post` and `author` are server-assigned.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i32,
    pub post: i32,
    pub author: String,
    pub text: String,
    pub created: DateTimeWithTimeZone,
}

impl From<CommentEntry> for CommentResponse {
    fn from(entry: CommentEntry) -> Self {
        Self {
            id: entry.comment.id,
            post: entry.comment.post_id,
            author: entry.author,
            text: entry.comment.text,
            created: entry.comment.created,
        }
    }
}

async fn list(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state.post_service.comments_for_post(post_id).await?;
    Ok(ApiResponse::ok(comments.into_iter().map(Into::into).collect()))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Json(req): Json<CommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.post_service.add_comment(&user, post_id, req).await?;
    Ok(ApiResponse::created(
        CommentEntry {
            comment,
            author: user.username,
        }
        .into(),
    ))
}

async fn show(
    State(state): State<AppState>,
    Path((post_id, id)): Path<(i32, i32)>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let entry = state.post_service.get_comment(post_id, id).await?;
    Ok(ApiResponse::ok(entry.into()))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((post_id, id)): Path<(i32, i32)>,
    Json(req): Json<CommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state
        .post_service
        .update_comment(&user, post_id, id, req)
        .await?;
    Ok(ApiResponse::ok(
        CommentEntry {
            comment,
            author: user.username,
        }
        .into(),
    ))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((post_id, id)): Path<(i32, i32)>,
) -> AppResult<impl IntoResponse> {
    state.post_service.delete_comment(&user, post_id, id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments/", get(list).post(create))
        .route(
            "/posts/{id}/comments/{comment_id}/",
            get(show).put(update).delete(delete),
        )
}
