//! User endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use postboard_common::AppResult;
use postboard_core::UpdateProfileInput;
use postboard_db::entities::{user, user_profile};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Public user representation.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTimeWithTimeZone,
    pub profile: Option<ProfileResponse>,
}

impl UserResponse {
    pub(crate) fn new(user: user::Model, profile: Option<user_profile::Model>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            date_joined: user.date_joined,
            profile: profile.map(Into::into),
        }
    }
}

/// Profile representation.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<user_profile::Model> for ProfileResponse {
    fn from(p: user_profile::Model) -> Self {
        Self {
            description: p.description,
            avatar_url: p.avatar_url,
        }
    }
}

/// Get a user by username.
async fn show(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.get_by_username(&username).await?;
    let profile = state.user_service.get_profile(user.id).await?;
    Ok(ApiResponse::ok(UserResponse::new(user, profile)))
}

/// Get the caller.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserResponse>> {
    let profile = state.user_service.get_profile(user.id).await?;
    Ok(ApiResponse::ok(UserResponse::new(user, profile)))
}

/// Delete the caller's account and everything they own.
async fn delete_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.user_service.delete(user.id).await?;
    Ok(no_content())
}

/// Get the caller's profile.
async fn get_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let profile = state.user_service.get_profile(user.id).await?;
    Ok(ApiResponse::ok(profile.map_or(
        ProfileResponse {
            description: None,
            avatar_url: None,
        },
        Into::into,
    )))
}

/// Update the caller's profile.
async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let profile = state.user_service.update_profile(user.id, req).await?;
    Ok(ApiResponse::ok(profile.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/me/", get(me).delete(delete_me))
        .route("/users/me/profile/", get(get_profile).put(update_profile))
        .route("/users/{username}/", get(show))
}
