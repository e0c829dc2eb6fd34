//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use postboard_common::AppResult;
use postboard_core::SignupInput;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

use super::users::UserResponse;

/// Create a new user account. The caller still has to obtain a token.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.signup(req).await?;
    Ok(ApiResponse::created(UserResponse::new(user, None)))
}

/// Token request.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Token response.
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Exchange credentials for the user's token.
async fn token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let (_, token) = state.user_service.login(&req.username, &req.password).await?;
    Ok(ApiResponse::ok(TokenResponse { token }))
}

/// Revoke the caller's token.
async fn revoke(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.user_service.logout(user.id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup/", post(signup))
        .route("/auth/token/", post(token))
        .route("/auth/token/revoke/", post(revoke))
}
