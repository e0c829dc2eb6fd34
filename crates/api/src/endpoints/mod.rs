//! API endpoints.

mod auth;
mod comments;
mod follow;
mod groups;
mod posts;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(groups::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(follow::router())
        .merge(users::router())
}
