//! Server-rendered pages for postboard.
//!
//! - **Views**: feeds, post detail and forms, follow actions, account pages
//! - **Guard**: login redirect for pages that need a user
//! - **Cache**: full-page cache in front of the index
//!
//! [`app`] assembles these pages, the JSON API and the media files into a
//! single router.

#![allow(missing_docs)]

pub mod cache;
pub mod error;
pub mod extractors;
pub mod forms;
pub mod guard;
pub mod render;
pub mod views;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
};
use postboard_api::{AppState, allowed_hosts_middleware, auth_middleware};
use tower_http::services::ServeDir;

use views::{auth, follow, posts};

/// Upload limit for the post forms.
const POST_FORM_LIMIT: usize = 10 * 1024 * 1024;

/// Page routes.
pub fn router(state: &AppState) -> Router<AppState> {
    let cached = Router::new()
        .route("/", get(posts::index))
        .route_layer(middleware::from_fn_with_state(state.clone(), cache::cache_page));

    let protected = Router::new()
        .route("/create/", get(posts::post_create_page).post(posts::post_create))
        .route(
            "/posts/{id}/edit/",
            get(posts::post_edit_page).post(posts::post_edit),
        )
        .route(
            "/posts/{id}/delete/",
            get(posts::post_delete).post(posts::post_delete),
        )
        .route("/posts/{id}/comment/", axum::routing::post(posts::add_comment))
        .route("/follow/", get(follow::follow_index))
        .route("/profile/{username}/follow/", get(follow::profile_follow))
        .route("/profile/{username}/unfollow/", get(follow::profile_unfollow))
        .route(
            "/auth/password_change/",
            get(auth::password_change_page).post(auth::password_change),
        )
        .route("/auth/password_change/done/", get(auth::password_change_done))
        .layer(DefaultBodyLimit::max(POST_FORM_LIMIT))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::login_required));

    let public = Router::new()
        .route("/group/{slug}/", get(posts::group_list))
        .route("/profile/{username}/", get(posts::profile))
        .route("/posts/{id}/", get(posts::post_detail))
        .route("/auth/login/", get(auth::login_page).post(auth::login))
        .route("/auth/logout/", get(auth::logout).post(auth::logout))
        .route("/auth/signup/", get(auth::signup_page).post(auth::signup));

    cached.merge(protected).merge(public)
}

/// The whole site: pages, `/api/v1` and media files, behind host checks and
/// authentication.
pub fn app(state: AppState) -> Router {
    let media_prefix = state.site.media_url.trim_end_matches('/').to_string();
    let media = ServeDir::new(&state.site.media_root);

    let mut router = router(&state).nest("/api/v1", postboard_api::router());
    if !media_prefix.is_empty() {
        router = router.nest_service(&media_prefix, media);
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            allowed_hosts_middleware,
        ))
        .with_state(state)
}
