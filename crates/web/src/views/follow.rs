//! Follow pages.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use postboard_api::{AppState, extractors::AuthUser};
use postboard_common::PageQuery;

use crate::{error::PageResult, guard::found, render};

/// `/follow/`: posts by followed authors.
pub async fn follow_index(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let page = state.feed_service.follow_index_feed(&user, query.raw()).await?;
    let content = format!(
        "<h1>Posts by authors you follow</h1>\n{}",
        render::post_list(&state, &page)
    );
    Ok(render::layout("Following", Some(&user), &content).into_response())
}

/// `/profile/{username}/follow/`. Following yourself or someone already
/// followed changes nothing.
pub async fn profile_follow(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> PageResult {
    state.follow_service.follow(&user, &username).await?;
    Ok(found(&format!("/profile/{}/", urlencoding::encode(&username))))
}

/// `/profile/{username}/unfollow/`. 404 if there is nothing to undo.
pub async fn profile_unfollow(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> PageResult {
    state.follow_service.unfollow(&user, &username).await?;
    Ok(found(&format!("/profile/{}/", urlencoding::encode(&username))))
}
