//! Feed, post and comment pages.

use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use postboard_api::{AppState, extractors::{AuthUser, MaybeAuthUser}};
use postboard_common::{AppError, PageQuery};
use postboard_db::entities::user;

use crate::{
    error::PageResult,
    extractors::PostId,
    forms::{CommentForm, PostForm},
    guard::found,
    render::{self, PostFormView},
};

fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

fn detail_url(id: i32) -> String {
    format!("/posts/{id}/")
}

/// `/`: every post, newest first.
pub async fn index(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let page = state.feed_service.index_feed(query.raw()).await?;
    let content = format!(
        "<h1>Latest posts</h1>\n{}",
        render::post_list(&state, &page)
    );
    Ok(render::layout("Latest posts", viewer.as_ref(), &content).into_response())
}

/// `/group/{slug}/`: posts of one group.
pub async fn group_list(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let feed = state.feed_service.group_feed(&slug, query.raw()).await?;
    let content = format!(
        "{}{}",
        render::group_header(&feed.group),
        render::post_list(&state, &feed.page)
    );
    Ok(render::layout(&feed.group.title, viewer.as_ref(), &content).into_response())
}

/// `/profile/{username}/`: posts of one author.
pub async fn profile(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let feed = state
        .feed_service
        .profile_feed(&username, viewer.as_ref(), query.raw())
        .await?;
    let content = format!(
        "{}{}",
        render::profile_header(&feed, viewer.as_ref()),
        render::post_list(&state, &feed.page)
    );
    let title = format!("Profile of {}", feed.author.username);
    Ok(render::layout(&title, viewer.as_ref(), &content).into_response())
}

/// `/posts/{id}/`: one post with its comments.
pub async fn post_detail(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    PostId(id): PostId,
) -> PageResult {
    let entry = state.post_service.get_entry(id).await?;
    let comments = state.post_service.comments_for_post(id).await?;

    let mut content = render::post_card(&state, &entry);
    if viewer.as_ref().is_some_and(|v| v.id == entry.post.author_id) {
        content.push_str(&format!(
            "<a href=\"/posts/{id}/edit/\">Edit</a> <a href=\"/posts/{id}/delete/\">Delete</a>\n"
        ));
    }
    content.push_str(&render::comment_section(id, &comments, viewer.is_some()));

    let title: String = entry.post.text.chars().take(30).collect();
    Ok(render::layout(&title, viewer.as_ref(), &content).into_response())
}

/// `GET /create/`.
pub async fn post_create_page(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> PageResult {
    render_post_form(&state, &user, &PostFormView::default()).await
}

/// `POST /create/`: publish and go to the author's profile.
pub async fn post_create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> PageResult {
    let form = PostForm::from_multipart(multipart).await?;

    let result = match form.input() {
        Ok(input) => state.post_service.create(&user, input, form.image.clone()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(found(&profile_url(&user.username))),
        Err(AppError::Validation(message)) => {
            let view = PostFormView {
                text: &form.text,
                group_id: form.group_id().ok().flatten(),
                error: Some(message.as_str()),
                edit_id: None,
            };
            render_post_form(&state, &user, &view).await
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /posts/{id}/edit/`. Anyone but the author goes back to the post.
pub async fn post_edit_page(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PostId(id): PostId,
) -> PageResult {
    let post = state.post_service.get(id).await?;
    if post.author_id != user.id {
        return Ok(found(&detail_url(id)));
    }

    let view = PostFormView {
        text: &post.text,
        group_id: post.group_id,
        error: None,
        edit_id: Some(id),
    };
    render_post_form(&state, &user, &view).await
}

/// `POST /posts/{id}/edit/`.
pub async fn post_edit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PostId(id): PostId,
    multipart: Multipart,
) -> PageResult {
    let post = state.post_service.get(id).await?;
    if post.author_id != user.id {
        return Ok(found(&detail_url(id)));
    }

    let form = PostForm::from_multipart(multipart).await?;
    let result = match form.input() {
        Ok(input) => state.post_service.update(&user, id, input, form.image.clone()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(found(&detail_url(id))),
        Err(AppError::Forbidden(_)) => Ok(found(&detail_url(id))),
        Err(AppError::Validation(message)) => {
            let view = PostFormView {
                text: &form.text,
                group_id: form.group_id().ok().flatten(),
                error: Some(message.as_str()),
                edit_id: Some(id),
            };
            render_post_form(&state, &user, &view).await
        }
        Err(e) => Err(e.into()),
    }
}

/// `/posts/{id}/delete/`: remove the post and go to the author's profile.
pub async fn post_delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PostId(id): PostId,
) -> PageResult {
    match state.post_service.delete(&user, id).await {
        Ok(()) => Ok(found(&profile_url(&user.username))),
        Err(AppError::Forbidden(_)) => Ok(found(&detail_url(id))),
        Err(e) => Err(e.into()),
    }
}

/// `POST /posts/{id}/comment/`. An empty comment is dropped without a word.
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PostId(id): PostId,
    Form(form): Form<CommentForm>,
) -> PageResult {
    let post = state.post_service.get(id).await?;

    if !form.text.trim().is_empty() {
        let input = postboard_core::CommentInput { text: form.text };
        match state.post_service.add_comment(&user, post.id, input).await {
            Ok(_) | Err(AppError::Validation(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(found(&detail_url(post.id)))
}

async fn render_post_form(
    state: &AppState,
    user: &user::Model,
    view: &PostFormView<'_>,
) -> PageResult {
    let groups = state.group_service.list().await?;
    let title = if view.edit_id.is_some() {
        "Edit post"
    } else {
        "New post"
    };
    let content = render::post_form(view, &groups);
    Ok(render::layout(title, Some(user), &content).into_response())
}
