//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use postboard_common::{PageCache, StorageBackend, config::SiteConfig};
use postboard_core::{FeedService, FollowService, GroupService, PostService, UserService};
use postboard_db::repositories::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserProfileRepository,
    UserRepository,
};
use sea_orm::DatabaseConnection;

/// Name of the cookie that carries the session token.
pub const SESSION_COOKIE: &str = "sessionid";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub feed_service: FeedService,
    pub follow_service: FollowService,
    pub group_service: GroupService,
    pub post_service: PostService,
    pub page_cache: PageCache,
    pub site: Arc<SiteConfig>,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    pub fn new(
        db: Arc<DatabaseConnection>,
        site: SiteConfig,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        let user_repo = UserRepository::new(db.clone());
        let group_repo = GroupRepository::new(db.clone());
        let post_repo = PostRepository::new(db.clone());
        let comment_repo = CommentRepository::new(db.clone());
        let follow_repo = FollowRepository::new(db.clone());
        let profile_repo = UserProfileRepository::new(db);

        let feed_service = FeedService::new(
            post_repo.clone(),
            user_repo.clone(),
            group_repo.clone(),
            follow_repo.clone(),
            comment_repo.clone(),
            site.count_post,
        );
        let follow_service = FollowService::new(follow_repo, user_repo.clone());
        let group_service = GroupService::new(group_repo.clone());
        let post_service = PostService::new(
            post_repo,
            comment_repo,
            user_repo.clone(),
            group_repo,
            storage,
            site.upload_path.clone(),
        );
        let user_service = UserService::new(user_repo, profile_repo);

        Self {
            user_service,
            feed_service,
            follow_service,
            group_service,
            post_service,
            page_cache: PageCache::from_secs(site.cache_ttl_secs),
            site: Arc::new(site),
        }
    }
}

/// Authentication middleware.
///
/// Accepts `Authorization: Bearer <token>` or the session cookie. An
/// unknown token leaves the request anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = request_token(&req) {
        if let Ok(user) = state.user_service.authenticate_by_token(&token).await {
            req.extensions_mut().insert(user);
        }
    }

    next.run(req).await
}

fn request_token(req: &Request<Body>) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(req.headers())
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Reject requests whose `Host` header is not in the allowed list.
pub async fn allowed_hosts_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()));

    match host {
        Some(host) if state.site.is_host_allowed(host) => next.run(req).await,
        _ => {
            tracing::warn!(host = ?host, "Rejected request for disallowed host");
            (StatusCode::BAD_REQUEST, "Bad Request (400)").into_response()
        }
    }
}
