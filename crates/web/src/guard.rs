//! Access guard for pages that need a signed-in user.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use postboard_api::AppState;
use postboard_db::entities::user;

/// `302 Found` redirect to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Login URL that returns to `next` afterwards.
#[must_use]
pub fn login_redirect_url(login_url: &str, next: &str) -> String {
    format!("{login_url}?next={}", urlencoding::encode(next))
}

/// Only let signed-in users through; send everyone else to the login page.
pub async fn login_required(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.extensions().get::<user::Model>().is_some() {
        return next.run(req).await;
    }

    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string);

    tracing::debug!(path = %target, "Login required");
    found(&login_redirect_url(&state.site.login_url, &target))
}

/// Where to go after login: `next` if it is a local path, else the index.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_url() {
        assert_eq!(
            login_redirect_url("/auth/login/", "/create/"),
            "/auth/login/?next=%2Fcreate%2F"
        );
        assert_eq!(
            login_redirect_url("/auth/login/", "/follow/?page=2"),
            "/auth/login/?next=%2Ffollow%2F%3Fpage%3D2"
        );
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/follow/")), "/follow/");
        assert_eq!(safe_next(Some("//evil.example/")), "/");
        assert_eq!(safe_next(Some("https://evil.example/")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
