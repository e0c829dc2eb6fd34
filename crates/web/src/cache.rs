//! Full-page cache middleware.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use postboard_api::AppState;
use postboard_common::{CachedPage, PageCache};

/// Serve successful GET responses from the page cache, keyed on the path,
/// the query string and the `Cookie` header.
///
/// Requests carrying an `Authorization` header neither read nor fill the
/// cache, since the key does not vary on it.
pub async fn cache_page(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if req.method() != Method::GET || req.headers().contains_key(header::AUTHORIZATION) {
        return next.run(req).await;
    }

    let cookie = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    let key = PageCache::key_for(req.uri().path(), req.uri().query(), cookie);

    if let Some(page) = state.page_cache.get(&key).await {
        tracing::debug!(key = %key, "Page cache hit");
        return cached_response(page);
    }

    tracing::debug!(key = %key, "Page cache miss");
    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer page for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let page = CachedPage {
        status: parts.status.as_u16(),
        content_type: parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
        body: body.clone(),
    };
    state.page_cache.insert(key, page).await;

    Response::from_parts(parts, Body::from(body))
}

fn cached_response(page: CachedPage) -> Response {
    let mut response = Body::from(page.body).into_response();
    *response.status_mut() = StatusCode::from_u16(page.status).unwrap_or(StatusCode::OK);

    if let Some(value) = page
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }

    response
}
