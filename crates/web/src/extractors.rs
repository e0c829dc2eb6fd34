//! Page extractors.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use postboard_common::AppError;

use crate::error::PageError;

/// The `{id}` segment of a post URL.
///
/// Anything that is not a post id, including numbers too large for one,
/// is a missing page rather than a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostId(pub i32);

impl<S> FromRequestParts<S> for PostId
where
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let not_found = |raw: &str| PageError(AppError::PostNotFound(raw.to_string()));

        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| not_found(""))?;

        raw.parse::<i32>().map(PostId).map_err(|_| not_found(&raw))
    }
}
