//! Error pages for the HTML views.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use postboard_common::AppError;

use crate::render::layout;

/// Result type for page handlers.
pub type PageResult<T = Response> = Result<T, PageError>;

/// An [`AppError`] rendered as an HTML page.
///
/// Lookup misses become 404. Nothing here produces a 403: ownership checks
/// redirect in the views before an error is raised.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, title) = match &err {
            e if e.is_not_found() => (StatusCode::NOT_FOUND, "Page not found"),
            AppError::Forbidden(_) => (StatusCode::NOT_FOUND, "Page not found"),
            AppError::BadRequest(_) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "Bad request")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Server error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "Page failed");
        } else {
            tracing::debug!(error = %err, status = status.as_u16(), "Page error");
        }

        let body = layout(
            title,
            None,
            &format!("<h1>{}</h1>\n<p>{title}</p>\n", status.as_u16()),
        );
        (status, body).into_response()
    }
}
