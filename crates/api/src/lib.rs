//! HTTP API layer for postboard.
//!
//! This crate provides the JSON resource API mounted under `/api/v1`:
//!
//! - **Endpoints**: groups, posts, comments, follows, users and tokens
//! - **Extractors**: Authenticated and optional users
//! - **Middleware**: Token/cookie authentication, allowed hosts
//!
//! [`AppState`] is shared with the HTML front end.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, SESSION_COOKIE, allowed_hosts_middleware, auth_middleware};
