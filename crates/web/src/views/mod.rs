//! Page handlers.

pub mod auth;
pub mod follow;
pub mod posts;
