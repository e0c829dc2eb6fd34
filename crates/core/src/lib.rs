//! Core business logic for postboard.

pub mod services;

pub use services::*;
