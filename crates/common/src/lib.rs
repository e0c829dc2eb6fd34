//! Common utilities and shared types for postboard.
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Pagination**: 1-based feed pages via [`Page`]
//! - **Page cache**: Short-lived rendered page cache via [`PageCache`]
//! - **Storage**: Media storage for uploaded images
//! - **Tokens**: Session token generation via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use postboard_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let token = IdGenerator::new().generate_token();
//!     println!("{} posts per page, token {token}", config.site.count_post);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod page_cache;
pub mod pagination;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use page_cache::{CachedPage, PageCache};
pub use pagination::{Page, PageQuery, page_count, resolve_page_number};
pub use storage::{LocalStorage, StorageBackend, UploadedFile, sanitize_file_name};
