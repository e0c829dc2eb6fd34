//! Business logic services.

#![allow(missing_docs)]

pub mod feed;
pub mod follow;
pub mod group;
pub mod post;
pub mod user;

pub use feed::{FeedService, GroupFeed, PostEntry, ProfileFeed};
pub use follow::{FollowEntry, FollowOutcome, FollowService};
pub use group::{GroupInput, GroupService};
pub use post::{CommentEntry, CommentInput, ImageUpload, PostInput, PostService};
pub use user::{ChangePasswordInput, SignupInput, UpdateProfileInput, UserService, hash_password};
