//! Database repositories.

pub mod comment;
pub mod follow;
pub mod group;
pub mod post;
pub mod user;
pub mod user_profile;

pub use comment::CommentRepository;
pub use follow::FollowRepository;
pub use group::GroupRepository;
pub use post::PostRepository;
pub use user::UserRepository;
pub use user_profile::UserProfileRepository;
