//! Follow service.
//!
//! Two entry points create edges. [`FollowService::follow`] backs the HTML
//! pages and quietly ignores self-follows and duplicates.
//! [`FollowService::follow_checked`] backs the JSON API and reports both as
//! validation errors. Both insert through
//! [`FollowRepository::insert_if_absent`], so a duplicate never reaches the
//! unique index as an error.

use std::collections::HashMap;

use postboard_common::{AppError, AppResult};
use postboard_db::{
    entities::{follow, user},
    repositories::{FollowRepository, UserRepository},
};
use serde::Serialize;

/// Result of a follow request on the page path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A new edge was written.
    Created,
    /// The edge already existed.
    AlreadyFollowing,
    /// The user asked to follow themselves; nothing was written.
    SelfFollowSkipped,
}

/// A follow edge with both ends named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowEntry {
    pub id: i32,
    /// Follower's username.
    pub user: String,
    /// Followed author's username.
    pub following: String,
}

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(follow_repo: FollowRepository, user_repo: UserRepository) -> Self {
        Self {
            follow_repo,
            user_repo,
        }
    }

    /// Follow `target_username`, absorbing self-follows and duplicates.
    pub async fn follow(
        &self,
        user: &user::Model,
        target_username: &str,
    ) -> AppResult<FollowOutcome> {
        let author = self.user_repo.get_by_username(target_username).await?;

        if author.id == user.id {
            tracing::debug!(user_id = user.id, "Self-follow skipped");
            return Ok(FollowOutcome::SelfFollowSkipped);
        }

        if self.follow_repo.insert_if_absent(user.id, author.id).await? {
            tracing::info!(user_id = user.id, author_id = author.id, "Follow created");
            Ok(FollowOutcome::Created)
        } else {
            tracing::debug!(user_id = user.id, author_id = author.id, "Already following");
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    /// Follow `target_username`, rejecting self-follows and duplicates.
    pub async fn follow_checked(
        &self,
        user: &user::Model,
        target_username: &str,
    ) -> AppResult<FollowEntry> {
        let author = self
            .user_repo
            .find_by_username(target_username)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("following: user {target_username} does not exist"))
            })?;

        if author.id == user.id {
            return Err(AppError::Validation("cannot follow yourself".to_string()));
        }

        if self.follow_repo.is_following(user.id, author.id).await? {
            return Err(AppError::Validation("already following".to_string()));
        }

        // lost a race with a concurrent request for the same pair
        if !self.follow_repo.insert_if_absent(user.id, author.id).await? {
            return Err(AppError::Validation("already following".to_string()));
        }

        let edge = self
            .follow_repo
            .find_by_pair(user.id, author.id)
            .await?
            .ok_or_else(|| AppError::Internal("follow vanished after insert".to_string()))?;

        tracing::info!(user_id = user.id, author_id = author.id, "Follow created");

        Ok(FollowEntry {
            id: edge.id,
            user: user.username.clone(),
            following: author.username,
        })
    }

    /// Remove the edge to `target_username`.
    ///
    /// Fails with not-found if the user does not exist or is not followed.
    pub async fn unfollow(&self, user: &user::Model, target_username: &str) -> AppResult<()> {
        let author = self.user_repo.get_by_username(target_username).await?;

        let removed = self.follow_repo.delete_by_pair(user.id, author.id).await?;
        if removed == 0 {
            return Err(AppError::NotFound(format!(
                "{} does not follow {}",
                user.username, author.username
            )));
        }

        tracing::info!(user_id = user.id, author_id = author.id, "Follow removed");
        Ok(())
    }

    /// Check if `user_id` follows `author_id`.
    pub async fn is_following(&self, user_id: i32, author_id: i32) -> AppResult<bool> {
        self.follow_repo.is_following(user_id, author_id).await
    }

    /// Edges going out of `user`, optionally filtered by followed username.
    pub async fn list_following(
        &self,
        user: &user::Model,
        search: Option<&str>,
    ) -> AppResult<Vec<FollowEntry>> {
        let edges = self.follow_repo.find_following(user.id, search).await?;
        self.name_edges(user, edges).await
    }

    async fn name_edges(
        &self,
        user: &user::Model,
        edges: Vec<follow::Model>,
    ) -> AppResult<Vec<FollowEntry>> {
        let author_ids: Vec<i32> = edges.iter().map(|e| e.author_id).collect();
        let names: HashMap<i32, String> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        Ok(edges
            .into_iter()
            .map(|edge| FollowEntry {
                id: edge.id,
                user: user.username.clone(),
                following: names.get(&edge.author_id).cloned().unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: i32, username: &str) -> user::Model {
        user::Model {
            id,
            username: username.to_string(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            token: None,
            is_staff: false,
            date_joined: Utc::now().into(),
        }
    }

    fn create_service(db: sea_orm::DatabaseConnection) -> FollowService {
        let db = Arc::new(db);
        FollowService::new(FollowRepository::new(db.clone()), UserRepository::new(db))
    }

    #[tokio::test]
    async fn test_follow_self_is_skipped() {
        let me = create_test_user(1, "me");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[me.clone()]])
            .into_connection();

        let service = create_service(db);
        let outcome = service.follow(&me, "me").await.unwrap();

        assert_eq!(outcome, FollowOutcome::SelfFollowSkipped);
    }

    #[tokio::test]
    async fn test_follow_unknown_target() {
        let me = create_test_user(1, "me");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let service = create_service(db);
        let result = service.follow(&me, "ghost").await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_follow_existing_edge() {
        let me = create_test_user(1, "me");
        let other = create_test_user(2, "other");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[other]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let service = create_service(db);
        let outcome = service.follow(&me, "other").await.unwrap();

        assert_eq!(outcome, FollowOutcome::AlreadyFollowing);
    }

    #[tokio::test]
    async fn test_follow_checked_self_is_rejected() {
        let me = create_test_user(1, "me");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[me.clone()]])
            .into_connection();

        let service = create_service(db);
        let result = service.follow_checked(&me, "me").await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg == "cannot follow yourself"));
    }

    #[tokio::test]
    async fn test_follow_checked_duplicate_is_rejected() {
        let me = create_test_user(1, "me");
        let other = create_test_user(2, "other");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[other]])
            .append_query_results([[maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(1))
            }]])
            .into_connection();

        let service = create_service(db);
        let result = service.follow_checked(&me, "other").await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg == "already following"));
    }

    #[tokio::test]
    async fn test_follow_checked_unknown_target_is_validation_error() {
        let me = create_test_user(1, "me");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let service = create_service(db);
        let result = service.follow_checked(&me, "ghost").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unfollow_missing_edge() {
        let me = create_test_user(1, "me");
        let other = create_test_user(2, "other");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[other]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let service = create_service(db);
        let result = service.unfollow(&me, "other").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
