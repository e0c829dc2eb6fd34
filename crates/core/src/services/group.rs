//! Group service.

use std::sync::LazyLock;

use postboard_common::{AppError, AppResult};
use postboard_db::entities::{group, user};
use postboard_db::repositories::GroupRepository;
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

#[allow(clippy::expect_used)]
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"));

/// Input for creating or replacing a group.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GroupInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 30), regex(path = *SLUG_RE))]
    pub slug: String,

    #[serde(default)]
    pub description: String,
}

/// Group service for business logic.
///
/// Groups are curated by staff; only staff users may write them.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub const fn new(group_repo: GroupRepository) -> Self {
        Self { group_repo }
    }

    /// List every group.
    pub async fn list(&self) -> AppResult<Vec<group::Model>> {
        self.group_repo.find_all().await
    }

    /// Get a group by ID.
    pub async fn get(&self, id: i32) -> AppResult<group::Model> {
        self.group_repo.get_by_id(id).await
    }

    /// Get a group by slug.
    pub async fn get_by_slug(&self, slug: &str) -> AppResult<group::Model> {
        self.group_repo.get_by_slug(slug).await
    }

    /// Create a group.
    pub async fn create(&self, actor: &user::Model, input: GroupInput) -> AppResult<group::Model> {
        ensure_staff(actor)?;
        input.validate()?;

        if self.group_repo.slug_taken(&input.slug, None).await? {
            return Err(slug_conflict(&input.slug));
        }

        let model = group::ActiveModel {
            title: Set(input.title),
            slug: Set(input.slug),
            description: Set(input.description),
            ..Default::default()
        };

        let group = self.group_repo.create(model).await?;
        tracing::info!(group_id = group.id, slug = %group.slug, "Group created");
        Ok(group)
    }

    /// Replace a group's fields.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: i32,
        input: GroupInput,
    ) -> AppResult<group::Model> {
        ensure_staff(actor)?;
        input.validate()?;

        let existing = self.group_repo.get_by_id(id).await?;
        if self.group_repo.slug_taken(&input.slug, Some(existing.id)).await? {
            return Err(slug_conflict(&input.slug));
        }

        let model = group::ActiveModel {
            id: Set(existing.id),
            title: Set(input.title),
            slug: Set(input.slug),
            description: Set(input.description),
        };

        self.group_repo.update(model).await
    }

    /// Delete a group. Its posts are kept and lose their group.
    pub async fn delete(&self, actor: &user::Model, id: i32) -> AppResult<()> {
        ensure_staff(actor)?;

        if self.group_repo.delete(id).await? == 0 {
            return Err(AppError::GroupNotFound(id.to_string()));
        }

        tracing::info!(group_id = id, "Group deleted");
        Ok(())
    }
}

fn ensure_staff(actor: &user::Model) -> AppResult<()> {
    if actor.is_staff {
        Ok(())
    } else {
        Err(AppError::Forbidden("only staff can manage groups".to_string()))
    }
}

fn slug_conflict(slug: &str) -> AppError {
    AppError::Validation(format!("slug: group with slug {slug} already exists"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(is_staff: bool) -> user::Model {
        user::Model {
            id: 1,
            username: "admin".to_string(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            token: None,
            is_staff,
            date_joined: Utc::now().into(),
        }
    }

    fn input(slug: &str) -> GroupInput {
        GroupInput {
            title: "Cats".to_string(),
            slug: slug.to_string(),
            description: "Cat pictures".to_string(),
        }
    }

    #[test]
    fn test_slug_validation() {
        assert!(input("cats_and-dogs-42").validate().is_ok());
        assert!(input("cats and dogs").validate().is_err());
        assert!(input("").validate().is_err());
        assert!(input(&"a".repeat(31)).validate().is_err());
    }

    #[tokio::test]
    async fn test_create_requires_staff() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = GroupService::new(GroupRepository::new(db));

        let result = service.create(&create_test_user(false), input("cats")).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_taken_slug() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .into_connection(),
        );
        let service = GroupService::new(GroupRepository::new(db));

        let result = service.create(&create_test_user(true), input("cats")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_group() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );
        let service = GroupService::new(GroupRepository::new(db));

        let result = service.delete(&create_test_user(true), 9).await;

        assert!(matches!(result, Err(AppError::GroupNotFound(_))));
    }
}
