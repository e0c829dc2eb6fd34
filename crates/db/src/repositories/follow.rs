//! Follow repository.

use std::sync::Arc;

use crate::entities::{Follow, follow, user};
use postboard_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
    sea_query::{Expr, Func, OnConflict},
};

/// Follow repository for database operations.
#[derive(Clone)]
pub struct FollowRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRepository {
    /// Create a new follow repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a follow edge by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<follow::Model>> {
        Follow::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the edge `user_id -> author_id`.
    pub async fn find_by_pair(
        &self,
        user_id: i32,
        author_id: i32,
    ) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if `user_id` follows `author_id`.
    pub async fn is_following(&self, user_id: i32, author_id: i32) -> AppResult<bool> {
        let count = Follow::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Insert the edge unless it already exists.
    ///
    /// A single `INSERT .. ON CONFLICT DO NOTHING`, so concurrent callers
    /// cannot create duplicates. Returns whether a row was written.
    pub async fn insert_if_absent(&self, user_id: i32, author_id: i32) -> AppResult<bool> {
        let model = follow::ActiveModel {
            user_id: Set(user_id),
            author_id: Set(author_id),
            ..Default::default()
        };

        let rows = Follow::insert(model)
            .on_conflict(
                OnConflict::columns([follow::Column::UserId, follow::Column::AuthorId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows > 0)
    }

    /// Delete the edge `user_id -> author_id`, returning the number of rows removed.
    pub async fn delete_by_pair(&self, user_id: i32, author_id: i32) -> AppResult<u64> {
        let result = Follow::delete_many()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Edges going out of `user_id`, optionally restricted to followed
    /// usernames containing `search` (case-insensitive).
    pub async fn find_following(
        &self,
        user_id: i32,
        search: Option<&str>,
    ) -> AppResult<Vec<follow::Model>> {
        let mut query = Follow::find().filter(follow::Column::UserId.eq(user_id));

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            query = query
                .join(JoinType::InnerJoin, follow::Relation::Author.def())
                .filter(
                    Expr::expr(Func::lower(Expr::col((user::Entity, user::Column::Username))))
                        .like(pattern),
                );
        }

        query
            .order_by_asc(follow::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
