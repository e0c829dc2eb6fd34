//! Post repository.
//!
//! Every feed query orders newest first (`pub_date DESC, id DESC`) and is
//! paged with [`postboard_common::resolve_page_number`] semantics.

use std::sync::Arc;

use crate::entities::{Post, follow, post};
use postboard_common::{AppError, AppResult, Page, resolve_page_number};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select, sea_query::Query,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post. Its comments go with it.
    pub async fn delete(&self, id: i32) -> AppResult<u64> {
        let result = Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// All posts.
    pub async fn find_page(&self, page: Option<&str>, per_page: u64) -> AppResult<Page<post::Model>> {
        self.fetch_page(Post::find(), page, per_page).await
    }

    /// Posts in a group.
    pub async fn find_page_by_group(
        &self,
        group_id: i32,
        page: Option<&str>,
        per_page: u64,
    ) -> AppResult<Page<post::Model>> {
        let query = Post::find().filter(post::Column::GroupId.eq(group_id));
        self.fetch_page(query, page, per_page).await
    }

    /// Posts written by one author.
    pub async fn find_page_by_author(
        &self,
        author_id: i32,
        page: Option<&str>,
        per_page: u64,
    ) -> AppResult<Page<post::Model>> {
        let query = Post::find().filter(post::Column::AuthorId.eq(author_id));
        self.fetch_page(query, page, per_page).await
    }

    /// Posts by every author `user_id` follows.
    pub async fn find_page_by_followed(
        &self,
        user_id: i32,
        page: Option<&str>,
        per_page: u64,
    ) -> AppResult<Page<post::Model>> {
        let followed = Query::select()
            .column(follow::Column::AuthorId)
            .from(follow::Entity)
            .and_where(follow::Column::UserId.eq(user_id))
            .to_owned();

        let query = Post::find().filter(post::Column::AuthorId.in_subquery(followed));
        self.fetch_page(query, page, per_page).await
    }

    async fn fetch_page(
        &self,
        query: Select<Post>,
        page: Option<&str>,
        per_page: u64,
    ) -> AppResult<Page<post::Model>> {
        let per_page = per_page.max(1);
        let paginator = query
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
            .paginate(self.db.as_ref(), per_page);

        let totals = paginator
            .num_items_and_pages()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let number = resolve_page_number(page, totals.number_of_pages);
        let items = paginator
            .fetch_page(number - 1)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(items, number, totals.number_of_items, per_page))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_post(id: i32, author_id: i32) -> post::Model {
        post::Model {
            id,
            text: format!("post {id}"),
            pub_date: Utc::now().into(),
            author_id,
            group_id: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_found() {
        let post = create_test_post(5, 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post.clone()]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        assert_eq!(repo.get_by_id(5).await.unwrap(), post);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id(5).await;

        assert!(matches!(result, Err(AppError::PostNotFound(id)) if id == "5"));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        assert_eq!(repo.delete(5).await.unwrap(), 1);
    }
}
