//! Post service: posts, their images and their comments.

use std::sync::Arc;

use chrono::Utc;
use postboard_common::{AppError, AppResult, StorageBackend};
use postboard_db::{
    entities::{comment, post, user},
    repositories::{CommentRepository, GroupRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::feed::{PostEntry, hydrate};

/// Input for creating or editing a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostInput {
    pub text: String,
    #[serde(default)]
    pub group_id: Option<i32>,
}

/// Input for creating or editing a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentInput {
    #[validate(length(min = 1, max = 10000))]
    pub text: String,
}

/// An image file sent along with a post.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A comment with its author's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentEntry {
    pub comment: comment::Model,
    pub author: String,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    storage: Arc<dyn StorageBackend>,
    upload_path: String,
}

impl PostService {
    /// Create a new post service. Images are written under `upload_path`.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        storage: Arc<dyn StorageBackend>,
        upload_path: impl Into<String>,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            user_repo,
            group_repo,
            storage,
            upload_path: upload_path.into(),
        }
    }

    /// Get a post by ID.
    pub async fn get(&self, id: i32) -> AppResult<post::Model> {
        self.post_repo.get_by_id(id).await
    }

    /// Get a post with its author's username and group.
    pub async fn get_entry(&self, id: i32) -> AppResult<PostEntry> {
        let post = self.post_repo.get_by_id(id).await?;
        hydrate(&self.user_repo, &self.group_repo, vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Public URL of a stored image.
    #[must_use]
    pub fn image_url(&self, key: &str) -> String {
        self.storage.public_url(key)
    }

    /// Publish a post by `author`.
    pub async fn create(
        &self,
        author: &user::Model,
        input: PostInput,
        image: Option<ImageUpload>,
    ) -> AppResult<post::Model> {
        self.check_input(&input).await?;
        let image = match image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let model = post::ActiveModel {
            text: Set(input.text),
            pub_date: Set(Utc::now().into()),
            author_id: Set(author.id),
            group_id: Set(input.group_id),
            image: Set(image),
            ..Default::default()
        };

        let post = self.post_repo.create(model).await?;
        tracing::info!(post_id = post.id, author_id = author.id, "Post created");
        Ok(post)
    }

    /// Edit a post. Only its author may do so.
    ///
    /// A new image replaces the stored one.
    pub async fn update(
        &self,
        editor: &user::Model,
        id: i32,
        input: PostInput,
        image: Option<ImageUpload>,
    ) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(id).await?;
        if post.author_id != editor.id {
            return Err(AppError::Forbidden("only the author can edit a post".to_string()));
        }
        self.check_input(&input).await?;

        let old_image = post.image.clone();
        let mut active: post::ActiveModel = post.into();
        active.text = Set(input.text);
        active.group_id = Set(input.group_id);

        let replaced = if let Some(upload) = image {
            active.image = Set(Some(self.store_image(upload).await?));
            old_image
        } else {
            None
        };

        let post = self.post_repo.update(active).await?;
        if let Some(key) = replaced {
            self.remove_image(&key).await;
        }

        tracing::info!(post_id = post.id, "Post edited");
        Ok(post)
    }

    /// Delete a post and its image. Only its author may do so.
    pub async fn delete(&self, editor: &user::Model, id: i32) -> AppResult<()> {
        let post = self.post_repo.get_by_id(id).await?;
        if post.author_id != editor.id {
            return Err(AppError::Forbidden("only the author can delete a post".to_string()));
        }

        self.post_repo.delete(post.id).await?;
        if let Some(key) = post.image {
            self.remove_image(&key).await;
        }

        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }

    /// Comment on a post. The post and author come from the caller, never
    /// from the input.
    pub async fn add_comment(
        &self,
        author: &user::Model,
        post_id: i32,
        input: CommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;
        let post = self.post_repo.get_by_id(post_id).await?;

        let model = comment::ActiveModel {
            post_id: Set(post.id),
            author_id: Set(author.id),
            text: Set(input.text),
            created: Set(Utc::now().into()),
            ..Default::default()
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::debug!(comment_id = comment.id, post_id, "Comment added");
        Ok(comment)
    }

    /// Comments on a post, newest first.
    pub async fn comments_for_post(&self, post_id: i32) -> AppResult<Vec<CommentEntry>> {
        self.post_repo.get_by_id(post_id).await?;
        let comments = self.comment_repo.find_by_post(post_id).await?;
        self.with_authors(comments).await
    }

    /// A single comment on a post.
    pub async fn get_comment(&self, post_id: i32, id: i32) -> AppResult<CommentEntry> {
        let comment = self.find_comment(post_id, id).await?;
        self.with_authors(vec![comment])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("comment {id}")))
    }

    /// Edit a comment. Only its author may do so.
    pub async fn update_comment(
        &self,
        editor: &user::Model,
        post_id: i32,
        id: i32,
        input: CommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;
        let comment = self.find_comment(post_id, id).await?;
        if comment.author_id != editor.id {
            return Err(AppError::Forbidden("only the author can edit a comment".to_string()));
        }

        let mut active: comment::ActiveModel = comment.into();
        active.text = Set(input.text);
        self.comment_repo.update(active).await
    }

    /// Delete a comment. Only its author may do so.
    pub async fn delete_comment(&self, editor: &user::Model, post_id: i32, id: i32) -> AppResult<()> {
        let comment = self.find_comment(post_id, id).await?;
        if comment.author_id != editor.id {
            return Err(AppError::Forbidden("only the author can delete a comment".to_string()));
        }

        self.comment_repo.delete(comment.id).await?;
        Ok(())
    }

    async fn find_comment(&self, post_id: i32, id: i32) -> AppResult<comment::Model> {
        self.comment_repo
            .find_on_post(post_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {id}")))
    }

    async fn with_authors(&self, comments: Vec<comment::Model>) -> AppResult<Vec<CommentEntry>> {
        let mut ids: Vec<i32> = comments.iter().map(|c| c.author_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let authors: std::collections::HashMap<i32, String> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        Ok(comments
            .into_iter()
            .map(|comment| CommentEntry {
                author: authors.get(&comment.author_id).cloned().unwrap_or_default(),
                comment,
            })
            .collect())
    }

    async fn check_input(&self, input: &PostInput) -> AppResult<()> {
        if input.text.trim().is_empty() {
            return Err(AppError::Validation("text: this field is required".to_string()));
        }

        if let Some(group_id) = input.group_id {
            if self.group_repo.find_by_id(group_id).await?.is_none() {
                return Err(AppError::Validation(format!(
                    "group: select a valid choice, {group_id} is not one of the available choices"
                )));
            }
        }

        Ok(())
    }

    async fn store_image(&self, upload: ImageUpload) -> AppResult<String> {
        let content_type = check_image(&upload.data)?;
        let stored = self
            .storage
            .save(&self.upload_path, &upload.file_name, &upload.data, content_type)
            .await?;

        tracing::debug!(key = %stored.key, size = stored.size, "Image stored");
        Ok(stored.key)
    }

    async fn remove_image(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(key, error = %e, "Failed to remove image");
        }
    }
}

/// Check that `data` is a decodable image and return its MIME type.
fn check_image(data: &[u8]) -> AppResult<&'static str> {
    const INVALID: &str =
        "image: upload a valid image, the file you uploaded was either not an image or a corrupted image";

    let format = image::guess_format(data).map_err(|_| AppError::Validation(INVALID.to_string()))?;
    image::load_from_memory_with_format(data, format)
        .map_err(|_| AppError::Validation(INVALID.to_string()))?;

    Ok(format.to_mime_type())
}
