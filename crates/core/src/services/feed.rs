//! Feed service: the paginated post listings behind the index, group,
//! profile and follow pages.

use std::collections::HashMap;

use postboard_common::{AppResult, Page};
use postboard_db::{
    entities::{group, post, user},
    repositories::{CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository},
};
use serde::Serialize;

/// A post together with what a listing needs to show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostEntry {
    pub post: post::Model,
    /// Author's username.
    pub author: String,
    pub group: Option<group::Model>,
}

/// Group page: the group and its posts.
#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: group::Model,
    pub page: Page<PostEntry>,
}

/// Profile page: the author, their posts and the viewer's relation to them.
#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: user::Model,
    pub page: Page<PostEntry>,
    /// Whether the viewer follows the author. Always false for anonymous
    /// viewers and for authors looking at their own profile.
    pub following: bool,
    /// Number of posts by the author.
    pub post_count: u64,
    /// Number of comments left on the author's posts.
    pub comment_count: u64,
}

/// Feed service for business logic.
#[derive(Clone)]
pub struct FeedService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    follow_repo: FollowRepository,
    comment_repo: CommentRepository,
    per_page: u64,
}

impl FeedService {
    /// Create a new feed service showing `per_page` posts per page.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        follow_repo: FollowRepository,
        comment_repo: CommentRepository,
        per_page: u64,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            follow_repo,
            comment_repo,
            per_page,
        }
    }

    /// Posts per page.
    #[must_use]
    pub const fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Every post, newest first.
    pub async fn index_feed(&self, page: Option<&str>) -> AppResult<Page<PostEntry>> {
        let page = self.post_repo.find_page(page, self.per_page).await?;
        self.hydrate_page(page).await
    }

    /// Posts in the group with `slug`.
    pub async fn group_feed(&self, slug: &str, page: Option<&str>) -> AppResult<GroupFeed> {
        let group = self.group_repo.get_by_slug(slug).await?;
        let page = self
            .post_repo
            .find_page_by_group(group.id, page, self.per_page)
            .await?;
        let page = self.hydrate_page(page).await?;
        Ok(GroupFeed { group, page })
    }

    /// Posts by `username`, as seen by `viewer`.
    pub async fn profile_feed(
        &self,
        username: &str,
        viewer: Option<&user::Model>,
        page: Option<&str>,
    ) -> AppResult<ProfileFeed> {
        let author = self.user_repo.get_by_username(username).await?;
        let page = self
            .post_repo
            .find_page_by_author(author.id, page, self.per_page)
            .await?;

        let following = match viewer {
            Some(viewer) if viewer.id != author.id => {
                self.follow_repo.is_following(viewer.id, author.id).await?
            }
            _ => false,
        };

        let comment_count = self.comment_repo.count_on_author_posts(author.id).await?;
        let post_count = page.num_items;
        let page = self.hydrate_page(page).await?;

        Ok(ProfileFeed {
            author,
            page,
            following,
            post_count,
            comment_count,
        })
    }

    /// Posts by every author `viewer` follows.
    pub async fn follow_index_feed(
        &self,
        viewer: &user::Model,
        page: Option<&str>,
    ) -> AppResult<Page<PostEntry>> {
        let page = self
            .post_repo
            .find_page_by_followed(viewer.id, page, self.per_page)
            .await?;
        self.hydrate_page(page).await
    }

    async fn hydrate_page(&self, mut page: Page<post::Model>) -> AppResult<Page<PostEntry>> {
        let posts = std::mem::take(&mut page.items);
        let entries = hydrate(&self.user_repo, &self.group_repo, posts).await?;
        Ok(page.with_items(entries))
    }
}

/// Attach author usernames and groups to posts, keeping their order.
pub async fn hydrate(
    user_repo: &UserRepository,
    group_repo: &GroupRepository,
    posts: Vec<post::Model>,
) -> AppResult<Vec<PostEntry>> {
    let mut author_ids: Vec<i32> = posts.iter().map(|p| p.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut group_ids: Vec<i32> = posts.iter().filter_map(|p| p.group_id).collect();
    group_ids.sort_unstable();
    group_ids.dedup();

    let authors: HashMap<i32, String> = user_repo
        .find_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    let groups: HashMap<i32, group::Model> = group_repo
        .find_by_ids(&group_ids)
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();

    Ok(posts
        .into_iter()
        .map(|post| PostEntry {
            author: authors.get(&post.author_id).cloned().unwrap_or_default(),
            group: post.group_id.and_then(|id| groups.get(&id).cloned()),
            post,
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use postboard_common::AppError;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_service(db: sea_orm::DatabaseConnection) -> FeedService {
        let db = Arc::new(db);
        FeedService::new(
            PostRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            GroupRepository::new(db.clone()),
            FollowRepository::new(db.clone()),
            CommentRepository::new(db),
            10,
        )
    }

    #[tokio::test]
    async fn test_group_feed_unknown_slug() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<group::Model>::new()])
            .into_connection();

        let service = create_service(db);
        let result = service.group_feed("nope", None).await;

        assert!(matches!(result, Err(AppError::GroupNotFound(slug)) if slug == "nope"));
    }

    #[tokio::test]
    async fn test_profile_feed_unknown_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let service = create_service(db);
        let result = service.profile_feed("ghost", None, None).await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_hydrate_keeps_order_and_attaches_names() {
        let now = Utc::now();
        let posts = vec![
            post::Model {
                id: 2,
                text: "second".to_string(),
                pub_date: now.into(),
                author_id: 7,
                group_id: Some(3),
                image: None,
            },
            post::Model {
                id: 1,
                text: "first".to_string(),
                pub_date: now.into(),
                author_id: 8,
                group_id: None,
                image: None,
            },
        ];
        let users = [7, 8].map(|id| user::Model {
            id,
            username: format!("user{id}"),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            token: None,
            is_staff: false,
            date_joined: now.into(),
        });
        let group = group::Model {
            id: 3,
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([users.to_vec()])
                .append_query_results([[group.clone()]])
                .into_connection(),
        );

        let entries = hydrate(&UserRepository::new(db.clone()), &GroupRepository::new(db), posts)
            .await
            .unwrap();

        assert_eq!(entries[0].post.id, 2);
        assert_eq!(entries[0].author, "user7");
        assert_eq!(entries[0].group, Some(group));
        assert_eq!(entries[1].author, "user8");
        assert_eq!(entries[1].group, None);
    }
}
