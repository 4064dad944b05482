/// Database access layer
///
/// This module provides:
/// - `BlogStore`: the persistence interface the services are written against
/// - `PgBlogStore`: PostgreSQL implementation built on the repository functions
/// - `MemoryBlogStore`: in-process implementation for tests and local runs
/// - Connection pool creation and migrations
pub mod comment_repo;
pub mod memory_store;
pub mod pg_store;
pub mod pool;
pub mod post_repo;
pub mod tag_repo;
pub mod user_repo;

pub use memory_store::MemoryBlogStore;
pub use pg_store::PgBlogStore;
pub use pool::{create_pool, run_migrations, DbConfig};

use crate::error::Result;
use crate::models::{
    Comment, NewComment, NewUser, Picture, Post, PostChanges, PostSummary, Tag,
    UpdateCommentInput, User,
};
use crate::query::{AuthorKey, PostQuery, TagKey};
use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

/// New post row, after validation and owner resolution.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub text: String,
    pub private: bool,
    pub tag_ids: Vec<Uuid>,
    pub pictures: Vec<(String, Option<String>)>,
}

/// Persistence interface for users, posts, tags, pictures and comments.
///
/// Multi-row writes (post create/update/delete) are atomic. Unique titles and
/// tag names are enforced by the store and reported as `AppError::Conflict`.
#[async_trait]
pub trait BlogStore: Send + Sync {
    /// Register a user known to the identity provider
    async fn create_user(&self, name: &str, email: &str) -> Result<User>;

    /// Insert the user unless a row with the same id exists. An existing row
    /// is left as it is.
    async fn ensure_user(&self, user: NewUser) -> Result<()>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn create_tag(&self, name: &str) -> Result<Tag>;

    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn create_post(&self, post: NewPost) -> Result<Post>;

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// Tags of a post, by name
    async fn post_tags(&self, post_id: Uuid) -> Result<Vec<Tag>>;

    async fn post_pictures(&self, post_id: Uuid) -> Result<Vec<Picture>>;

    /// Comments of a post, oldest first
    async fn post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    /// Apply changes and nested picture attributes in one transaction.
    /// Returns `None` when the post does not exist.
    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Option<Post>>;

    /// Remove a post together with its comments, pictures and tag links.
    /// Returns `false` when the post does not exist.
    async fn delete_post(&self, post_id: Uuid) -> Result<bool>;

    /// Evaluate a scope: search, filter, then sort
    async fn query_posts(&self, query: &PostQuery) -> Result<Vec<PostSummary>>;

    async fn count_posts_by_tags(&self, scope: &PostQuery) -> Result<BTreeMap<TagKey, i64>>;

    async fn count_posts_by_authors(&self, scope: &PostQuery) -> Result<BTreeMap<AuthorKey, i64>>;

    async fn count_private_posts(&self, scope: &PostQuery) -> Result<i64>;

    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;

    async fn update_comment(
        &self,
        comment_id: Uuid,
        changes: &UpdateCommentInput,
    ) -> Result<Option<Comment>>;

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
