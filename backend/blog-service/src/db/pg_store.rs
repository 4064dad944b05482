use super::{comment_repo, post_repo, tag_repo, user_repo, BlogStore, NewPost};
use crate::error::{AppError, Result};
use crate::models::{
    Comment, NewComment, NewUser, Picture, PictureChange, Post, PostChanges, PostSummary, Tag,
    UpdateCommentInput, User,
};
use crate::query::{AuthorKey, PostQuery, TagKey};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed store (source of truth in production)
#[derive(Clone)]
pub struct PgBlogStore {
    pool: PgPool,
}

impl PgBlogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BlogStore for PgBlogStore {
    async fn create_user(&self, name: &str, email: &str) -> Result<User> {
        Ok(user_repo::create_user(&self.pool, name, email).await?)
    }

    async fn ensure_user(&self, user: NewUser) -> Result<()> {
        Ok(user_repo::ensure_user(&self.pool, &user).await?)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(user_repo::find_user_by_id(&self.pool, user_id).await?)
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        Ok(tag_repo::create_tag(&self.pool, name).await?)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(tag_repo::list_tags(&self.pool).await?)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut tx = self.pool.begin().await?;

        let created =
            post_repo::insert_post(&mut tx, post.user_id, &post.title, &post.text, post.private)
                .await?;
        post_repo::replace_post_tags(&mut tx, created.id, &post.tag_ids).await?;
        for (image_url, caption) in post.pictures {
            let change = PictureChange::Create { image_url, caption };
            post_repo::apply_picture_change(&mut tx, created.id, &change).await?;
        }

        tx.commit().await?;
        debug!(post_id = %created.id, "post created");
        Ok(created)
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(post_repo::find_post_by_id(&self.pool, post_id).await?)
    }

    async fn post_tags(&self, post_id: Uuid) -> Result<Vec<Tag>> {
        Ok(post_repo::find_post_tags(&self.pool, post_id).await?)
    }

    async fn post_pictures(&self, post_id: Uuid) -> Result<Vec<Picture>> {
        Ok(post_repo::find_post_pictures(&self.pool, post_id).await?)
    }

    async fn post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        Ok(comment_repo::get_comments_by_post(&self.pool, post_id).await?)
    }

    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        let mut tx = self.pool.begin().await?;

        if !post_repo::lock_post(&mut tx, post_id).await? {
            return Ok(None);
        }

        let updated = post_repo::update_post_fields(
            &mut tx,
            post_id,
            changes.editor_id,
            changes.title.as_deref(),
            changes.text.as_deref(),
            changes.private,
        )
        .await?;

        if let Some(tag_ids) = &changes.tag_ids {
            post_repo::replace_post_tags(&mut tx, post_id, tag_ids).await?;
        }

        for change in &changes.pictures {
            if !post_repo::apply_picture_change(&mut tx, post_id, change).await? {
                // dropping the transaction rolls back the field updates
                return Err(AppError::NotFound(format!(
                    "picture does not belong to post {}",
                    post_id
                )));
            }
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = post_repo::delete_post_cascade(&mut tx, post_id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn query_posts(&self, query: &PostQuery) -> Result<Vec<PostSummary>> {
        Ok(post_repo::find_posts(&self.pool, query).await?)
    }

    async fn count_posts_by_tags(&self, scope: &PostQuery) -> Result<BTreeMap<TagKey, i64>> {
        Ok(post_repo::count_posts_by_tags(&self.pool, scope).await?)
    }

    async fn count_posts_by_authors(&self, scope: &PostQuery) -> Result<BTreeMap<AuthorKey, i64>> {
        Ok(post_repo::count_posts_by_authors(&self.pool, scope).await?)
    }

    async fn count_private_posts(&self, scope: &PostQuery) -> Result<i64> {
        Ok(post_repo::count_private_posts(&self.pool, scope).await?)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        Ok(comment_repo::create_comment(&self.pool, &comment).await?)
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        Ok(comment_repo::get_comment_by_id(&self.pool, comment_id).await?)
    }

    async fn update_comment(
        &self,
        comment_id: Uuid,
        changes: &UpdateCommentInput,
    ) -> Result<Option<Comment>> {
        Ok(comment_repo::update_comment(&self.pool, comment_id, changes).await?)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        Ok(comment_repo::delete_comment(&self.pool, comment_id).await?)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
