use super::{BlogStore, NewPost};
use crate::error::{AppError, Result};
use crate::models::{
    Comment, NewComment, NewUser, Picture, PictureChange, Post, PostChanges, PostSummary, Tag,
    UpdateCommentInput, User,
};
use crate::query::{self, AuthorKey, PostQuery, TagKey};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process store with the same constraints as the PostgreSQL schema.
///
/// Query semantics are delegated to `crate::query`, so listings and counts
/// behave like the SQL implementation.
#[derive(Clone, Default)]
pub struct MemoryBlogStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    /// Creation order
    posts: Vec<Post>,
    tags: Vec<Tag>,
    post_tags: Vec<(Uuid, Uuid)>,
    pictures: Vec<Picture>,
    comments: Vec<Comment>,
}

impl MemoryState {
    fn post_index(&self, post_id: Uuid) -> Option<usize> {
        self.posts.iter().position(|p| p.id == post_id)
    }

    fn ensure_unique_title(&self, title: &str, except: Option<Uuid>) -> Result<()> {
        if self
            .posts
            .iter()
            .any(|p| p.title == title && Some(p.id) != except)
        {
            return Err(AppError::Conflict(
                "a post with this title already exists".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_email_free(&self, email: &str) -> Result<()> {
        if self.users.values().any(|u| u.email.as_deref() == Some(email)) {
            return Err(AppError::Conflict(
                "a user with this email already exists".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_user(&self, user_id: Uuid) -> Result<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(AppError::ValidationError(
                "referenced record does not exist".to_string(),
            ))
        }
    }

    fn set_post_tags(&mut self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<()> {
        if tag_ids.iter().any(|id| !self.tags.iter().any(|t| t.id == *id)) {
            return Err(AppError::ValidationError(
                "referenced record does not exist".to_string(),
            ));
        }
        self.post_tags.retain(|(p, _)| *p != post_id);
        for tag_id in tag_ids {
            if !self.post_tags.contains(&(post_id, *tag_id)) {
                self.post_tags.push((post_id, *tag_id));
            }
        }
        Ok(())
    }

    fn tags_of(&self, post_id: Uuid) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .post_tags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .filter_map(|(_, t)| self.tags.iter().find(|tag| tag.id == *t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn apply_picture_change(&mut self, post_id: Uuid, change: &PictureChange) -> Result<()> {
        match change {
            PictureChange::Create { image_url, caption } => {
                self.pictures.push(Picture {
                    id: Uuid::new_v4(),
                    post_id,
                    image_url: image_url.clone(),
                    caption: caption.clone(),
                    created_at: Utc::now(),
                });
            }
            PictureChange::Update {
                id,
                image_url,
                caption,
            } => {
                let picture = self
                    .pictures
                    .iter_mut()
                    .find(|p| p.id == *id && p.post_id == post_id)
                    .ok_or_else(|| picture_not_found(post_id))?;
                if let Some(url) = image_url {
                    picture.image_url = url.clone();
                }
                if let Some(caption) = caption {
                    picture.caption = Some(caption.clone());
                }
            }
            PictureChange::Destroy { id } => {
                let before = self.pictures.len();
                self.pictures
                    .retain(|p| !(p.id == *id && p.post_id == post_id));
                if self.pictures.len() == before {
                    return Err(picture_not_found(post_id));
                }
            }
        }
        Ok(())
    }

    fn summaries(&self) -> Vec<PostSummary> {
        self.posts
            .iter()
            .map(|post| {
                let ratings: Vec<i32> = self
                    .comments
                    .iter()
                    .filter(|c| c.post_id == post.id)
                    .map(|c| c.rating)
                    .collect();
                PostSummary {
                    post: post.clone(),
                    author_name: self
                        .users
                        .get(&post.user_id)
                        .map(|u| u.name.clone())
                        .unwrap_or_default(),
                    tags: self.tags_of(post.id),
                    comment_count: ratings.len() as i64,
                    average_rating: query::average_rating(&ratings),
                }
            })
            .collect()
    }

    fn scope(&self, scope: &PostQuery) -> Vec<PostSummary> {
        let unordered = PostQuery {
            sort: None,
            ..scope.clone()
        };
        unordered.apply(self.summaries())
    }
}

fn picture_not_found(post_id: Uuid) -> AppError {
    AppError::NotFound(format!("picture does not belong to post {}", post_id))
}

impl MemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlogStore for MemoryBlogStore {
    async fn create_user(&self, name: &str, email: &str) -> Result<User> {
        let mut state = self.state.write().await;
        state.ensure_email_free(email)?;
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: Some(email.to_string()),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn ensure_user(&self, user: NewUser) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) {
            return Ok(());
        }
        if let Some(email) = &user.email {
            state.ensure_email_free(email)?;
        }
        state.users.insert(
            user.id,
            User {
                id: user.id,
                name: user.name,
                email: user.email,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        let mut state = self.state.write().await;
        if state.tags.iter().any(|t| t.name == name) {
            return Err(AppError::Conflict(
                "a tag with this name already exists".to_string(),
            ));
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags = self.state.read().await.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut guard = self.state.write().await;
        let mut state = guard.clone();

        state.ensure_user(post.user_id)?;
        state.ensure_unique_title(&post.title, None)?;

        let now = Utc::now();
        let created = Post {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            last_editor_id: None,
            title: post.title,
            text: post.text,
            private: post.private,
            created_at: now,
            updated_at: now,
        };
        state.posts.push(created.clone());
        state.set_post_tags(created.id, &post.tag_ids)?;
        for (image_url, caption) in post.pictures {
            state.apply_picture_change(created.id, &PictureChange::Create { image_url, caption })?;
        }

        *guard = state;
        Ok(created)
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.post_index(post_id).map(|i| state.posts[i].clone()))
    }

    async fn post_tags(&self, post_id: Uuid) -> Result<Vec<Tag>> {
        Ok(self.state.read().await.tags_of(post_id))
    }

    async fn post_pictures(&self, post_id: Uuid) -> Result<Vec<Picture>> {
        let state = self.state.read().await;
        Ok(state
            .pictures
            .iter()
            .filter(|p| p.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn post_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        let mut guard = self.state.write().await;
        let Some(index) = guard.post_index(post_id) else {
            return Ok(None);
        };
        let mut state = guard.clone();

        if let Some(title) = &changes.title {
            state.ensure_unique_title(title, Some(post_id))?;
        }
        state.ensure_user(changes.editor_id)?;

        {
            let post = &mut state.posts[index];
            if let Some(title) = changes.title {
                post.title = title;
            }
            if let Some(text) = changes.text {
                post.text = text;
            }
            if let Some(private) = changes.private {
                post.private = private;
            }
            post.last_editor_id = Some(changes.editor_id);
            post.updated_at = Utc::now();
        }

        if let Some(tag_ids) = &changes.tag_ids {
            state.set_post_tags(post_id, tag_ids)?;
        }
        for change in &changes.pictures {
            state.apply_picture_change(post_id, change)?;
        }

        let updated = state.posts[index].clone();
        *guard = state;
        Ok(Some(updated))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(index) = state.post_index(post_id) else {
            return Ok(false);
        };
        state.comments.retain(|c| c.post_id != post_id);
        state.pictures.retain(|p| p.post_id != post_id);
        state.post_tags.retain(|(p, _)| *p != post_id);
        state.posts.remove(index);
        Ok(true)
    }

    async fn query_posts(&self, query: &PostQuery) -> Result<Vec<PostSummary>> {
        let state = self.state.read().await;
        Ok(query.apply(state.summaries()))
    }

    async fn count_posts_by_tags(&self, scope: &PostQuery) -> Result<BTreeMap<TagKey, i64>> {
        let state = self.state.read().await;
        Ok(query::count_posts_by_tags(&state.scope(scope)))
    }

    async fn count_posts_by_authors(&self, scope: &PostQuery) -> Result<BTreeMap<AuthorKey, i64>> {
        let state = self.state.read().await;
        Ok(query::count_posts_by_authors(&state.scope(scope)))
    }

    async fn count_private_posts(&self, scope: &PostQuery) -> Result<i64> {
        let state = self.state.read().await;
        Ok(query::count_private_posts(&state.scope(scope)))
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut state = self.state.write().await;
        if state.post_index(comment.post_id).is_none() {
            return Err(AppError::ValidationError(
                "referenced record does not exist".to_string(),
            ));
        }
        if let Some(user_id) = comment.user_id {
            state.ensure_user(user_id)?;
        }

        let now = Utc::now();
        let created = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            user_id: comment.user_id,
            user_name: comment.user_name,
            text: comment.text,
            rating: comment.rating,
            created_at: now,
            updated_at: now,
        };
        state.comments.push(created.clone());
        Ok(created)
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let state = self.state.read().await;
        Ok(state.comments.iter().find(|c| c.id == comment_id).cloned())
    }

    async fn update_comment(
        &self,
        comment_id: Uuid,
        changes: &UpdateCommentInput,
    ) -> Result<Option<Comment>> {
        let mut state = self.state.write().await;
        let Some(comment) = state.comments.iter_mut().find(|c| c.id == comment_id) else {
            return Ok(None);
        };
        if let Some(text) = &changes.text {
            comment.text = text.clone();
        }
        if let Some(rating) = changes.rating {
            comment.rating = rating;
        }
        if let Some(user_name) = &changes.user_name {
            comment.user_name = Some(user_name.clone());
        }
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.comments.len();
        state.comments.retain(|c| c.id != comment_id);
        Ok(state.comments.len() < before)
    }
}
