/// Data models for blog-service
///
/// This module defines structures for:
/// - User: identity that owns posts and comments
/// - Post, Tag, Picture: blog entries and what hangs off them
/// - Comment: rated remarks, owned or anonymous
/// - Typed inputs accepted by each mutating action
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Display name used for comments without a user or a free-text name.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User row provisioned the first time an authenticated subject is seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

impl NewUser {
    /// Falls back to `u_` and the first eight hex digits of the id when the
    /// token carries no name.
    pub fn new(id: Uuid, name: Option<String>, email: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| format!("u_{}", &id.simple().to_string()[..8]));
        Self { id, name, email }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub last_editor_id: Option<Uuid>,
    pub title: String,
    pub text: String,
    pub private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Picture {
    pub id: Uuid,
    pub post_id: Uuid,
    pub image_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub text: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment together with the name it is shown under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: String,
}

impl CommentView {
    /// The linked user's name wins over the free-text name.
    pub fn new(comment: Comment, owner: Option<&User>) -> Self {
        let author_name = match owner {
            Some(user) => user.name.clone(),
            None => comment
                .user_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(ANONYMOUS_AUTHOR)
                .to_string(),
        };
        Self {
            comment,
            author_name,
        }
    }
}

/// Denormalised post row used by listings and the query module.
///
/// Everything the search, filter, sort and count operations look at lives
/// here so that a scope can be evaluated without further lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: Post,
    pub author_name: String,
    pub tags: Vec<Tag>,
    pub comment_count: i64,
    pub average_rating: f64,
}

/// Full post payload returned by the show endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetails {
    #[serde(flatten)]
    pub post: Post,
    pub author: User,
    pub last_editor: Option<User>,
    pub tags: Vec<Tag>,
    pub pictures: Vec<Picture>,
    pub comments: Vec<CommentView>,
}

// =====================================================================
// Inputs
// =====================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreatePostInput {
    #[validate(custom(function = "not_blank", message = "can't be blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "can't be blank"))]
    pub text: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    #[serde(default)]
    #[validate(nested)]
    pub pictures: Vec<PictureAttributes>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePostInput {
    #[validate(custom(function = "not_blank", message = "can't be blank"))]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank", message = "can't be blank"))]
    pub text: Option<String>,
    pub private: Option<bool>,
    /// Replaces the tag set when present.
    pub tag_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    #[validate(nested)]
    pub pictures: Vec<PictureAttributes>,
}

/// Nested picture attributes of a post edit.
///
/// Without an `id` a picture is created; with an `id` it is updated, or
/// removed when `destroy` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PictureAttributes {
    pub id: Option<Uuid>,
    #[validate(custom(function = "not_blank", message = "can't be blank"))]
    pub image_url: Option<String>,
    pub caption: Option<String>,
    #[serde(default, rename = "_destroy")]
    pub destroy: bool,
}

/// Changes applied to a post by the store, after validation.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub editor_id: Uuid,
    pub title: Option<String>,
    pub text: Option<String>,
    pub private: Option<bool>,
    pub tag_ids: Option<Vec<Uuid>>,
    pub pictures: Vec<PictureChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PictureChange {
    Create {
        image_url: String,
        caption: Option<String>,
    },
    Update {
        id: Uuid,
        image_url: Option<String>,
        caption: Option<String>,
    },
    Destroy {
        id: Uuid,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(custom(function = "not_blank", message = "can't be blank"))]
    pub text: String,
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: i32,
    pub user_name: Option<String>,
    /// Anti-automation token for guests; ignored for signed-in users.
    #[serde(default)]
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCommentInput {
    #[validate(custom(function = "not_blank", message = "can't be blank"))]
    pub text: Option<String>,
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: Option<i32>,
    pub user_name: Option<String>,
}

/// Comment row to insert, after the post and owner have been resolved.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub text: String,
    pub rating: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTagInput {
    #[validate(custom(function = "not_blank", message = "can't be blank"))]
    pub name: String,
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}
