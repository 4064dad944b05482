/// Authorization module for blog-service
///
/// Ownership-based permission checks for posts and comments. Every check
/// fails closed: a missing owner or a missing identity is never a match.
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics::AUTHORIZATION_DENIALS_TOTAL;
use crate::models::{Comment, Post};

/// Result type for permission checks
pub type PermissionResult = Result<(), AppError>;

/// True iff the comment has an owning user, an identity is present, and
/// they are the same user.
pub fn is_author(comment: &Comment, current_user: Option<Uuid>) -> bool {
    match (comment.user_id, current_user) {
        (Some(owner), Some(current)) => owner == current,
        _ => false,
    }
}

/// Check that the acting identity wrote the comment
pub fn check_comment_ownership(current_user: Option<Uuid>, comment: &Comment) -> PermissionResult {
    if is_author(comment, current_user) {
        return Ok(());
    }

    deny("comment", comment.id, current_user);
    Err(AppError::Forbidden(
        "You don't have permission to modify this comment".into(),
    ))
}

/// Check if a user owns a post
pub fn check_post_ownership(user_id: Uuid, post: &Post) -> PermissionResult {
    if post.user_id == user_id {
        return Ok(());
    }

    deny("post", post.id, Some(user_id));
    Err(AppError::Forbidden(
        "You don't have permission to delete this post".into(),
    ))
}

fn deny(resource: &str, resource_id: Uuid, current_user: Option<Uuid>) {
    AUTHORIZATION_DENIALS_TOTAL
        .with_label_values(&[resource])
        .inc();
    tracing::warn!(
        resource,
        resource_id = %resource_id,
        user_id = ?current_user,
        "authorization denied"
    );
}
