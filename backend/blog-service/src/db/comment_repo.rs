use crate::models::{Comment, NewComment, UpdateCommentInput};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new comment on a post
pub async fn create_comment(pool: &PgPool, comment: &NewComment) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (post_id, user_id, user_name, text, rating)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, post_id, user_id, user_name, text, rating, created_at, updated_at
        "#,
    )
    .bind(comment.post_id)
    .bind(comment.user_id)
    .bind(&comment.user_name)
    .bind(&comment.text)
    .bind(comment.rating)
    .fetch_one(pool)
    .await
}

/// Get all comments for a post, oldest first
pub async fn get_comments_by_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, user_id, user_name, text, rating, created_at, updated_at
        FROM comments
        WHERE post_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}

/// Get a single comment by ID
pub async fn get_comment_by_id(pool: &PgPool, comment_id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, user_id, user_name, text, rating, created_at, updated_at
        FROM comments
        WHERE id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await
}

/// Update the fields present in `changes`
pub async fn update_comment(
    pool: &PgPool,
    comment_id: Uuid,
    changes: &UpdateCommentInput,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        UPDATE comments
        SET text = COALESCE($2, text),
            rating = COALESCE($3, rating),
            user_name = COALESCE($4, user_name),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, post_id, user_id, user_name, text, rating, created_at, updated_at
        "#,
    )
    .bind(comment_id)
    .bind(&changes.text)
    .bind(changes.rating)
    .bind(&changes.user_name)
    .fetch_optional(pool)
    .await
}

pub async fn delete_comment(pool: &PgPool, comment_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
