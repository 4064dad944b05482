use crate::models::Tag;
use sqlx::PgPool;

pub async fn create_tag(pool: &PgPool, name: &str) -> Result<Tag, sqlx::Error> {
    sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES ($1) RETURNING id, name")
        .bind(name)
        .fetch_one(pool)
        .await
}

/// All tags ordered by name
pub async fn list_tags(pool: &PgPool) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>(r#"SELECT id, name FROM tags ORDER BY name COLLATE "C""#)
        .fetch_all(pool)
        .await
}
