use crate::models::{NewUser, User};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_user(pool: &PgPool, name: &str, email: &str) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email)
        VALUES ($1, $2)
        RETURNING id, name, email, created_at
        "#,
    )
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await
}

pub async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, name, email, created_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Insert a user row keyed by the identity provider's subject; no-op when
/// the id is already known.
pub async fn ensure_user(pool: &PgPool, user: &NewUser) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .execute(pool)
    .await?;
    Ok(())
}
