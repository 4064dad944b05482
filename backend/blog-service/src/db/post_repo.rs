use crate::models::{Picture, PictureChange, Post, PostSummary, Tag};
use crate::query::{AuthorKey, PostQuery, SortField, TagKey};
use sqlx::{PgConnection, PgPool};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

const POST_COLUMNS: &str =
    "p.id, p.user_id, p.last_editor_id, p.title, p.text, p.private, p.created_at, p.updated_at";

/// Scope predicate shared by listings and counts.
///
/// Binds: $1 search pattern (NULL for none), $2 tag ids, $3 author ids,
/// $4 private-only flag.
const SCOPE_CONDITIONS: &str = r#"
    ($1::text IS NULL
        OR p.title ILIKE $1
        OR p.text ILIKE $1
        OR EXISTS (
            SELECT 1 FROM posts_tags spt
            JOIN tags st ON st.id = spt.tag_id
            WHERE spt.post_id = p.id AND st.name ILIKE $1
        ))
    AND (cardinality($2::uuid[]) = 0
        OR EXISTS (
            SELECT 1 FROM posts_tags fpt
            WHERE fpt.post_id = p.id AND fpt.tag_id = ANY($2::uuid[])
        ))
    AND (cardinality($3::uuid[]) = 0 OR p.user_id = ANY($3::uuid[]))
    AND (NOT $4::boolean OR p.private)
"#;

/// Bind values for `SCOPE_CONDITIONS`.
struct ScopeBinds {
    pattern: Option<String>,
    tags: Vec<Uuid>,
    authors: Vec<Uuid>,
    private_only: bool,
}

impl From<&PostQuery> for ScopeBinds {
    fn from(query: &PostQuery) -> Self {
        Self {
            pattern: query.keyword().map(like_pattern),
            tags: query.filter.tags.clone(),
            authors: query.filter.authors.clone(),
            private_only: query.filter.private,
        }
    }
}

/// `%keyword%` with LIKE wildcards escaped.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn order_clause(sort: Option<SortField>) -> &'static str {
    match sort {
        None => "p.created_at ASC, p.id ASC",
        Some(SortField::Title) => r#"p.title COLLATE "C" ASC"#,
        Some(SortField::Comments) => r#"comment_count DESC, p.title COLLATE "C" ASC"#,
        Some(SortField::Rating) => r#"average_rating DESC, p.title COLLATE "C" ASC"#,
        Some(SortField::Author) => r#"u.name COLLATE "C" ASC, p.title COLLATE "C" ASC"#,
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    post: Post,
    author_name: String,
    comment_count: i64,
    average_rating: f64,
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: Uuid,
    id: Uuid,
    name: String,
}

/// Posts in a scope, with author name, tags and comment statistics.
pub async fn find_posts(pool: &PgPool, query: &PostQuery) -> Result<Vec<PostSummary>, sqlx::Error> {
    let binds = ScopeBinds::from(query);
    let sql = format!(
        r#"
        SELECT {columns},
               u.name AS author_name,
               COALESCE(c.comment_count, 0) AS comment_count,
               COALESCE(c.average_rating, 0)::float8 AS average_rating
        FROM posts p
        JOIN users u ON u.id = p.user_id
        LEFT JOIN (
            SELECT post_id, COUNT(*) AS comment_count, AVG(rating)::float8 AS average_rating
            FROM comments
            GROUP BY post_id
        ) c ON c.post_id = p.id
        WHERE {conditions}
        ORDER BY {order}
        "#,
        columns = POST_COLUMNS,
        conditions = SCOPE_CONDITIONS,
        order = order_clause(query.sort),
    );

    let rows = sqlx::query_as::<_, SummaryRow>(&sql)
        .bind(binds.pattern)
        .bind(binds.tags)
        .bind(binds.authors)
        .bind(binds.private_only)
        .fetch_all(pool)
        .await?;

    let post_ids: Vec<Uuid> = rows.iter().map(|r| r.post.id).collect();
    let mut tags_by_post = find_tags_for_posts(pool, &post_ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| PostSummary {
            tags: tags_by_post.remove(&row.post.id).unwrap_or_default(),
            post: row.post,
            author_name: row.author_name,
            comment_count: row.comment_count,
            average_rating: row.average_rating,
        })
        .collect())
}

async fn find_tags_for_posts(
    pool: &PgPool,
    post_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Tag>>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, PostTagRow>(
        r#"
        SELECT pt.post_id, t.id, t.name
        FROM posts_tags pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.post_id = ANY($1)
        ORDER BY t.name COLLATE "C"
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for row in rows {
        grouped.entry(row.post_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
        });
    }
    Ok(grouped)
}

/// Number of posts in the scope per (tag name, tag id)
pub async fn count_posts_by_tags(
    pool: &PgPool,
    scope: &PostQuery,
) -> Result<BTreeMap<TagKey, i64>, sqlx::Error> {
    let binds = ScopeBinds::from(scope);
    let sql = format!(
        r#"
        SELECT t.name, t.id, COUNT(*) AS post_count
        FROM posts p
        JOIN posts_tags pt ON pt.post_id = p.id
        JOIN tags t ON t.id = pt.tag_id
        WHERE {conditions}
        GROUP BY t.id, t.name
        "#,
        conditions = SCOPE_CONDITIONS,
    );

    let rows = sqlx::query_as::<_, (String, Uuid, i64)>(&sql)
        .bind(binds.pattern)
        .bind(binds.tags)
        .bind(binds.authors)
        .bind(binds.private_only)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(name, id, count)| (TagKey { name, id }, count))
        .collect())
}

/// Number of posts in the scope per (author name, author id)
pub async fn count_posts_by_authors(
    pool: &PgPool,
    scope: &PostQuery,
) -> Result<BTreeMap<AuthorKey, i64>, sqlx::Error> {
    let binds = ScopeBinds::from(scope);
    let sql = format!(
        r#"
        SELECT u.name, u.id, COUNT(*) AS post_count
        FROM posts p
        JOIN users u ON u.id = p.user_id
        WHERE {conditions}
        GROUP BY u.id, u.name
        "#,
        conditions = SCOPE_CONDITIONS,
    );

    let rows = sqlx::query_as::<_, (String, Uuid, i64)>(&sql)
        .bind(binds.pattern)
        .bind(binds.tags)
        .bind(binds.authors)
        .bind(binds.private_only)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(name, id, count)| (AuthorKey { name, id }, count))
        .collect())
}

pub async fn count_private_posts(pool: &PgPool, scope: &PostQuery) -> Result<i64, sqlx::Error> {
    let binds = ScopeBinds::from(scope);
    let sql = format!(
        "SELECT COUNT(*) FROM posts p WHERE p.private AND {conditions}",
        conditions = SCOPE_CONDITIONS,
    );

    sqlx::query_scalar::<_, i64>(&sql)
        .bind(binds.pattern)
        .bind(binds.tags)
        .bind(binds.authors)
        .bind(binds.private_only)
        .fetch_one(pool)
        .await
}

/// Find a post by ID
pub async fn find_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    let sql = format!("SELECT {} FROM posts p WHERE p.id = $1", POST_COLUMNS);
    sqlx::query_as::<_, Post>(&sql)
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

/// Lock a post row for the rest of the transaction
pub async fn lock_post(conn: &mut PgConnection, post_id: Uuid) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
        .bind(post_id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

pub async fn insert_post(
    conn: &mut PgConnection,
    user_id: Uuid,
    title: &str,
    text: &str,
    private: bool,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (user_id, title, text, private)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, last_editor_id, title, text, private, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(text)
    .bind(private)
    .fetch_one(conn)
    .await
}

pub async fn update_post_fields(
    conn: &mut PgConnection,
    post_id: Uuid,
    editor_id: Uuid,
    title: Option<&str>,
    text: Option<&str>,
    private: Option<bool>,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET title = COALESCE($2, title),
            text = COALESCE($3, text),
            private = COALESCE($4, private),
            last_editor_id = $5,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, user_id, last_editor_id, title, text, private, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .bind(title)
    .bind(text)
    .bind(private)
    .bind(editor_id)
    .fetch_one(conn)
    .await
}

/// Replace the tag set of a post
pub async fn replace_post_tags(
    conn: &mut PgConnection,
    post_id: Uuid,
    tag_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM posts_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO posts_tags (post_id, tag_id)
        SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS tag_id
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(post_id)
    .bind(tag_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Apply one nested picture attribute. Returns `false` when an update or
/// destroy names a picture that does not belong to the post.
pub async fn apply_picture_change(
    conn: &mut PgConnection,
    post_id: Uuid,
    change: &PictureChange,
) -> Result<bool, sqlx::Error> {
    let affected = match change {
        PictureChange::Create { image_url, caption } => {
            sqlx::query("INSERT INTO pictures (post_id, image_url, caption) VALUES ($1, $2, $3)")
                .bind(post_id)
                .bind(image_url)
                .bind(caption)
                .execute(conn)
                .await?
                .rows_affected()
        }
        PictureChange::Update {
            id,
            image_url,
            caption,
        } => sqlx::query(
            r#"
            UPDATE pictures
            SET image_url = COALESCE($3, image_url),
                caption = COALESCE($4, caption)
            WHERE id = $1 AND post_id = $2
            "#,
        )
        .bind(id)
        .bind(post_id)
        .bind(image_url)
        .bind(caption)
        .execute(conn)
        .await?
        .rows_affected(),
        PictureChange::Destroy { id } => {
            sqlx::query("DELETE FROM pictures WHERE id = $1 AND post_id = $2")
                .bind(id)
                .bind(post_id)
                .execute(conn)
                .await?
                .rows_affected()
        }
    };

    Ok(affected > 0)
}

/// Delete a post and everything it owns. Returns `false` if it did not exist.
pub async fn delete_post_cascade(conn: &mut PgConnection, post_id: Uuid) -> Result<bool, sqlx::Error> {
    for statement in [
        "DELETE FROM comments WHERE post_id = $1",
        "DELETE FROM pictures WHERE post_id = $1",
        "DELETE FROM posts_tags WHERE post_id = $1",
    ] {
        sqlx::query(statement)
            .bind(post_id)
            .execute(&mut *conn)
            .await?;
    }

    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Tags of a post ordered by name
pub async fn find_post_tags(pool: &PgPool, post_id: Uuid) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name
        FROM tags t
        JOIN posts_tags pt ON pt.tag_id = t.id
        WHERE pt.post_id = $1
        ORDER BY t.name COLLATE "C"
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}

pub async fn find_post_pictures(pool: &PgPool, post_id: Uuid) -> Result<Vec<Picture>, sqlx::Error> {
    sqlx::query_as::<_, Picture>(
        r#"
        SELECT id, post_id, image_url, caption, created_at
        FROM pictures
        WHERE post_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Tag_n"), "%Tag\\_n%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn every_sort_field_has_a_total_order() {
        for field in [
            SortField::Title,
            SortField::Comments,
            SortField::Rating,
            SortField::Author,
        ] {
            assert!(order_clause(Some(field)).contains("p.title"));
        }
    }
}
