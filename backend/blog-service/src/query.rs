/// Post query module: search, filter, sort and aggregate counts.
///
/// A `PostQuery` describes a scope of posts. The functions here evaluate a
/// scope over already-loaded `PostSummary` rows; the PostgreSQL store pushes
/// the same semantics down into SQL.
use crate::error::AppError;
use crate::models::PostSummary;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Title ascending
    Title,
    /// Comment count descending
    Comments,
    /// Average comment rating descending
    Rating,
    /// Author name ascending
    Author,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Comments => "comments",
            SortField::Rating => "rating",
            SortField::Author => "author",
        }
    }
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SortField::Title),
            "comments" => Ok(SortField::Comments),
            "rating" => Ok(SortField::Rating),
            "author" => Ok(SortField::Author),
            other => Err(AppError::BadRequest(format!(
                "unknown sort field '{}', expected one of title, comments, rating, author",
                other
            ))),
        }
    }
}

/// Filter criteria. Present keys are combined with AND; empty keys impose
/// no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFilter {
    /// Posts carrying any of these tags
    #[serde(default)]
    pub tags: Vec<Uuid>,
    /// Posts owned by any of these users
    #[serde(default)]
    pub authors: Vec<Uuid>,
    /// Only private posts when true; no constraint otherwise
    #[serde(default)]
    pub private: bool,
}

impl PostFilter {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.authors.is_empty() && !self.private
    }
}

/// A scope of posts: optional keyword search, filter, and ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub filter: PostFilter,
    pub sort: Option<SortField>,
}

impl PostQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn search(keyword: impl Into<String>) -> Self {
        Self {
            search: Some(keyword.into()),
            ..Self::default()
        }
    }

    pub fn filtered(filter: PostFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sorted(sort: SortField) -> Self {
        Self {
            sort: Some(sort),
            ..Self::default()
        }
    }

    /// Keyword to match as given; a blank keyword imposes nothing.
    pub fn keyword(&self) -> Option<&str> {
        self.search.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Evaluate the scope over `posts`, which must be in creation order.
    pub fn apply(&self, posts: Vec<PostSummary>) -> Vec<PostSummary> {
        let mut posts = match self.keyword() {
            Some(keyword) => search_all(posts, keyword),
            None => posts,
        };
        if !self.filter.is_empty() {
            posts = filter(posts, &self.filter);
        }
        if let Some(field) = self.sort {
            sort_by(&mut posts, field);
        }
        posts
    }
}

/// Key of a tag count: (tag name, tag id)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagKey {
    pub name: String,
    pub id: Uuid,
}

/// Key of an author count: (author name, author id)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuthorKey {
    pub name: String,
    pub id: Uuid,
}

/// Posts whose title, body or any tag name contains `keyword`,
/// case-insensitively. Each post appears at most once.
pub fn search_all(posts: Vec<PostSummary>, keyword: &str) -> Vec<PostSummary> {
    let needle = keyword.to_lowercase();
    let mut seen = HashSet::new();

    posts
        .into_iter()
        .filter(|p| {
            p.post.title.to_lowercase().contains(&needle)
                || p.post.text.to_lowercase().contains(&needle)
                || p.tags.iter().any(|t| t.name.to_lowercase().contains(&needle))
        })
        .filter(|p| seen.insert(p.post.id))
        .collect()
}

pub fn filter(posts: Vec<PostSummary>, criteria: &PostFilter) -> Vec<PostSummary> {
    posts
        .into_iter()
        .filter(|p| {
            criteria.tags.is_empty() || p.tags.iter().any(|t| criteria.tags.contains(&t.id))
        })
        .filter(|p| criteria.authors.is_empty() || criteria.authors.contains(&p.post.user_id))
        .filter(|p| !criteria.private || p.post.private)
        .collect()
}

/// Sort in place; ties fall back to title so the order is total.
pub fn sort_by(posts: &mut [PostSummary], field: SortField) {
    posts.sort_by(|a, b| {
        let primary = match field {
            SortField::Title => Ordering::Equal,
            SortField::Comments => b.comment_count.cmp(&a.comment_count),
            SortField::Rating => b
                .average_rating
                .partial_cmp(&a.average_rating)
                .unwrap_or(Ordering::Equal),
            SortField::Author => a.author_name.cmp(&b.author_name),
        };
        primary.then_with(|| a.post.title.cmp(&b.post.title))
    });
}

/// Number of posts in `scope` per tag. A post with N tags contributes to N
/// entries.
pub fn count_posts_by_tags(scope: &[PostSummary]) -> BTreeMap<TagKey, i64> {
    let mut counts = BTreeMap::new();
    for post in scope {
        let distinct: HashSet<_> = post.tags.iter().collect();
        for tag in distinct {
            *counts
                .entry(TagKey {
                    name: tag.name.clone(),
                    id: tag.id,
                })
                .or_insert(0) += 1;
        }
    }
    counts
}

pub fn count_posts_by_authors(scope: &[PostSummary]) -> BTreeMap<AuthorKey, i64> {
    let mut counts = BTreeMap::new();
    for post in scope {
        *counts
            .entry(AuthorKey {
                name: post.author_name.clone(),
                id: post.post.user_id,
            })
            .or_insert(0) += 1;
    }
    counts
}

pub fn count_private_posts(scope: &[PostSummary]) -> i64 {
    scope.iter().filter(|p| p.post.private).count() as i64
}

/// Mean of `ratings`, or 0 when there are none.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
}

/// Parse a comma-separated list of UUIDs, ignoring empty segments.
pub fn parse_id_list(raw: &str, what: &str) -> Result<Vec<Uuid>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| AppError::BadRequest(format!("invalid {} id '{}'", what, s)))
        })
        .collect()
}

/// Form-style truthiness: "1", "true", "on", "yes".
pub fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}
