/// Post handlers - HTTP endpoints for post operations
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::{CreatePostInput, PostSummary, UpdatePostInput};
use crate::query::{is_truthy, parse_id_list, PostFilter, PostQuery, SortField};
use crate::services::PostService;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query string of the list and facet endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsParams {
    /// Keyword matched against title, body and tag names
    pub q: Option<String>,
    /// Comma-separated tag ids
    pub tags: Option<String>,
    /// Comma-separated user ids
    pub authors: Option<String>,
    pub private: Option<String>,
    pub sort: Option<String>,
}

impl TryFrom<ListPostsParams> for PostQuery {
    type Error = AppError;

    fn try_from(params: ListPostsParams) -> std::result::Result<Self, Self::Error> {
        let tags = match params.tags.as_deref() {
            Some(raw) => parse_id_list(raw, "tags")?,
            None => Vec::new(),
        };
        let authors = match params.authors.as_deref() {
            Some(raw) => parse_id_list(raw, "authors")?,
            None => Vec::new(),
        };
        let sort = params
            .sort
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<SortField>)
            .transpose()?;

        Ok(PostQuery {
            search: params.q,
            filter: PostFilter {
                tags,
                authors,
                private: params.private.as_deref().is_some_and(is_truthy),
            },
            sort,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct PostAck {
    pub action: &'static str,
    pub post_id: Uuid,
}

/// Search, filter and sort posts
pub async fn list_posts(
    service: web::Data<PostService>,
    params: web::Query<ListPostsParams>,
) -> Result<HttpResponse> {
    let query = PostQuery::try_from(params.into_inner())?;
    let posts = service.list_posts(&query).await?;

    Ok(HttpResponse::Ok().json(PostListResponse {
        total: posts.len(),
        posts,
    }))
}

/// Counts by tag, author and private flag for the same scope as the list
pub async fn post_facets(
    service: web::Data<PostService>,
    params: web::Query<ListPostsParams>,
) -> Result<HttpResponse> {
    let scope = PostQuery::try_from(params.into_inner())?;
    let facets = service.facets(&scope).await?;
    Ok(HttpResponse::Ok().json(facets))
}

pub async fn create_post(
    service: web::Data<PostService>,
    user_id: UserId,
    req: web::Json<CreatePostInput>,
) -> Result<HttpResponse> {
    let post = service.create_post(user_id.0, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

pub async fn get_post(
    service: web::Data<PostService>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let details = service.get_post_details(post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(details))
}

pub async fn update_post(
    service: web::Data<PostService>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
    req: web::Json<UpdatePostInput>,
) -> Result<HttpResponse> {
    let post = service
        .update_post(user_id.0, post_id.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn delete_post(
    service: web::Data<PostService>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    service.delete_post(user_id.0, post_id).await?;
    Ok(HttpResponse::Ok().json(PostAck {
        action: "destroy",
        post_id,
    }))
}
