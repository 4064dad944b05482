/// Tag handlers - HTTP endpoints for the tag catalogue
use crate::error::Result;
use crate::middleware::UserId;
use crate::models::CreateTagInput;
use crate::services::PostService;
use actix_web::{web, HttpResponse};

pub async fn list_tags(service: web::Data<PostService>) -> Result<HttpResponse> {
    let tags = service.list_tags().await?;
    Ok(HttpResponse::Ok().json(tags))
}

pub async fn create_tag(
    service: web::Data<PostService>,
    _user_id: UserId,
    req: web::Json<CreateTagInput>,
) -> Result<HttpResponse> {
    let tag = service.create_tag(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(tag))
}
