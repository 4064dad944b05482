/// Comment handlers - HTTP endpoints for the comment lifecycle under a post
use crate::error::Result;
use crate::middleware::Identity;
use crate::models::{CreateCommentInput, UpdateCommentInput};
use crate::services::CommentService;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

/// Header carrying the captcha token when it is not in the body
pub const CAPTCHA_HEADER: &str = "X-Captcha-Token";

/// Acknowledgement naming the action that was performed
#[derive(Debug, Serialize)]
pub struct CommentAck<T: Serialize> {
    pub action: &'static str,
    pub comment: T,
}

pub async fn create_comment(
    service: web::Data<CommentService>,
    identity: Identity,
    post_id: web::Path<Uuid>,
    http_req: HttpRequest,
    req: web::Json<CreateCommentInput>,
) -> Result<HttpResponse> {
    let mut input = req.into_inner();
    if input.captcha_token.is_none() {
        input.captcha_token = http_req
            .headers()
            .get(CAPTCHA_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }

    let remote_ip = http_req
        .connection_info()
        .realip_remote_addr()
        .map(str::to_string);
    let comment = service
        .create_comment(
            post_id.into_inner(),
            identity.user_id(),
            input,
            remote_ip.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Created().json(CommentAck {
        action: "create",
        comment,
    }))
}

pub async fn edit_comment(
    service: web::Data<CommentService>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = service
        .edit_comment(post_id, comment_id, identity.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(CommentAck {
        action: "edit",
        comment,
    }))
}

pub async fn update_comment(
    service: web::Data<CommentService>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
    req: web::Json<UpdateCommentInput>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = service
        .update_comment(post_id, comment_id, identity.user_id(), req.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(CommentAck {
        action: "update",
        comment,
    }))
}

pub async fn destroy_comment(
    service: web::Data<CommentService>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = service
        .destroy_comment(post_id, comment_id, identity.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(CommentAck {
        action: "destroy",
        comment,
    }))
}
