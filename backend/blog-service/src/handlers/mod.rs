/// HTTP handlers for blog-related endpoints
///
/// This module contains handlers for:
/// - Posts: search/filter/sort listings, facets, create, show, update, delete
/// - Comments: create, edit, update, destroy under a post
/// - Tags: list and create
/// - Health: liveness/readiness probes and metrics
pub mod comments;
pub mod health;
pub mod posts;
pub mod tags;

pub use comments::{create_comment, destroy_comment, edit_comment, update_comment};
pub use health::{configure_health, HealthState};
pub use posts::{create_post, delete_post, get_post, list_posts, post_facets, update_post};
pub use tags::{create_tag, list_tags};

use crate::auth::JwtValidator;
use crate::db::BlogStore;
use crate::error::AppError;
use crate::middleware::{IdentityMiddleware, MetricsMiddleware};
use actix_web::web;
use std::sync::Arc;

/// Register the `/api/v1` routes.
///
/// Services (`PostService`, `CommentService`) must be registered as app data
/// by the caller. `users` receives first-sight user rows for token subjects.
pub fn configure_routes(
    cfg: &mut web::ServiceConfig,
    validator: Arc<JwtValidator>,
    users: Arc<dyn BlogStore>,
) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api/v1")
            .wrap(IdentityMiddleware::new(validator, users))
            .wrap(MetricsMiddleware)
            .service(
                web::scope("/posts")
                    .service(
                        web::resource("")
                            .route(web::get().to(list_posts))
                            .route(web::post().to(create_post)),
                    )
                    .route("/facets", web::get().to(post_facets))
                    .service(
                        web::resource("/{post_id}")
                            .route(web::get().to(get_post))
                            .route(web::patch().to(update_post))
                            .route(web::delete().to(delete_post)),
                    )
                    .route("/{post_id}/comments", web::post().to(create_comment))
                    .route(
                        "/{post_id}/comments/{comment_id}/edit",
                        web::get().to(edit_comment),
                    )
                    .service(
                        web::resource("/{post_id}/comments/{comment_id}")
                            .route(web::patch().to(update_comment))
                            .route(web::delete().to(destroy_comment)),
                    ),
            )
            .service(
                web::resource("/tags")
                    .route(web::get().to(list_tags))
                    .route(web::post().to(create_tag)),
            ),
    );
}
