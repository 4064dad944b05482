//! Shared fixtures for blog-service integration tests
//!
//! Builds the services over an in-memory store, mints bearer tokens, and
//! seeds users, tags, posts and comments.
#![allow(dead_code)]

use actix_web::body::BoxBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use blog_service::auth::JwtValidator;
use blog_service::db::{BlogStore, MemoryBlogStore};
use blog_service::handlers::{configure_health, configure_routes, HealthState};
use blog_service::models::{Comment, CreatePostInput, NewComment, Post, Tag, User};
use blog_service::services::{
    CaptchaVerifier, CommentService, PostService, StaticCaptchaVerifier,
};
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestContext {
    pub store: Arc<MemoryBlogStore>,
    pub posts: web::Data<PostService>,
    pub comments: web::Data<CommentService>,
    pub health: web::Data<HealthState>,
    pub validator: Arc<JwtValidator>,
}

impl TestContext {
    /// Guests are turned away unless a test opts into an accepting captcha.
    pub fn new() -> Self {
        Self::with_captcha(StaticCaptchaVerifier::rejecting())
    }

    pub fn with_captcha(captcha: impl CaptchaVerifier + 'static) -> Self {
        let store = Arc::new(MemoryBlogStore::new());
        let dyn_store: Arc<dyn BlogStore> = store.clone();

        Self {
            posts: web::Data::new(PostService::new(dyn_store.clone())),
            comments: web::Data::new(CommentService::new(dyn_store.clone(), Arc::new(captcha))),
            health: web::Data::new(HealthState::new(dyn_store)),
            validator: Arc::new(JwtValidator::new(JWT_SECRET)),
            store,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let validator = self.validator.clone();
        let users: Arc<dyn BlogStore> = self.store.clone();
        App::new()
            .app_data(self.posts.clone())
            .app_data(self.comments.clone())
            .app_data(self.health.clone())
            .configure(configure_health)
            .configure(move |cfg| configure_routes(cfg, validator, users))
    }

    pub fn token(&self, user_id: Uuid) -> String {
        self.validator
            .issue(user_id, Duration::hours(1))
            .expect("issue token")
    }

    pub fn bearer(&self, user_id: Uuid) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token(user_id)))
    }

    /// Bearer header for a subject the store has never seen, carrying a name claim.
    pub fn bearer_with_name(&self, user_id: Uuid, name: &str) -> (&'static str, String) {
        let token = self
            .validator
            .issue_with_profile(user_id, Some(name), None, Duration::hours(1))
            .expect("issue token");
        ("Authorization", format!("Bearer {}", token))
    }

    pub async fn user(&self, name: &str) -> User {
        self.store
            .create_user(name, &format!("{}@example.com", name.to_lowercase()))
            .await
            .expect("create user")
    }

    pub async fn tag(&self, name: &str) -> Tag {
        self.store.create_tag(name).await.expect("create tag")
    }

    pub async fn post(&self, owner: &User, title: &str, text: &str, tags: &[&Tag]) -> Post {
        self.post_with(owner, title, text, tags, false).await
    }

    pub async fn private_post(&self, owner: &User, title: &str, tags: &[&Tag]) -> Post {
        self.post_with(owner, title, "private body", tags, true).await
    }

    async fn post_with(
        &self,
        owner: &User,
        title: &str,
        text: &str,
        tags: &[&Tag],
        private: bool,
    ) -> Post {
        self.posts
            .create_post(
                owner.id,
                CreatePostInput {
                    title: title.to_string(),
                    text: text.to_string(),
                    private,
                    tag_ids: tags.iter().map(|t| t.id).collect(),
                    pictures: Vec::new(),
                },
            )
            .await
            .expect("create post")
    }

    /// Insert a comment directly, bypassing the captcha gate.
    pub async fn comment(&self, post: &Post, author: Option<&User>, rating: i32) -> Comment {
        self.store
            .create_comment(NewComment {
                post_id: post.id,
                user_id: author.map(|u| u.id),
                user_name: None,
                text: format!("rated {}", rating),
                rating,
            })
            .await
            .expect("create comment")
    }

    pub async fn store_user(&self, user_id: Uuid) -> User {
        self.store
            .get_user(user_id)
            .await
            .expect("get user")
            .expect("user row")
    }

    pub async fn store_has_comment(&self, comment_id: Uuid) -> bool {
        self.store
            .get_comment(comment_id)
            .await
            .expect("get comment")
            .is_some()
    }
}
