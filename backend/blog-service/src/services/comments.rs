/// Comment service - create/edit/update/destroy of comments scoped to a post
///
/// Every action resolves the post and the comment first, so a comment
/// addressed through the wrong post is reported as not found.
use crate::db::BlogStore;
use crate::error::{AppError, Result};
use crate::metrics::record_comment_action;
use crate::middleware::check_comment_ownership;
use crate::models::{Comment, CommentView, CreateCommentInput, NewComment, UpdateCommentInput};
use crate::services::captcha::CaptchaVerifier;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct CommentService {
    store: Arc<dyn BlogStore>,
    captcha: Arc<dyn CaptchaVerifier>,
}

impl CommentService {
    pub fn new(store: Arc<dyn BlogStore>, captcha: Arc<dyn CaptchaVerifier>) -> Self {
        Self { store, captcha }
    }

    /// Create a comment on a post.
    ///
    /// Signed-in users skip the captcha; guests must present a token that
    /// the verifier accepts.
    pub async fn create_comment(
        &self,
        post_id: Uuid,
        current_user: Option<Uuid>,
        input: CreateCommentInput,
        remote_ip: Option<&str>,
    ) -> Result<CommentView> {
        let result = self
            .create_inner(post_id, current_user, input, remote_ip)
            .await;
        record_comment_action("create", outcome(&result));
        result
    }

    /// The comment as stored, for its author to edit
    pub async fn edit_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        current_user: Option<Uuid>,
    ) -> Result<CommentView> {
        let result: Result<CommentView> = async {
            let comment = self.find_comment(post_id, comment_id).await?;
            check_comment_ownership(current_user, &comment)?;
            self.view(comment).await
        }
        .await;
        record_comment_action("edit", outcome(&result));
        result
    }

    pub async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        current_user: Option<Uuid>,
        input: UpdateCommentInput,
    ) -> Result<CommentView> {
        let result: Result<CommentView> = async {
            let comment = self.find_comment(post_id, comment_id).await?;
            check_comment_ownership(current_user, &comment)?;
            input.validate()?;
            let input = UpdateCommentInput {
                user_name: display_name(input.user_name),
                ..input
            };

            let updated = self
                .store
                .update_comment(comment.id, &input)
                .await?
                .ok_or_else(|| comment_not_found(comment_id))?;

            tracing::info!(%post_id, %comment_id, "comment updated");
            self.view(updated).await
        }
        .await;
        record_comment_action("update", outcome(&result));
        result
    }

    pub async fn destroy_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        current_user: Option<Uuid>,
    ) -> Result<Comment> {
        let result: Result<Comment> = async {
            let comment = self.find_comment(post_id, comment_id).await?;
            check_comment_ownership(current_user, &comment)?;

            if !self.store.delete_comment(comment.id).await? {
                return Err(comment_not_found(comment_id));
            }

            tracing::info!(%post_id, %comment_id, "comment destroyed");
            Ok(comment)
        }
        .await;
        record_comment_action("destroy", outcome(&result));
        result
    }

    async fn create_inner(
        &self,
        post_id: Uuid,
        current_user: Option<Uuid>,
        input: CreateCommentInput,
        remote_ip: Option<&str>,
    ) -> Result<CommentView> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {} not found", post_id)))?;

        if current_user.is_none() {
            self.verify_guest(input.captcha_token.as_deref(), remote_ip)
                .await?;
        }

        input.validate()?;

        let comment = self
            .store
            .create_comment(NewComment {
                post_id,
                user_id: current_user,
                user_name: display_name(input.user_name),
                text: input.text,
                rating: input.rating,
            })
            .await?;

        tracing::info!(
            %post_id,
            comment_id = %comment.id,
            user_id = ?current_user,
            "comment created"
        );
        self.view(comment).await
    }

    async fn verify_guest(&self, token: Option<&str>, remote_ip: Option<&str>) -> Result<()> {
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            return Err(AppError::Forbidden(
                "sign in or complete the captcha to comment".into(),
            ));
        };

        match self.captcha.verify(token, remote_ip).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::Forbidden("captcha verification failed".into())),
            Err(e) => {
                tracing::warn!(error = %e, "captcha verifier unavailable");
                Err(AppError::Forbidden(
                    "captcha could not be verified, try again later".into(),
                ))
            }
        }
    }

    async fn find_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Comment> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {} not found", post_id)))?;

        self.store
            .get_comment(comment_id)
            .await?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| comment_not_found(comment_id))
    }

    async fn view(&self, comment: Comment) -> Result<CommentView> {
        let owner = match comment.user_id {
            Some(user_id) => self.store.get_user(user_id).await?,
            None => None,
        };
        Ok(CommentView::new(comment, owner.as_ref()))
    }
}

/// Trimmed free-text author name; blank names count as absent.
fn display_name(raw: Option<String>) -> Option<String> {
    raw.map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn comment_not_found(comment_id: Uuid) -> AppError {
    AppError::NotFound(format!("comment {} not found", comment_id))
}

fn outcome<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AppError::Forbidden(_)) | Err(AppError::Unauthorized(_)) => "denied",
        Err(AppError::ValidationError(_)) | Err(AppError::BadRequest(_)) => "invalid",
        Err(AppError::NotFound(_)) => "not_found",
        Err(_) => "error",
    }
}
