//! Comment lifecycle: post scoping, ownership gate and the guest captcha
mod common;

use blog_service::error::AppError;
use blog_service::models::{CreateCommentInput, UpdateCommentInput, ANONYMOUS_AUTHOR};
use blog_service::services::StaticCaptchaVerifier;
use common::TestContext;
use uuid::Uuid;

fn input(text: &str, rating: i32) -> CreateCommentInput {
    CreateCommentInput {
        text: text.to_string(),
        rating,
        ..Default::default()
    }
}

#[tokio::test]
async fn author_can_edit_others_cannot() {
    let ctx = TestContext::new();
    let u = ctx.user("U").await;
    let v = ctx.user("V").await;
    let post = ctx.post(&u, "post", "body", &[]).await;

    let created = ctx
        .comments
        .create_comment(post.id, Some(u.id), input("mine", 4), None)
        .await
        .unwrap();
    assert_eq!(created.author_name, "U");
    let comment_id = created.comment.id;

    let denied = ctx
        .comments
        .edit_comment(post.id, comment_id, Some(v.id))
        .await
        .unwrap_err();
    assert!(matches!(denied, AppError::Forbidden(_)));

    let guest = ctx
        .comments
        .edit_comment(post.id, comment_id, None)
        .await
        .unwrap_err();
    assert!(matches!(guest, AppError::Forbidden(_)));

    let view = ctx
        .comments
        .edit_comment(post.id, comment_id, Some(u.id))
        .await
        .unwrap();
    assert_eq!(view.comment.text, "mine");
}

#[tokio::test]
async fn anonymous_comment_cannot_be_changed_by_anyone() {
    let ctx = TestContext::new();
    let u = ctx.user("U").await;
    let post = ctx.post(&u, "post", "body", &[]).await;
    let anonymous = ctx.comment(&post, None, 3).await;

    for identity in [None, Some(u.id)] {
        let err = ctx
            .comments
            .destroy_comment(post.id, anonymous.id, identity)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
    assert!(ctx.store_has_comment(anonymous.id).await);
}

#[tokio::test]
async fn update_applies_changes_and_validates() {
    let ctx = TestContext::new();
    let u = ctx.user("U").await;
    let post = ctx.post(&u, "post", "body", &[]).await;
    let comment = ctx.comment(&post, Some(&u), 2).await;

    let updated = ctx
        .comments
        .update_comment(
            post.id,
            comment.id,
            Some(u.id),
            UpdateCommentInput {
                text: Some("better".into()),
                rating: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.comment.text, "better");
    assert_eq!(updated.comment.rating, 5);

    let invalid = ctx
        .comments
        .update_comment(
            post.id,
            comment.id,
            Some(u.id),
            UpdateCommentInput {
                rating: Some(9),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(invalid, AppError::ValidationError(_)));
}

#[tokio::test]
async fn updated_user_name_is_trimmed_and_blank_is_ignored() {
    let ctx = TestContext::new();
    let u = ctx.user("U").await;
    let post = ctx.post(&u, "post", "body", &[]).await;
    let comment = ctx.comment(&post, Some(&u), 2).await;

    let rename = |user_name: &str| UpdateCommentInput {
        user_name: Some(user_name.to_string()),
        ..Default::default()
    };

    let updated = ctx
        .comments
        .update_comment(post.id, comment.id, Some(u.id), rename("  Zed  "))
        .await
        .unwrap();
    assert_eq!(updated.comment.user_name.as_deref(), Some("Zed"));

    let unchanged = ctx
        .comments
        .update_comment(post.id, comment.id, Some(u.id), rename("   "))
        .await
        .unwrap();
    assert_eq!(unchanged.comment.user_name.as_deref(), Some("Zed"));
}

#[tokio::test]
async fn author_destroys_own_comment() {
    let ctx = TestContext::new();
    let u = ctx.user("U").await;
    let post = ctx.post(&u, "post", "body", &[]).await;
    let comment = ctx.comment(&post, Some(&u), 2).await;

    let removed = ctx
        .comments
        .destroy_comment(post.id, comment.id, Some(u.id))
        .await
        .unwrap();
    assert_eq!(removed.id, comment.id);
    assert!(!ctx.store_has_comment(comment.id).await);
}

#[tokio::test]
async fn comment_is_scoped_to_its_post() {
    let ctx = TestContext::new();
    let u = ctx.user("U").await;
    let first = ctx.post(&u, "first", "body", &[]).await;
    let second = ctx.post(&u, "second", "body", &[]).await;
    let comment = ctx.comment(&first, Some(&u), 4).await;

    let err = ctx
        .comments
        .edit_comment(second.id, comment.id, Some(u.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = ctx
        .comments
        .create_comment(Uuid::new_v4(), Some(u.id), input("hi", 3), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn guest_needs_a_verified_captcha() {
    let ctx = TestContext::new();
    let u = ctx.user("U").await;
    let post = ctx.post(&u, "post", "body", &[]).await;

    let no_token = ctx
        .comments
        .create_comment(post.id, None, input("hello", 3), None)
        .await
        .unwrap_err();
    assert!(matches!(no_token, AppError::Forbidden(_)));

    let rejected = ctx
        .comments
        .create_comment(
            post.id,
            None,
            CreateCommentInput {
                captcha_token: Some("bot".into()),
                ..input("hello", 3)
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(rejected, AppError::Forbidden(_)));
}

#[tokio::test]
async fn verified_guest_comment_is_anonymous() {
    let ctx = TestContext::with_captcha(StaticCaptchaVerifier::accepting());
    let u = ctx.user("U").await;
    let post = ctx.post(&u, "post", "body", &[]).await;

    let named = ctx
        .comments
        .create_comment(
            post.id,
            None,
            CreateCommentInput {
                user_name: Some("Visitor".into()),
                captcha_token: Some("human".into()),
                ..input("hello", 5)
            },
            Some("203.0.113.9"),
        )
        .await
        .unwrap();
    assert_eq!(named.comment.user_id, None);
    assert_eq!(named.author_name, "Visitor");

    let unnamed = ctx
        .comments
        .create_comment(
            post.id,
            None,
            CreateCommentInput {
                captcha_token: Some("human".into()),
                ..input("again", 1)
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(unnamed.author_name, ANONYMOUS_AUTHOR);
}

#[tokio::test]
async fn invalid_comment_is_not_stored() {
    let ctx = TestContext::new();
    let u = ctx.user("U").await;
    let post = ctx.post(&u, "post", "body", &[]).await;

    for bad in [input("  ", 3), input("ok", 0), input("ok", 6)] {
        let err = ctx
            .comments
            .create_comment(post.id, Some(u.id), bad, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    let details = ctx.posts.get_post_details(post.id).await.unwrap();
    assert!(details.comments.is_empty());
}
