/// Business logic layer for blog-service
///
/// This module provides high-level operations:
/// - Post service: post lifecycle, listings, facets, tag catalogue
/// - Comment service: comment lifecycle behind the ownership gate
/// - Captcha: anti-automation check for guest comments
pub mod captcha;
pub mod comments;
pub mod posts;

pub use captcha::{CaptchaVerifier, RecaptchaVerifier, StaticCaptchaVerifier};
pub use comments::CommentService;
pub use posts::{FacetCount, PostFacets, PostService};
