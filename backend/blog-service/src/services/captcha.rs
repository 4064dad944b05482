/// Anti-automation check for guest comments
///
/// `RecaptchaVerifier` asks Google's `siteverify` endpoint; `StaticCaptchaVerifier`
/// returns a fixed answer and backs local runs and tests.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Returns `Ok(true)` when the token proves a human submitted the form.
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct RecaptchaVerifier {
    secret: String,
    verify_url: String,
    http_client: reqwest::Client,
}

impl RecaptchaVerifier {
    pub fn new(secret: String, verify_url: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("failed to build captcha HTTP client")?;

        Ok(Self {
            secret,
            verify_url,
            http_client,
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool> {
        if token.trim().is_empty() {
            return Ok(false);
        }

        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response = self
            .http_client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| anyhow!("captcha verify request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("captcha verify returned {}", status));
        }

        let body: SiteVerifyResponse = response
            .json()
            .await
            .context("failed to parse captcha verify response")?;

        if !body.success {
            tracing::debug!(error_codes = ?body.error_codes, "captcha rejected");
        }
        Ok(body.success)
    }
}

/// Verifier with a fixed verdict, used when captcha checks are disabled.
#[derive(Debug, Clone, Copy)]
pub struct StaticCaptchaVerifier {
    verdict: bool,
}

impl StaticCaptchaVerifier {
    pub fn accepting() -> Self {
        Self { verdict: true }
    }

    pub fn rejecting() -> Self {
        Self { verdict: false }
    }
}

#[async_trait]
impl CaptchaVerifier for StaticCaptchaVerifier {
    async fn verify(&self, token: &str, _remote_ip: Option<&str>) -> Result<bool> {
        Ok(self.verdict && !token.trim().is_empty())
    }
}
