/// Bearer token validation for the identity collaborator
///
/// Tokens are HS256 JWTs whose `sub` claim is the user's UUID. Optional
/// `name` and `email` claims seed the local user row the first time a subject
/// is seen. The service only validates tokens; issuing is exposed for tooling
/// and tests.
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Who a validated token speaks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
}

pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate a token (without the "Bearer " prefix) and return the user ID.
    pub fn validate(&self, token: &str) -> Result<Uuid> {
        Ok(self.identify(token)?.user_id)
    }

    /// Validate a token and return the subject with its profile claims.
    pub fn identify(&self, token: &str) -> Result<TokenIdentity> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| anyhow!("Token validation failed: {e}"))?;
        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|e| anyhow!("Invalid user ID in token: {e}"))?;

        Ok(TokenIdentity {
            user_id,
            name: non_blank(data.claims.name),
            email: non_blank(data.claims.email),
        })
    }

    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String> {
        self.issue_with_profile(user_id, None, None, ttl)
    }

    pub fn issue_with_profile(
        &self,
        user_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        };
        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Token encoding failed: {e}"))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
