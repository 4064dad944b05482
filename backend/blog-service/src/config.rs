/// Configuration management for Blog Service
///
/// Configuration is read from environment variables; `main` loads a `.env`
/// file first when one is present.
use crate::db::DbConfig;
use crate::services::captcha::DEFAULT_VERIFY_URL;
use std::fmt;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Which store backs the service
    pub store: StoreBackend,
    /// Database configuration (used by the postgres backend)
    pub database: DbConfig,
    pub auth: AuthConfig,
    pub captcha: CaptchaConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!(
                "STORE_BACKEND must be 'postgres' or 'memory', got '{}'",
                other
            )),
        }
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone)]
pub struct CaptchaConfig {
    /// When false, guest comments are checked by a verifier that accepts any
    /// non-blank token
    pub enabled: bool,
    pub secret: String,
    pub verify_url: String,
}

impl fmt::Debug for CaptchaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptchaConfig")
            .field("enabled", &self.enabled)
            .field("secret", &"[REDACTED]")
            .field("verify_url", &self.verify_url)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let store = match std::env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("BLOG_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("BLOG_SERVICE_PORT", 8080)?,
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            store,
            database: {
                let defaults = DbConfig::default();
                DbConfig {
                    database_url: std::env::var("DATABASE_URL")
                        .unwrap_or_else(|_| "postgresql://localhost/blog".to_string()),
                    max_connections: parse_env_or_default(
                        "DATABASE_MAX_CONNECTIONS",
                        defaults.max_connections,
                    )?,
                    min_connections: parse_env_or_default(
                        "DATABASE_MIN_CONNECTIONS",
                        defaults.min_connections,
                    )?,
                    connect_timeout_secs: parse_env_or_default(
                        "DATABASE_CONNECT_TIMEOUT_SECS",
                        defaults.connect_timeout_secs,
                    )?,
                    acquire_timeout_secs: parse_env_or_default(
                        "DATABASE_ACQUIRE_TIMEOUT_SECS",
                        defaults.acquire_timeout_secs,
                    )?,
                    idle_timeout_secs: parse_env_or_default(
                        "DATABASE_IDLE_TIMEOUT_SECS",
                        defaults.idle_timeout_secs,
                    )?,
                    max_lifetime_secs: parse_env_or_default(
                        "DATABASE_MAX_LIFETIME_SECS",
                        defaults.max_lifetime_secs,
                    )?,
                }
            },
            auth: {
                let jwt_secret = match std::env::var("JWT_SECRET") {
                    Ok(value) if !value.trim().is_empty() => value,
                    _ if production => {
                        return Err("JWT_SECRET must be set in production".to_string())
                    }
                    _ => "dev-only-jwt-secret".to_string(),
                };
                AuthConfig { jwt_secret }
            },
            captcha: {
                let enabled = parse_env_or_default("CAPTCHA_ENABLED", production)?;
                let secret = std::env::var("RECAPTCHA_SECRET_KEY").unwrap_or_default();
                if enabled && secret.trim().is_empty() {
                    return Err(
                        "RECAPTCHA_SECRET_KEY must be set when CAPTCHA_ENABLED is true".to_string(),
                    );
                }

                CaptchaConfig {
                    enabled,
                    secret,
                    verify_url: std::env::var("RECAPTCHA_VERIFY_URL")
                        .unwrap_or_else(|_| DEFAULT_VERIFY_URL.to_string()),
                }
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "STORE_BACKEND",
        "CORS_ALLOWED_ORIGINS",
        "JWT_SECRET",
        "CAPTCHA_ENABLED",
        "RECAPTCHA_SECRET_KEY",
        "BLOG_SERVICE_PORT",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn development_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();

        assert_eq!(config.app.port, 8080);
        assert_eq!(config.store, StoreBackend::Postgres);
        assert!(!config.captcha.enabled);
        assert!(!config.auth.jwt_secret.is_empty());
    }

    #[test]
    #[serial]
    fn production_requires_secrets() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://blog.example.com");
        assert!(Config::from_env().unwrap_err().contains("JWT_SECRET"));

        std::env::set_var("JWT_SECRET", "s3cret");
        assert!(Config::from_env()
            .unwrap_err()
            .contains("RECAPTCHA_SECRET_KEY"));

        std::env::set_var("RECAPTCHA_SECRET_KEY", "captcha");
        let config = Config::from_env().unwrap();
        assert!(config.captcha.enabled);
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_unknown_backend_and_bad_port() {
        clear_env();
        std::env::set_var("STORE_BACKEND", "sqlite");
        assert!(Config::from_env().is_err());

        clear_env();
        std::env::set_var("BLOG_SERVICE_PORT", "eighty");
        assert!(Config::from_env().is_err());
        clear_env();
    }
}
