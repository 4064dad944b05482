use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use blog_service::auth::JwtValidator;
use blog_service::config::{Config, StoreBackend};
use blog_service::db::{create_pool, run_migrations, BlogStore, MemoryBlogStore, PgBlogStore};
use blog_service::handlers::{self, HealthState};
use blog_service::services::{
    CaptchaVerifier, CommentService, PostService, RecaptchaVerifier, StaticCaptchaVerifier,
};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
        }
    }
}

async fn build_store(config: &Config) -> io::Result<Arc<dyn BlogStore>> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryBlogStore::new()))
        }
        StoreBackend::Postgres => {
            config.database.log_config();
            let pool = create_pool(&config.database).await.map_err(|e| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("Failed to create database pool: {e}"),
                )
            })?;
            run_migrations(&pool).await.map_err(|e| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("Failed to run migrations: {e}"),
                )
            })?;
            tracing::info!("Connected to database, migrations applied");
            Ok(Arc::new(PgBlogStore::new(pool)))
        }
    }
}

fn build_captcha(config: &Config) -> io::Result<Arc<dyn CaptchaVerifier>> {
    if !config.captcha.enabled {
        tracing::warn!("Captcha disabled; any non-blank guest token is accepted");
        return Ok(Arc::new(StaticCaptchaVerifier::accepting()));
    }

    let verifier = RecaptchaVerifier::new(
        config.captcha.secret.clone(),
        config.captcha.verify_url.clone(),
    )
    .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{e:#}")))?;
    Ok(Arc::new(verifier))
}

/// Blog Service
///
/// # Routes
///
/// - `/api/v1/posts/*` - Search, facets, create, read, update, delete posts
/// - `/api/v1/posts/{post_id}/comments/*` - Comment lifecycle
/// - `/api/v1/tags` - Tag catalogue
/// - `/health`, `/health/ready`, `/health/live`, `/metrics`
#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize tracing; LOG_FORMAT=json for structured output
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json().with_target(false)))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(env = %config.app.env, store = ?config.store, "Environment");

    let store = build_store(&config).await?;
    let captcha = build_captcha(&config)?;
    let validator = Arc::new(JwtValidator::new(&config.auth.jwt_secret));

    let post_service = web::Data::new(PostService::new(store.clone()));
    let comment_service = web::Data::new(CommentService::new(store.clone(), captcha));
    let health_state = web::Data::new(HealthState::new(store.clone()));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        let validator = validator.clone();
        let users = store.clone();
        App::new()
            .app_data(post_service.clone())
            .app_data(comment_service.clone())
            .app_data(health_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure_health)
            .configure(move |cfg| handlers::configure_routes(cfg, validator, users))
    })
    .bind(&bind_address)?
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Ok(())) => tracing::info!("HTTP server stopped"),
                Ok(Err(e)) => {
                    tracing::error!("HTTP server error: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("HTTP server task join error: {}", e);
                    return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
                }
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
        }
    }

    tracing::info!("blog-service shutting down");
    Ok(())
}
