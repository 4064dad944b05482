/// Health endpoints for container probes
use crate::db::BlogStore;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub struct HealthState {
    store: Arc<dyn BlogStore>,
}

impl HealthState {
    pub fn new(store: Arc<dyn BlogStore>) -> Self {
        Self { store }
    }
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    store: &'static str,
    latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: String,
}

pub async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.store.health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "blog-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("store check failed: {}", e),
            "service": "blog-service"
        })),
    }
}

pub async fn readiness_check(state: web::Data<HealthState>) -> HttpResponse {
    let start = Instant::now();
    let result = state.store.health_check().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let response = ReadinessResponse {
        ready: result.is_ok(),
        store: if result.is_ok() { "healthy" } else { "unhealthy" },
        latency_ms,
        error: result.err().map(|e| e.to_string()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if response.ready {
        HttpResponse::Ok().json(response)
    } else {
        tracing::warn!(error = ?response.error, "readiness check failed");
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

/// Register `/health`, `/health/ready`, `/health/live` and `/metrics`.
pub fn configure_health(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_summary))
        .route("/health/ready", web::get().to(readiness_check))
        .route("/health/live", web::get().to(liveness_check))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics));
}
