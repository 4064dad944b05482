//! Prometheus metrics for blog-service.
//!
//! Request, comment-lifecycle and authorization collectors, plus the
//! handler behind the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// HTTP requests by method, route pattern and status.
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_http_requests_total",
        "HTTP requests segmented by method, route and status",
        &["method", "route", "status"]
    )
    .expect("failed to register blog_http_requests_total");

    /// HTTP request latency by method and route pattern.
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "blog_http_request_duration_seconds",
        "HTTP request duration segmented by method and route",
        &["method", "route"]
    )
    .expect("failed to register blog_http_request_duration_seconds");

    /// Comment actions by action (create/edit/update/destroy) and outcome.
    pub static ref COMMENT_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_comment_actions_total",
        "Comment lifecycle actions segmented by action and outcome",
        &["action", "outcome"]
    )
    .expect("failed to register blog_comment_actions_total");

    /// Mutations blocked by ownership checks.
    pub static ref AUTHORIZATION_DENIALS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_authorization_denials_total",
        "Mutations blocked by ownership checks segmented by resource",
        &["resource"]
    )
    .expect("failed to register blog_authorization_denials_total");
}

pub fn record_comment_action(action: &str, outcome: &str) {
    COMMENT_ACTIONS_TOTAL
        .with_label_values(&[action, outcome])
        .inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
