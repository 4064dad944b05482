/// HTTP middleware utilities for blog-service
///
/// Provides optional JWT identity extraction (with first-sight user
/// provisioning), request metrics, and the ownership checks used before
/// mutating posts and comments.
pub mod permissions;

pub use permissions::*;

use crate::auth::JwtValidator;
use crate::db::BlogStore;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use crate::models::NewUser;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

// =====================================================================
// Identity
// =====================================================================

/// Authenticated user identifier stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

/// The acting identity of a request; `None` for guests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub Option<UserId>);

impl Identity {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.map(|id| id.0)
    }
}

/// Actix middleware that resolves a Bearer token into a `UserId`.
///
/// Requests without an Authorization header pass through as guests; a header
/// that is present but invalid is rejected with 401. A valid token whose
/// subject has no user row yet gets one before the request proceeds.
pub struct IdentityMiddleware {
    validator: Arc<JwtValidator>,
    users: Arc<dyn BlogStore>,
}

impl IdentityMiddleware {
    pub fn new(validator: Arc<JwtValidator>, users: Arc<dyn BlogStore>) -> Self {
        Self { validator, users }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            validator: self.validator.clone(),
            users: self.users.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    validator: Arc<JwtValidator>,
    users: Arc<dyn BlogStore>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let validator = self.validator.clone();
        let users = self.users.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get("Authorization")
                .map(|h| h.to_str().unwrap_or_default().to_string());

            if let Some(header) = header {
                let token = header
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

                let identity = validator.identify(token).map_err(|e| {
                    tracing::debug!(error = %e, "rejected bearer token");
                    AppError::Unauthorized("Invalid or expired token".into())
                })?;
                let user_id = identity.user_id;

                users
                    .ensure_user(NewUser::new(user_id, identity.name, identity.email))
                    .await
                    .map_err(|e| {
                        tracing::warn!(%user_id, error = %e, "failed to provision user");
                        e
                    })?;

                req.extensions_mut().insert(UserId(user_id));
            }

            service.call(req).await
        })
    }
}

impl FromRequest for UserId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .copied()
                .ok_or_else(|| AppError::Unauthorized("sign in required".into())),
        )
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Ok(Identity(req.extensions().get::<UserId>().copied())))
    }
}

// =====================================================================
// Metrics middleware
// =====================================================================

pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let path = req.path().to_string();
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let res = service.call(req).await;
            let elapsed = start.elapsed();

            let (route, status) = match &res {
                Ok(res) => (
                    res.request()
                        .match_pattern()
                        .unwrap_or_else(|| "unmatched".to_string()),
                    res.status().as_u16().to_string(),
                ),
                Err(err) => (
                    "unmatched".to_string(),
                    err.as_response_error().status_code().as_u16().to_string(),
                ),
            };

            HTTP_REQUESTS_TOTAL
                .with_label_values(&[&method, &route, &status])
                .inc();
            HTTP_REQUEST_DURATION_SECONDS
                .with_label_values(&[&method, &route])
                .observe(elapsed.as_secs_f64());

            tracing::debug!(%method, %path, %status, elapsed_ms = elapsed.as_millis() as u64, "request completed");
            res
        })
    }
}
