/// Blog Service Library
///
/// Posts with tags, pictures and rated comments, served as a JSON API:
/// keyword search, filtering, sorting and facet counts over posts, plus the
/// comment lifecycle behind an ownership check.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route registration
/// - `models`: Data structures for users, posts, tags, pictures, comments
/// - `query`: Search, filter, sort and count semantics over posts
/// - `services`: Business logic layer
/// - `db`: Persistence trait with PostgreSQL and in-memory stores
/// - `middleware`: Identity extraction, request metrics, ownership checks
/// - `auth`: Bearer token validation
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod query;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
