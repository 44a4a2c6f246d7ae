//! Route definitions

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::handlers;
use super::state::HttpState;

/// Interaction endpoint at `path` with a bounded body, plus the health route
pub fn create_router(path: &str, max_body_bytes: usize) -> Router<HttpState> {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    Router::new()
        .route(&path, post(handlers::interaction_endpoint))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .merge(health_routes())
}

pub fn health_routes() -> Router<HttpState> {
    Router::new().route("/health", get(handlers::health_check))
}
