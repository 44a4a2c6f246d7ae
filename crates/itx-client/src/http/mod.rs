//! HTTPS front door
//!
//! Verifies signed deliveries, answers pings, and hands everything else to the
//! dispatcher, returning the initial response as the HTTP body when the
//! handler produces it in time.

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

use axum::Router;
use itx_common::HttpConfig;

pub use response::{ApiError, ApiResult};
pub use state::HttpState;

/// Build the complete router with middleware and state
pub fn create_app(state: HttpState, config: &HttpConfig) -> Router {
    let router = routes::create_router(&config.path, config.max_body_bytes);
    let router = middleware::apply_middleware(router);
    router.with_state(state)
}
