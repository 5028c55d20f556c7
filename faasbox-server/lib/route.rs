//! Router configuration for the faasbox server.
//!
//! This module handles:
//! - API route definitions
//! - Request size limits
//! - Middleware integration

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handler, middleware as app_middleware, state::AppState};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Create a new router with the given state
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.get_config().body_limit();

    Router::new()
        .route("/upload", post(handler::upload))
        .route("/run/{*path}", post(handler::run))
        .route("/run-now", post(handler::run_now))
        .route("/health", get(handler::health))
        .route("/status", get(handler::status))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(app_middleware::logging_middleware))
        .with_state(state)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
