//! Middleware components for the faasbox server.

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};

//--------------------------------------------------------------------------------------------------
// Middleware Functions
//--------------------------------------------------------------------------------------------------

/// Log incoming requests and their response status
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();

    tracing::info!("Request: {} {}", method, uri);

    let response = next.run(req).await;

    // streamed bodies are still being written at this point
    tracing::info!(
        "Response: {} {}: {} ({:?})",
        method,
        uri,
        response.status(),
        started.elapsed()
    );

    response
}
