//! API middleware

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{info, warn};

/// Header carrying the per-request id set by the request-id layer
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request logging middleware
///
/// Logs every API request with its request id, status and latency. Server
/// errors are logged at WARN.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            request_id = %request_id,
            status = status.as_u16(),
            latency_ms,
            "API request failed"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            request_id = %request_id,
            status = status.as_u16(),
            latency_ms,
            "API request"
        );
    }

    response
}
