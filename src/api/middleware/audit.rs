//! Access logging middleware.
//!
//! Logs every authenticated request with user id, role, method, path, and
//! response status. Runs innermost (after auth has injected `Principal`).

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::authorization::Principal;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let principal = req.extensions().get::<Principal>().copied();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match principal {
        Some(p) => tracing::info!(
            user_id = %p.user_id,
            role = %p.role,
            %method,
            path = %path,
            status,
            elapsed_ms,
            "API access"
        ),
        None => tracing::info!(%method, path = %path, status, elapsed_ms, "API access"),
    }

    response
}
