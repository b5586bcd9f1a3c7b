//! Booking API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Auth validator → 2. Access logger

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the booking API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Same router with a CORS policy for one browser origin.
pub fn api_router_with_cors(core: Arc<CoreState>, origin: &str) -> Router {
    let router = api_router(core);
    match HeaderValue::from_str(origin) {
        Ok(origin) => router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        ),
        Err(_) => {
            tracing::warn!(origin, "Ignoring invalid CORS origin");
            router
        }
    }
}

fn build_router(ctx: ApiContext) -> Router {
    // Protected routes — require auth + access log
    //
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Auth → Access log (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/doctors", get(endpoints::doctors::list))
        .route("/doctors/:id", get(endpoints::doctors::detail))
        .route(
            "/appointments",
            get(endpoints::appointments::list_mine).post(endpoints::appointments::create),
        )
        .route(
            "/appointments/doctor",
            get(endpoints::appointments::list_for_doctor),
        )
        .route(
            "/appointments/doctor/:doctor_id/booked-slots",
            get(endpoints::appointments::booked_slots),
        )
        .route(
            "/appointments/:id",
            patch(endpoints::appointments::update_status)
                .put(endpoints::appointments::reschedule)
                .delete(endpoints::appointments::cancel),
        )
        .route("/admin/users", get(endpoints::admin::users))
        .route("/admin/users/:id/tokens", post(endpoints::admin::issue_token))
        .route("/admin/doctors", get(endpoints::admin::doctors))
        .route(
            "/admin/doctors/:id/status",
            patch(endpoints::admin::set_doctor_status),
        )
        .route(
            "/admin/doctors/:id",
            axum::routing::delete(endpoints::admin::delete_doctor),
        )
        .route("/admin/appointments", get(endpoints::admin::appointments))
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (no auth required)
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/register", post(endpoints::auth::register))
        .with_state(ctx.clone())
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
}
