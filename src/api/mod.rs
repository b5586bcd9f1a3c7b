//! HTTP API for the booking service.
//!
//! Routes are nested under `/api/`. Protected routes pass through the
//! middleware stack Auth → Access log → Handler.
//!
//! The router is composable — `api_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::{api_router, api_router_with_cors};
pub use server::{start_server_on, ApiServer, ServerError, ServerSession};
pub use types::ApiContext;
