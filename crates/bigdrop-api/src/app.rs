//! Application builder: wires router, middleware and state into an Axum app.

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
///
/// A `request_timeout_seconds` of zero disables the timeout layer.
pub fn build_app(state: AppState) -> Router {
    let server = state.config.server.clone();
    let app = build_router(state)
        .layer(build_cors_layer(&server.cors))
        .layer(TraceLayer::new_for_http());

    if server.request_timeout_seconds == 0 {
        return app;
    }
    app.layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(server.request_timeout_seconds),
    ))
}
