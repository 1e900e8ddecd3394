//! Route definitions for the BigDrop HTTP API.
//!
//! Owner endpoints live under `/transfer` and require a bearer token; the
//! share and download endpoints are public.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Room for multipart boundaries and the text fields around a chunk.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the Axum router with all routes and per-route limits.
pub fn build_router(state: AppState) -> Router {
    let chunk_limit = state.config.transfer.max_chunk_size_bytes as usize + MULTIPART_OVERHEAD;

    Router::new()
        .merge(transfer_routes(chunk_limit))
        .merge(download_routes())
        .route("/health", get(handlers::health::health))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Owner-facing lifecycle endpoints.
fn transfer_routes(chunk_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/transfer/new", post(handlers::transfer::create_transfer))
        .route(
            "/transfer/upload",
            post(handlers::transfer::upload_chunk).layer(DefaultBodyLimit::max(chunk_limit)),
        )
        .route("/transfer/assemble", post(handlers::transfer::assemble_transfer))
        .route("/transfer/cancel", post(handlers::transfer::cancel_transfer))
        .route("/transfer/update", put(handlers::transfer::update_transfer))
        .route("/transfer/delete/{id}", delete(handlers::transfer::delete_transfer))
        .route("/transfer/all", get(handlers::transfer::list_transfers))
        .route("/transfer/status/{id}", get(handlers::transfer::transfer_status))
}

/// Public share and download endpoints.
fn download_routes() -> Router<AppState> {
    Router::new()
        .route("/transfer/share/{id}", get(handlers::download::share_info))
        .route(
            "/transfer/download/transfer/{id}",
            get(handlers::download::download_transfer),
        )
        .route(
            "/transfer/download/file/{file_id}",
            get(handlers::download::download_file),
        )
}
