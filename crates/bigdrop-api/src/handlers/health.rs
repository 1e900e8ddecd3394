//! Health check handler.

use axum::Json;
use axum::extract::State;

use bigdrop_core::types::response::ApiResponse;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let storage_ok = state.storage.health_check().await.unwrap_or(false);

    Json(ApiResponse::new(HealthResponse {
        status: if storage_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: if storage_ok { "available" } else { "unavailable" }.to_string(),
    }))
}
