//! Public share and download handlers. No token is required; the transfer
//! id is the capability.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;

use bigdrop_core::error::AppError;
use bigdrop_core::types::response::ApiResponse;

use crate::dto::response::ShareResponse;
use crate::error::ApiError;
use crate::extractors::path::{parse_file_id, parse_transfer_id};
use crate::state::AppState;

/// GET /transfer/share/{id}
pub async fn share_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ShareResponse>>, ApiError> {
    let shared = state.downloads.share_info(parse_transfer_id(&id)?).await?;
    let t = shared.transfer;
    Ok(Json(ApiResponse::new(ShareResponse {
        id: t.id,
        message: t.message,
        size: t.size,
        expires_at: t.expires_at,
        download_count: t.download_count,
        created_at: t.created_at,
        state: t.state,
        files: shared.entries,
    })))
}

/// GET /transfer/download/transfer/{id}
pub async fn download_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let download = state
        .downloads
        .download_archive(parse_transfer_id(&id)?)
        .await?;

    attachment(
        "application/zip",
        &download.file_name,
        download.size,
        Body::from_stream(download.stream),
    )
}

/// GET /transfer/download/file/{file_id}
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let download = state
        .downloads
        .download_file(parse_file_id(&file_id)?)
        .await?;

    attachment(
        "application/octet-stream",
        download.entry.file_name(),
        download.entry.size,
        Body::from_stream(download.stream),
    )
}

fn attachment(content_type: &str, file_name: &str, size: u64, body: Body) -> Result<Response, ApiError> {
    let safe_name: String = file_name
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{safe_name}\""),
        )
        .header(header::CONTENT_LENGTH, size)
        .body(body)
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}
