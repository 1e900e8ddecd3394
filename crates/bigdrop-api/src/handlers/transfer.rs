//! Owner-side transfer handlers: create, upload, assemble, cancel, update,
//! delete, list and status.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use bytes::Bytes;

use bigdrop_core::error::AppError;
use bigdrop_core::types::id::TransferId;
use bigdrop_core::types::response::ApiResponse;
use bigdrop_service::transfer::ChunkReceipt;

use crate::dto::request::{CreateTransferRequest, TransferIdRequest, UpdateTransferRequest};
use crate::dto::response::{
    AssembleResponse, CreateTransferResponse, DeleteResponse, TransferResponse,
    TransferStatusResponse,
};
use crate::error::ApiError;
use crate::extractors::path::parse_transfer_id;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// POST /transfer/new
pub async fn create_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateTransferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateTransferResponse>>), ApiError> {
    let transfer = state.registry.create(&auth, req.into_input()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CreateTransferResponse::from(&transfer))),
    ))
}

/// POST /transfer/upload: multipart with `transfer_id` (or `uploadId`),
/// `index` and `chunk`.
pub async fn upload_chunk(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<ChunkReceipt> {
    let mut transfer_id: Option<TransferId> = None;
    let mut index: Option<u32> = None;
    let mut data: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "transfer_id" | "uploadId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
                transfer_id = Some(parse_transfer_id(text.trim())?);
            }
            "index" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
                index = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::validation(format!("Invalid chunk index: {text}")))?,
                );
            }
            "chunk" => {
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let transfer_id = transfer_id.ok_or_else(|| AppError::validation("transfer_id is required"))?;
    let index = index.ok_or_else(|| AppError::validation("index is required"))?;
    let data = data.ok_or_else(|| AppError::validation("chunk is required"))?;

    let receipt = state
        .uploads
        .put_chunk(&auth, transfer_id, index, data)
        .await?;
    Ok(Json(ApiResponse::new(receipt)))
}

/// POST /transfer/assemble
pub async fn assemble_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<TransferIdRequest>,
) -> ApiResult<AssembleResponse> {
    let sealed = state.assembly.assemble(&auth, req.transfer_id).await?;
    Ok(Json(ApiResponse::new(AssembleResponse {
        transfer: sealed.transfer.into(),
        files: sealed.entries,
    })))
}

/// POST /transfer/cancel
pub async fn cancel_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<TransferIdRequest>,
) -> ApiResult<TransferResponse> {
    let transfer = state.registry.cancel(&auth, req.transfer_id).await?;
    Ok(Json(ApiResponse::new(transfer.into())))
}

/// PUT /transfer/update
pub async fn update_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateTransferRequest>,
) -> ApiResult<TransferResponse> {
    let id = req.transfer_id;
    let transfer = state.registry.update(&auth, id, req.into_input()?).await?;
    Ok(Json(ApiResponse::new(transfer.into())))
}

/// DELETE /transfer/delete/{id}
pub async fn delete_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<DeleteResponse> {
    let transfer_id = parse_transfer_id(&id)?;
    state.registry.delete(&auth, transfer_id).await?;
    Ok(Json(ApiResponse::new(DeleteResponse {
        transfer_id,
        deleted: true,
    })))
}

/// GET /transfer/all
pub async fn list_transfers(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Vec<TransferResponse>> {
    let transfers = state.registry.list(&auth).await?;
    Ok(Json(ApiResponse::new(
        transfers.into_iter().map(TransferResponse::from).collect(),
    )))
}

/// GET /transfer/status/{id}
pub async fn transfer_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<TransferStatusResponse> {
    let progress = state.registry.progress(&auth, parse_transfer_id(&id)?).await?;
    Ok(Json(ApiResponse::new(TransferStatusResponse {
        complete: progress.missing_indices.is_empty(),
        transfer: progress.transfer.into(),
        stored_indices: progress.stored_indices,
        missing_indices: progress.missing_indices,
    })))
}
