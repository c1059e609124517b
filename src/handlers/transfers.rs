use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::common::{created_response, success_response};
use crate::errors::ServiceError;
use crate::services::transfers::{CreateTransferRequest, TransferResponse};
use crate::{ApiResponse, ApiResult, AppState};

/// Create transfer
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    summary = "Create transfer",
    description = "Reserves the requested batches at the source depot",
    request_body = CreateTransferRequest,
    responses(
        (status = 201, description = "Transfer pending", body = ApiResponse<TransferResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Depot or batch not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough available units", body = crate::errors::ErrorResponse),
    ),
    tag = "Transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(request): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransferResponse>>), ServiceError> {
    let transfer = state.services.transfers.create_transfer(request).await?;
    Ok(created_response(transfer))
}

/// Get transfer by ID
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}",
    summary = "Get transfer",
    params(
        ("id" = i32, Path, description = "Transfer ID"),
    ),
    responses(
        (status = 200, description = "Transfer with items", body = ApiResponse<TransferResponse>),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Transfers"
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<TransferResponse> {
    let transfer = state.services.transfers.get_transfer(id).await?;
    Ok(success_response(transfer))
}

/// Approve transfer
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/approve",
    summary = "Approve transfer",
    description = "Issues the reserved units from the source depot",
    params(
        ("id" = i32, Path, description = "Transfer ID"),
    ),
    responses(
        (status = 200, description = "Transfer in transit", body = ApiResponse<TransferResponse>),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transfer is not pending", body = crate::errors::ErrorResponse),
    ),
    tag = "Transfers"
)]
pub async fn approve_transfer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<TransferResponse> {
    let transfer = state.services.transfers.approve_transfer(id).await?;
    Ok(success_response(transfer))
}

/// Receive transfer
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/receive",
    summary = "Receive transfer",
    description = "Books the transferred units into the destination depot under the same batch numbers",
    params(
        ("id" = i32, Path, description = "Transfer ID"),
    ),
    responses(
        (status = 200, description = "Transfer received", body = ApiResponse<TransferResponse>),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transfer is not in transit", body = crate::errors::ErrorResponse),
    ),
    tag = "Transfers"
)]
pub async fn receive_transfer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<TransferResponse> {
    let transfer = state.services.transfers.receive_transfer(id).await?;
    Ok(success_response(transfer))
}

/// Reject transfer
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/reject",
    summary = "Reject transfer",
    description = "Releases the reservation held at the source depot",
    params(
        ("id" = i32, Path, description = "Transfer ID"),
    ),
    responses(
        (status = 200, description = "Transfer rejected", body = ApiResponse<TransferResponse>),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transfer is not pending", body = crate::errors::ErrorResponse),
    ),
    tag = "Transfers"
)]
pub async fn reject_transfer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<TransferResponse> {
    let transfer = state.services.transfers.reject_transfer(id).await?;
    Ok(success_response(transfer))
}
