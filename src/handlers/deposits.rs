use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::common::{created_response, success_response};
use crate::errors::ServiceError;
use crate::services::deposits::{
    ApproveDepositRequest, CreateDepositRequest, DepositResponse, ReceiveRemainingRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

/// Create deposit
#[utoipa::path(
    post,
    path = "/api/v1/deposits",
    summary = "Create deposit",
    description = "Reconciles a collector's unreconciled collections for one day against the cash handed over",
    request_body = CreateDepositRequest,
    responses(
        (status = 201, description = "Deposit recorded", body = ApiResponse<DepositResponse>),
        (status = 400, description = "Nothing to deposit or amount out of range", body = crate::errors::ErrorResponse),
        (status = 404, description = "Collector not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Deposits"
)]
pub async fn create_deposit(
    State(state): State<AppState>,
    Json(request): Json<CreateDepositRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DepositResponse>>), ServiceError> {
    let deposit = state.services.deposits.create_deposit(request).await?;
    Ok(created_response(deposit))
}

/// Get deposit by ID
#[utoipa::path(
    get,
    path = "/api/v1/deposits/{id}",
    summary = "Get deposit",
    params(
        ("id" = i32, Path, description = "Deposit ID"),
    ),
    responses(
        (status = 200, description = "Deposit with receipts", body = ApiResponse<DepositResponse>),
        (status = 404, description = "Deposit not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Deposits"
)]
pub async fn get_deposit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<DepositResponse> {
    let deposit = state.services.deposits.get_deposit(id).await?;
    Ok(success_response(deposit))
}

/// Approve deposit
#[utoipa::path(
    post,
    path = "/api/v1/deposits/{id}/approve",
    summary = "Approve deposit",
    params(
        ("id" = i32, Path, description = "Deposit ID"),
    ),
    request_body = ApproveDepositRequest,
    responses(
        (status = 200, description = "Deposit approved", body = ApiResponse<DepositResponse>),
        (status = 404, description = "Deposit or approver not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Deposit already approved", body = crate::errors::ErrorResponse),
    ),
    tag = "Deposits"
)]
pub async fn approve_deposit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ApproveDepositRequest>,
) -> ApiResult<DepositResponse> {
    let deposit = state
        .services
        .deposits
        .approve_deposit(id, request.approved_by)
        .await?;
    Ok(success_response(deposit))
}

/// Receive remaining cash
#[utoipa::path(
    post,
    path = "/api/v1/deposits/{id}/receive",
    summary = "Receive remaining cash",
    description = "Books a receipt against the deposit's remaining amount",
    params(
        ("id" = i32, Path, description = "Deposit ID"),
    ),
    request_body = ReceiveRemainingRequest,
    responses(
        (status = 200, description = "Receipt recorded", body = ApiResponse<DepositResponse>),
        (status = 400, description = "Amount is not positive or exceeds the remaining amount", body = crate::errors::ErrorResponse),
        (status = 404, description = "Deposit not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Deposits"
)]
pub async fn receive_remaining(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ReceiveRemainingRequest>,
) -> ApiResult<DepositResponse> {
    let deposit = state
        .services
        .deposits
        .receive_remaining(id, request)
        .await?;
    Ok(success_response(deposit))
}
