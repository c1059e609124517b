use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::common::{created_response, success_response};
use crate::errors::ServiceError;
use crate::services::deliveries::{
    CreateDeliveryRequest, DeliveryApprovalOutcome, DeliveryApprovalRequest, DeliveryResponse,
};
use crate::{ApiResponse, ApiResult, AppState};

/// Create delivery
#[utoipa::path(
    post,
    path = "/api/v1/deliveries",
    summary = "Create delivery",
    description = "Allocates every selected item of a validated order from its depot's batches in expiry order and reserves the picks",
    request_body = CreateDeliveryRequest,
    responses(
        (status = 201, description = "Delivery picked", body = ApiResponse<DeliveryResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 404, description = "Order or vehicle not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order not validated, delivery already active, or lost a reservation race", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock for an item", body = crate::errors::ErrorResponse),
        (status = 503, description = "Lock timeout, retry", body = crate::errors::ErrorResponse),
    ),
    tag = "Deliveries"
)]
pub async fn create_delivery(
    State(state): State<AppState>,
    Json(request): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DeliveryResponse>>), ServiceError> {
    let delivery = state.services.deliveries.create_delivery(request).await?;
    Ok(created_response(delivery))
}

/// Get delivery by ID
#[utoipa::path(
    get,
    path = "/api/v1/deliveries/{id}",
    summary = "Get delivery",
    params(
        ("id" = i32, Path, description = "Delivery ID"),
    ),
    responses(
        (status = 200, description = "Delivery with picks", body = ApiResponse<DeliveryResponse>),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<DeliveryResponse> {
    let delivery = state.services.deliveries.get_delivery(id).await?;
    Ok(success_response(delivery))
}

/// Cancel delivery
#[utoipa::path(
    post,
    path = "/api/v1/deliveries/{id}/cancel",
    summary = "Cancel delivery",
    description = "Releases every reservation held by a picked delivery",
    params(
        ("id" = i32, Path, description = "Delivery ID"),
    ),
    responses(
        (status = 200, description = "Delivery cancelled", body = ApiResponse<DeliveryResponse>),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Delivery is not picked", body = crate::errors::ErrorResponse),
    ),
    tag = "Deliveries"
)]
pub async fn cancel_delivery(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<DeliveryResponse> {
    let delivery = state.services.deliveries.cancel_delivery(id).await?;
    Ok(success_response(delivery))
}

/// Approve deliveries of a loading
#[utoipa::path(
    post,
    path = "/api/v1/deliveries/approve",
    summary = "Approve delivery",
    description = "Records delivered and returned units for every memo of a loading number, derives each order's collection and settles reserved stock",
    request_body = DeliveryApprovalRequest,
    responses(
        (status = 200, description = "Loading approved", body = ApiResponse<DeliveryApprovalOutcome>),
        (status = 400, description = "Memo outcomes do not match the loading", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown loading number", body = crate::errors::ErrorResponse),
        (status = 409, description = "An order of the loading is not assigned", body = crate::errors::ErrorResponse),
    ),
    tag = "Deliveries"
)]
pub async fn approve_delivery(
    State(state): State<AppState>,
    Json(request): Json<DeliveryApprovalRequest>,
) -> ApiResult<DeliveryApprovalOutcome> {
    let outcome = state.services.deliveries.approve_delivery(request).await?;
    Ok(success_response(outcome))
}
