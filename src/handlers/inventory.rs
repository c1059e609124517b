use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::common::{created_response, success_response};
use crate::errors::ServiceError;
use crate::services::inventory::{
    AdjustBatchRequest, BatchResponse, ReceiveStockRequest, StockQuery, StockResponse,
};
use crate::{ApiResponse, ApiResult, AppState};

/// Receive stock
#[utoipa::path(
    post,
    path = "/api/v1/inventory/receive",
    summary = "Receive stock",
    description = "Books goods into a batch, creating the batch when its number is new at the depot",
    request_body = ReceiveStockRequest,
    responses(
        (status = 201, description = "Batch after receipt", body = ApiResponse<BatchResponse>),
        (status = 400, description = "Invalid request or dates disagree with the existing batch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or depot not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Inventory"
)]
pub async fn receive_stock(
    State(state): State<AppState>,
    Json(request): Json<ReceiveStockRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BatchResponse>>), ServiceError> {
    let batch = state.services.inventory.receive_stock(request).await?;
    Ok(created_response(batch))
}

/// Adjust batch
#[utoipa::path(
    post,
    path = "/api/v1/inventory/batches/{id}/adjust",
    summary = "Adjust batch",
    description = "Applies a signed correction to a batch's available units",
    params(
        ("id" = i32, Path, description = "Batch ID"),
    ),
    request_body = AdjustBatchRequest,
    responses(
        (status = 200, description = "Batch after adjustment", body = ApiResponse<BatchResponse>),
        (status = 400, description = "Zero delta or missing reason", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Correction exceeds available units", body = crate::errors::ErrorResponse),
    ),
    tag = "Inventory"
)]
pub async fn adjust_batch(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<AdjustBatchRequest>,
) -> ApiResult<BatchResponse> {
    let batch = state.services.inventory.adjust_batch(id, request).await?;
    Ok(success_response(batch))
}

/// Stock of a product at a depot
#[utoipa::path(
    get,
    path = "/api/v1/inventory/stock",
    summary = "Stock view",
    description = "Aggregate counters and batches in expiry order",
    params(StockQuery),
    responses(
        (status = 200, description = "Stock view", body = ApiResponse<StockResponse>),
        (status = 404, description = "No stock recorded", body = crate::errors::ErrorResponse),
    ),
    tag = "Inventory"
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Query(query): Query<StockQuery>,
) -> ApiResult<StockResponse> {
    let stock = state
        .services
        .inventory
        .stock(query.product_id, query.depot_id)
        .await?;
    Ok(success_response(stock))
}
