use axum::{
    extract::{Path, State},
    Json,
};

use super::common::success_response;
use crate::services::collections::{
    CollectPendingRequest, CollectionApprovalRequest, CollectionEntry,
};
use crate::{ApiResponse, ApiResult, AppState};

/// Remaining-cash queue
#[utoipa::path(
    get,
    path = "/api/v1/collections/remaining-cash",
    summary = "Remaining cash queue",
    description = "Web-reported deliveries waiting in the office for collection approval",
    responses(
        (status = 200, description = "Queue entries", body = ApiResponse<Vec<CollectionEntry>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Collections"
)]
pub async fn remaining_cash_queue(State(state): State<AppState>) -> ApiResult<Vec<CollectionEntry>> {
    let entries = state.services.collections.remaining_cash_queue().await?;
    Ok(success_response(entries))
}

/// Mobile collection queue
#[utoipa::path(
    get,
    path = "/api/v1/collections/mobile",
    summary = "Mobile queue",
    description = "App-reported deliveries with cash still outstanding",
    responses(
        (status = 200, description = "Queue entries", body = ApiResponse<Vec<CollectionEntry>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Collections"
)]
pub async fn mobile_queue(State(state): State<AppState>) -> ApiResult<Vec<CollectionEntry>> {
    let entries = state.services.collections.mobile_queue().await?;
    Ok(success_response(entries))
}

/// Approve collections
#[utoipa::path(
    post,
    path = "/api/v1/collections/approve",
    summary = "Approve collections",
    request_body = CollectionApprovalRequest,
    responses(
        (status = 200, description = "Collections approved", body = ApiResponse<Vec<CollectionEntry>>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or approver not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order not delivered", body = crate::errors::ErrorResponse),
    ),
    tag = "Collections"
)]
pub async fn approve_collections(
    State(state): State<AppState>,
    Json(request): Json<CollectionApprovalRequest>,
) -> ApiResult<Vec<CollectionEntry>> {
    let entries = state.services.collections.approve_collections(request).await?;
    Ok(success_response(entries))
}

/// Collect pending cash
#[utoipa::path(
    post,
    path = "/api/v1/collections/{order_id}/collect",
    summary = "Collect pending cash",
    description = "Books cash received after approval against the order's pending amount",
    params(
        ("order_id" = i32, Path, description = "Order ID"),
    ),
    request_body = CollectPendingRequest,
    responses(
        (status = 200, description = "Cash booked", body = ApiResponse<CollectionEntry>),
        (status = 400, description = "Amount is not positive or exceeds the pending amount", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Collection not approved", body = crate::errors::ErrorResponse),
    ),
    tag = "Collections"
)]
pub async fn collect_pending(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(request): Json<CollectPendingRequest>,
) -> ApiResult<CollectionEntry> {
    let entry = state
        .services
        .collections
        .collect_pending(order_id, request.amount)
        .await?;
    Ok(success_response(entry))
}
