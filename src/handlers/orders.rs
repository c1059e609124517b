use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, success_response, validate_input, OrderIdsRequest};
use crate::errors::ServiceError;
use crate::services::order_lifecycle::{
    AssignmentOutcome, CreateOrderRequest, OrderResponse, PrintOutcome, ValidationOutcome,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SelectItemsRequest {
    /// Items to keep selected; every other item of the order is deselected
    pub item_ids: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ValidateOrdersRequest {
    #[validate(length(min = 1, message = "At least one order id is required"))]
    pub order_ids: Vec<i32>,
    /// Memo number proposed by the client for the first order that needs one
    pub generated_order_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AssignOrdersRequest {
    #[validate(length(min = 1, message = "At least one order id is required"))]
    pub order_ids: Vec<i32>,
    pub employee_id: i32,
    pub vehicle_id: i32,
}

/// Create order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Captures a Draft order, snapshots customer, route and salesperson, and prices each line from the product master",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request, or a product has no orderable stock at the depot", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown customer, route, employee, depot or product", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state.services.orders.create_order(request).await?;
    Ok(created_response(order))
}

/// Get order by ID
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    description = "Order with items, lifecycle state and derived flags",
    params(
        ("id" = i32, Path, description = "Order ID"),
    ),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.get_order(id).await?;
    Ok(success_response(order))
}

/// Delete order
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    summary = "Delete order",
    description = "Removes an order and its items; only allowed before validation",
    params(
        ("id" = i32, Path, description = "Order ID"),
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is already validated", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.services.orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/submit",
    summary = "Submit order",
    description = "Moves a Draft order to Submitted",
    params(
        ("id" = i32, Path, description = "Order ID"),
    ),
    responses(
        (status = 200, description = "Order submitted", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not a draft", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn submit_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.submit_order(id).await?;
    Ok(success_response(order))
}

/// Select order items
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/select-items",
    summary = "Select items",
    description = "Marks exactly the given items as selected for validation and picking",
    params(
        ("id" = i32, Path, description = "Order ID"),
    ),
    request_body = SelectItemsRequest,
    responses(
        (status = 200, description = "Selection stored", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Item does not belong to the order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is already validated", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn select_items(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<SelectItemsRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .select_items(id, request.item_ids)
        .await?;
    Ok(success_response(order))
}

/// Validate orders
#[utoipa::path(
    post,
    path = "/api/v1/orders/validate",
    summary = "Validate orders",
    description = "Validates a batch of orders and issues memo numbers; already validated orders are reported unchanged",
    request_body = ValidateOrdersRequest,
    responses(
        (status = 200, description = "Orders validated", body = ApiResponse<Vec<ValidationOutcome>>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order in the wrong stage or memo retries exhausted", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn validate_orders(
    State(state): State<AppState>,
    Json(request): Json<ValidateOrdersRequest>,
) -> ApiResult<Vec<ValidationOutcome>> {
    validate_input(&request)?;
    let outcomes = state
        .services
        .orders
        .validate_orders(request.order_ids, request.generated_order_number)
        .await?;
    Ok(success_response(outcomes))
}

/// Print orders
#[utoipa::path(
    post,
    path = "/api/v1/orders/print",
    summary = "Print orders",
    description = "Marks validated orders printed; already printed and unvalidated orders are listed separately",
    request_body = OrderIdsRequest,
    responses(
        (status = 200, description = "Print outcome", body = ApiResponse<PrintOutcome>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn print_orders(
    State(state): State<AppState>,
    Json(request): Json<OrderIdsRequest>,
) -> ApiResult<PrintOutcome> {
    validate_input(&request)?;
    let outcome = state.services.orders.print_orders(request.order_ids).await?;
    Ok(success_response(outcome))
}

/// Assign orders
#[utoipa::path(
    post,
    path = "/api/v1/orders/assign",
    summary = "Assign orders",
    description = "Puts printed orders on one loading number for a delivery employee and vehicle",
    request_body = AssignOrdersRequest,
    responses(
        (status = 200, description = "Orders assigned", body = ApiResponse<AssignmentOutcome>),
        (status = 400, description = "Invalid request or missing route code", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order, employee or vehicle not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order not printed or already assigned", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn assign_orders(
    State(state): State<AppState>,
    Json(request): Json<AssignOrdersRequest>,
) -> ApiResult<AssignmentOutcome> {
    validate_input(&request)?;
    let outcome = state
        .services
        .orders
        .assign_orders(request.order_ids, request.employee_id, request.vehicle_id)
        .await?;
    Ok(success_response(outcome))
}
