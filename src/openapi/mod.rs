use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fulfillment API",
        version = "0.3.0",
        description = r#"
# Order Fulfillment & Inventory Allocation

Order lifecycle, batch allocation and cash reconciliation for a distribution depot network.

## Lifecycle

Draft → Submitted → Validated → Printed → Assigned → Delivered → CollectionApproved

- **Validation** issues an 8-digit memo number per order.
- **Assignment** groups printed orders under one loading number (`YYYYMMDD-NNNN`, with route codes appended for multi-route loads).
- **Deliveries** pick stock from batches first-expiry-first-out and reserve it; delivery approval issues delivered units and releases returns.

## Errors

Every error body carries a `retryable` flag. Lock timeouts (503) and lost reservation races (409 `Conflict`) can be retried unchanged:

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock for product 7: short by 12 units (requested 60, available 48)",
  "retryable": false,
  "request_id": "req-abc123xyz",
  "timestamp": "2025-03-09T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order capture, validation, printing and assignment"),
        (name = "Deliveries", description = "Batch picking and delivery approval"),
        (name = "Collections", description = "Collection queues and approval"),
        (name = "Deposits", description = "Cash deposits and remaining receipts"),
        (name = "Inventory", description = "Stock receipt, adjustments and stock views"),
        (name = "Transfers", description = "Stock transfers between depots"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::submit_order,
        crate::handlers::orders::select_items,
        crate::handlers::orders::validate_orders,
        crate::handlers::orders::print_orders,
        crate::handlers::orders::assign_orders,

        // Deliveries
        crate::handlers::deliveries::create_delivery,
        crate::handlers::deliveries::get_delivery,
        crate::handlers::deliveries::cancel_delivery,
        crate::handlers::deliveries::approve_delivery,

        // Collections
        crate::handlers::collections::remaining_cash_queue,
        crate::handlers::collections::mobile_queue,
        crate::handlers::collections::approve_collections,
        crate::handlers::collections::collect_pending,

        // Deposits
        crate::handlers::deposits::create_deposit,
        crate::handlers::deposits::get_deposit,
        crate::handlers::deposits::approve_deposit,
        crate::handlers::deposits::receive_remaining,

        // Inventory
        crate::handlers::inventory::receive_stock,
        crate::handlers::inventory::adjust_batch,
        crate::handlers::inventory::get_stock,

        // Transfers
        crate::handlers::transfers::create_transfer,
        crate::handlers::transfers::get_transfer,
        crate::handlers::transfers::approve_transfer,
        crate::handlers::transfers::receive_transfer,
        crate::handlers::transfers::reject_transfer,

        // Health
        crate::handlers::health::readiness_check,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::handlers::common::OrderIdsRequest,
            crate::handlers::orders::SelectItemsRequest,
            crate::handlers::orders::ValidateOrdersRequest,
            crate::handlers::orders::AssignOrdersRequest,
            crate::models::status::Stage,
            crate::models::status::OrderStatus,
            crate::models::status::CollectionStatus,
            crate::models::status::CollectionSource,
            crate::models::status::DeliveryStatus,
            crate::models::status::TransferStatus,
            crate::models::status::DepositChannel,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_engine_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Fulfillment API"));
        assert!(json.contains("/api/v1/orders/validate"));
        assert!(json.contains("/api/v1/deliveries/approve"));
        assert!(json.contains("/api/v1/transfers/{id}/receive"));
    }
}
