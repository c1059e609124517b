//! Fulfillment API Library
//!
//! Order lifecycle, FEFO batch allocation, delivery dispatch and cash
//! collection reconciliation for a distribution business.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires every service onto one pool and one event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender, &config);
        Self {
            db,
            config,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn meta_without_request_scope_has_no_id() {
        let response = ApiResponse::success(1);
        let meta = response.meta.expect("metadata expected");
        assert!(meta.request_id.is_none());
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    let orders = Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .route(
            "/orders/:id",
            get(handlers::orders::get_order).delete(handlers::orders::delete_order),
        )
        .route("/orders/:id/submit", post(handlers::orders::submit_order))
        .route(
            "/orders/:id/select-items",
            post(handlers::orders::select_items),
        )
        .route("/orders/validate", post(handlers::orders::validate_orders))
        .route("/orders/print", post(handlers::orders::print_orders))
        .route("/orders/assign", post(handlers::orders::assign_orders));

    let deliveries = Router::new()
        .route("/deliveries", post(handlers::deliveries::create_delivery))
        .route("/deliveries/:id", get(handlers::deliveries::get_delivery))
        .route(
            "/deliveries/:id/cancel",
            post(handlers::deliveries::cancel_delivery),
        )
        .route(
            "/deliveries/approve",
            post(handlers::deliveries::approve_delivery),
        );

    let collections = Router::new()
        .route(
            "/collections/remaining-cash",
            get(handlers::collections::remaining_cash_queue),
        )
        .route("/collections/mobile", get(handlers::collections::mobile_queue))
        .route(
            "/collections/approve",
            post(handlers::collections::approve_collections),
        )
        .route(
            "/collections/:order_id/collect",
            post(handlers::collections::collect_pending),
        );

    let deposits = Router::new()
        .route("/deposits", post(handlers::deposits::create_deposit))
        .route("/deposits/:id", get(handlers::deposits::get_deposit))
        .route(
            "/deposits/:id/approve",
            post(handlers::deposits::approve_deposit),
        )
        .route(
            "/deposits/:id/receive",
            post(handlers::deposits::receive_remaining),
        );

    let inventory = Router::new()
        .route("/inventory/receive", post(handlers::inventory::receive_stock))
        .route(
            "/inventory/batches/:id/adjust",
            post(handlers::inventory::adjust_batch),
        )
        .route("/inventory/stock", get(handlers::inventory::get_stock));

    let transfers = Router::new()
        .route("/transfers", post(handlers::transfers::create_transfer))
        .route("/transfers/:id", get(handlers::transfers::get_transfer))
        .route(
            "/transfers/:id/approve",
            post(handlers::transfers::approve_transfer),
        )
        .route(
            "/transfers/:id/receive",
            post(handlers::transfers::receive_transfer),
        )
        .route(
            "/transfers/:id/reject",
            post(handlers::transfers::reject_transfer),
        );

    Router::new()
        .merge(orders)
        .merge(deliveries)
        .merge(collections)
        .merge(deposits)
        .merge(inventory)
        .merge(transfers)
}

/// Full application router without the outer tower layers
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/metrics",
            get(|| async move {
                match metrics::metrics_handler().await {
                    Ok(body) => (axum::http::StatusCode::OK, body),
                    Err(_) => (
                        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                        String::from("metrics error"),
                    ),
                }
            }),
        )
        .nest("/health", handlers::health::health_routes())
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .with_state(state)
}
