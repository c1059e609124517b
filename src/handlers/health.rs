use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use utoipa::ToSchema;

use crate::handlers::AppState;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

/// Individual component health details
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub database: ComponentHealth,
}

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Liveness probe, no dependencies touched
async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Readiness probe: pings the database
#[utoipa::path(
    get,
    path = "/health/ready",
    summary = "Readiness",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "Health"
)]
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let result = crate::db::check_connection(&state.db).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let database = match result {
        Ok(()) => ComponentHealth {
            status: ComponentStatus::Up,
            message: "Connection successful".to_string(),
            latency_ms: Some(latency_ms),
        },
        Err(e) => ComponentHealth {
            status: ComponentStatus::Down,
            message: format!("Connection failed: {}", e),
            latency_ms: Some(latency_ms),
        },
    };
    let status = database.status;
    let code = match status {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_secs: uptime_secs(),
            database,
        }),
    )
}

/// Health endpoints:
/// - GET /health       - liveness
/// - GET /health/ready - readiness (database ping)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness_check))
        .route("/ready", get(readiness_check))
}
