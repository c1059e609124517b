use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use sea_orm::error::SqlErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Unprocessable Entity",
    "message": "Insufficient stock for product 7: short by 12 units (requested 60, available 48)",
    "retryable": false,
    "request_id": "req-abc123xyz",
    "timestamp": "2025-03-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Human-readable reason
    pub message: String,
    /// Whether the caller may retry the same request unchanged
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid state: {entity} is {actual}, expected {expected}")]
    InvalidState {
        entity: String,
        actual: String,
        expected: String,
    },

    #[error(
        "Insufficient stock for product {product_id}: short by {} units (requested {requested}, available {available})",
        .requested - .available
    )]
    InsufficientStock {
        product_id: i32,
        requested: i32,
        available: i32,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn invalid_state(
        entity: impl Into<String>,
        actual: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        ServiceError::InvalidState {
            entity: entity.into(),
            actual: actual.into(),
            expected: expected.into(),
        }
    }

    /// Units missing to satisfy an `InsufficientStock` error, zero otherwise.
    pub fn deficit(&self) -> i32 {
        match self {
            Self::InsufficientStock {
                requested,
                available,
                ..
            } => requested - available,
            _ => 0,
        }
    }

    /// True when the database reported a unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        )
    }

    /// Lock waits, lost races and timeouts may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LockTimeout(_) | Self::Conflict(_) => true,
            Self::DatabaseError(err) => is_lock_failure(err),
            _ => false,
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidState { .. } | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::LockTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError(err) if is_lock_failure(err) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(err) if is_lock_failure(err) => {
                "Database is busy, retry the request".to_string()
            }
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

fn is_lock_failure(err: &DbErr) -> bool {
    let text = err.to_string().to_ascii_lowercase();
    text.contains("lock timeout")
        || text.contains("could not obtain lock")
        || text.contains("deadlock detected")
        || text.contains("could not serialize access")
        || text.contains("database is locked")
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            retryable: self.is_retryable(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("order 9".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert!(!payload.retryable);
    }

    #[test]
    fn insufficient_stock_names_the_deficit() {
        let err = ServiceError::InsufficientStock {
            product_id: 7,
            requested: 60,
            available: 48,
        };
        assert_eq!(err.deficit(), 12);
        assert!(err.to_string().contains("short by 12 units"));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn invalid_state_names_actual_and_expected() {
        let err = ServiceError::invalid_state("transfer TRF-20250101-0001", "Received", "Pending");
        assert_eq!(
            err.to_string(),
            "Invalid state: transfer TRF-20250101-0001 is Received, expected Pending"
        );
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::LockTimeout("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServiceError::InternalError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn lock_failures_are_retryable() {
        assert!(ServiceError::LockTimeout("busy".into()).is_retryable());
        let db = ServiceError::DatabaseError(DbErr::Custom(
            "canceling statement due to lock timeout".into(),
        ));
        assert!(db.is_retryable());
        assert_eq!(db.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!ServiceError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn internal_details_are_hidden() {
        assert_eq!(
            ServiceError::InternalError("corrupt row".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("syntax".into())).response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::NotFound("Order 4".into()).response_message(),
            "Not found: Order 4"
        );
    }
}
