use crate::errors::ServiceError;
use crate::ApiResponse;
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

/// Body shared by the batch order endpoints
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct OrderIdsRequest {
    #[validate(length(min = 1, message = "At least one order id is required"))]
    pub order_ids: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_list_is_rejected() {
        let err = validate_input(&OrderIdsRequest { order_ids: vec![] }).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(msg) if msg.contains("order_ids")));
        assert!(validate_input(&OrderIdsRequest { order_ids: vec![3] }).is_ok());
    }

    #[test]
    fn created_response_uses_201() {
        let (status, Json(body)) = created_response(42);
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.success);
        assert_eq!(body.data, 42);
    }
}
