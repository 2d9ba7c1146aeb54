use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_infra::OrderServiceError;

pub fn service_error_to_response(err: OrderServiceError) -> axum::response::Response {
    match err {
        OrderServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        OrderServiceError::InvalidStatus(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_status", msg),
        OrderServiceError::NotFound { entity, id } => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{entity} {id} not found"),
        ),
        OrderServiceError::InsufficientStock(shortfall) => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": shortfall.to_string(),
                "product_id": shortfall.product_id,
                "available": shortfall.available,
                "requested": shortfall.requested,
            })),
        )
            .into_response(),
        OrderServiceError::Internal(msg) => {
            tracing::error!(error = %msg, "order operation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

/// Request-mapping failures (bad path ids, malformed DTO fields).
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        other => service_error_to_response(other.into()),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
