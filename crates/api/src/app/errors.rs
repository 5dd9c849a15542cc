use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use sweetshop_auth::AuthzError;
use sweetshop_infra::{StoreError, StorefrontError};

pub fn storefront_error_to_response(err: StorefrontError) -> axum::response::Response {
    match err {
        StorefrontError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        StorefrontError::InvalidQuantity(n) => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_quantity",
            format!("quantity must be at least 1, got {n}"),
        ),
        StorefrontError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        StorefrontError::NotFound(entity) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found"))
        }
        StorefrontError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        e @ StorefrontError::OutOfStock { .. } => {
            json_error(StatusCode::CONFLICT, "out_of_stock", e.to_string())
        }
        StorefrontError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StorefrontError::Unauthorized => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
        }
        StorefrontError::Store(e) => {
            tracing::error!(error = %e, "storage failure");
            let message = match e {
                StoreError::Integrity(_) => "integrity violation",
                _ => "storage failure",
            };
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message)
        }
    }
}

pub fn forbidden(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
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
