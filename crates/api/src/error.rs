//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or unknown identity.
    Unauthorized,
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "authentication required" }),
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, serde_json::Value) {
    let message = err.to_string();
    match err {
        DomainError::NotFound(_) => {
            (StatusCode::NOT_FOUND, serde_json::json!({ "error": message }))
        }
        DomainError::Forbidden => {
            (StatusCode::FORBIDDEN, serde_json::json!({ "error": message }))
        }
        DomainError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, serde_json::json!({ "error": message }))
        }
        // Stock problems carry the numbers so the storefront can show
        // the shopper what is actually left.
        DomainError::OutOfStock {
            requested,
            available,
            in_cart,
        } => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": message,
                "requested": requested,
                "available": available,
                "in_cart": in_cart,
            }),
        ),
        DomainError::InsufficientStock(shortages) => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": message, "shortages": shortages }),
        ),
        DomainError::EmptyCart
        | DomainError::InvalidQuantity(_)
        | DomainError::InvalidRating(_) => {
            (StatusCode::BAD_REQUEST, serde_json::json!({ "error": message }))
        }
        DomainError::Store(store_err) => {
            tracing::error!(error = %store_err, "datastore failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "internal server error" }),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
