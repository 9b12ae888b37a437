//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ShopError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or unknown session token.
    Unauthenticated,
    /// Bad request from the client.
    BadRequest(String),
    /// Email already registered.
    EmailTaken,
    /// Login with a wrong email or password.
    InvalidCredentials,
    /// Core service error.
    Shop(ShopError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::EmailTaken => (
                StatusCode::CONFLICT,
                "Email is already registered".to_string(),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            ApiError::Shop(err) => shop_error_to_response(err),
        };

        let body = serde_json::json!({ "success": false, "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn shop_error_to_response(err: ShopError) -> (StatusCode, String) {
    let status = match &err {
        ShopError::Validation(_)
        | ShopError::InvalidQuantity { .. }
        | ShopError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
        ShopError::Unauthorized(_) => StatusCode::FORBIDDEN,
        ShopError::NotFound(_) => StatusCode::NOT_FOUND,
        ShopError::IllegalTransition { .. } | ShopError::NotCancellable { .. } => {
            StatusCode::CONFLICT
        }
        ShopError::EmptyCart
        | ShopError::ProductUnavailable { .. }
        | ShopError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ShopError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "internal server error");
        // storage detail never reaches the client
        return (status, "Server error".to_string());
    }
    (status, err.to_string())
}

impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        ApiError::Shop(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::EmailTaken,
            other => ApiError::Shop(ShopError::Storage(other)),
        }
    }
}
