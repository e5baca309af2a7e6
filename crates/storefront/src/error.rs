//! Unified error handling for the HTTP layer.
//!
//! Provides a unified `AppError` type that maps domain errors onto HTTP
//! status codes and a `{"message": ...}` JSON body. All route handlers
//! should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::CartError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart or purchase operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Cart(CartError::Store(_)) | Self::Internal(_)) {
            tracing::error!(error = %self, "Request error");
        }

        let status = match &self {
            Self::Cart(err) => match err {
                CartError::BeverageNotFound
                | CartError::LineItemNotFound
                | CartError::CartNotFound => StatusCode::NOT_FOUND,
                CartError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                CartError::InsufficientStock { .. }
                | CartError::Conflict(_)
                | CartError::EmptyCart => StatusCode::CONFLICT,
                CartError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Cart(CartError::Store(_)) | Self::Internal(_) => {
                "Internal server error".to_owned()
            }
            Self::Cart(err) => err.to_string(),
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
