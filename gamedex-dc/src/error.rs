//! HTTP error type for gamedex-dc

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::discovery::DiscoveryError;
use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or wrong shared secret (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Metadata provider failure (502)
    #[error("Upstream error: {0}")]
    Upstream(#[from] ProviderError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<DiscoveryError> for ApiError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::SectionNotFound(id) => {
                ApiError::NotFound(format!("Section '{}' not found", id))
            }
            DiscoveryError::Provider(e) => ApiError::Upstream(e),
        }
    }
}

/// Local data failures (monthly data file) are server-side problems
impl From<gamedex_common::Error> for ApiError {
    fn from(err: gamedex_common::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Upstream(ref err) => {
                warn!(error = %err, "Provider failure surfaced to client");
                let code = match err {
                    ProviderError::Auth(_) | ProviderError::Config(_) => "PROVIDER_AUTH",
                    ProviderError::Timeout(_) => "PROVIDER_TIMEOUT",
                    _ => "PROVIDER_ERROR",
                };
                (StatusCode::BAD_GATEWAY, code, err.to_string())
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "status": "error",
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
