//! Shared-secret middleware for administrative routes
//!
//! The caller must send the configured key in `x-api-key`. With no key
//! configured, administrative routes always answer 401.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use gamedex_common::api::{check_shared_secret, REFRESH_KEY_HEADER};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(REFRESH_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = check_shared_secret(provided, state.refresh_api_key.as_deref()) {
        warn!(path = %request.uri().path(), reason = %e, "Rejected administrative request");
        return Err(ApiError::Unauthorized("Unauthorized".to_string()));
    }

    Ok(next.run(request).await)
}
