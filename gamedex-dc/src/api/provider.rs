//! Provider pass-through and rate-limit status

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/provider/rate-limit
pub async fn rate_limit(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "rateLimit": state.client.rate_limit_info(),
        "admittedLastSecond": state.client.limiter().in_window().await,
    }))
}

/// POST /api/v4/*endpoint
///
/// Forwards the body as a provider query. Rate limited and authenticated
/// like every other provider call, never cached.
pub async fn passthrough(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    body: String,
) -> ApiResult<Json<Value>> {
    let endpoint = endpoint.trim_matches('/');
    if endpoint.is_empty() || endpoint.split('/').any(|part| part == ".." || part.is_empty()) {
        return Err(ApiError::BadRequest(format!("Invalid endpoint: {}", endpoint)));
    }

    let data = state.client.query_raw(endpoint, &body).await?;
    Ok(Json(data))
}
