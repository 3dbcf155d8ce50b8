//! Cache inspection endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/discover/debug
pub async fn inspect_cache(State(state): State<AppState>) -> Json<Value> {
    let sections = state.discovery.get_all_sections_meta().await;
    let keys = state.cache.keys().await;

    Json(json!({
        "status": "success",
        "cacheStats": state.cache.stats(),
        "cacheKeys": keys,
        "tiers": state.cache.tier_status(),
        "sections": sections,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub clear_all: bool,
}

/// POST /api/discover/debug (requires x-api-key)
///
/// `{"clearAll": true}` empties every tier; `{"key": "..."}` drops one key.
pub async fn clear_cache(
    State(state): State<AppState>,
    payload: Result<Json<ClearRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    if request.clear_all {
        state.cache.clear().await;
        return Ok(Json(json!({
            "status": "success",
            "message": "All cache cleared",
        })));
    }

    match request.key.filter(|key| !key.is_empty()) {
        Some(key) => {
            state.cache.delete(&key).await;
            info!(key = %key, "Cache key cleared");
            Ok(Json(json!({
                "status": "success",
                "message": format!("Cleared cache for key: {}", key),
            })))
        }
        None => Err(ApiError::BadRequest("Missing key parameter".to_string())),
    }
}
