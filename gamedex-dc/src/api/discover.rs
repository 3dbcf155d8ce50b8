//! Discovery section endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::discovery::DEFAULT_FEATURED_LIMIT;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/discover/sections
pub async fn list_sections(State(state): State<AppState>) -> Json<Value> {
    let sections = state.discovery.get_all_sections_meta().await;

    Json(json!({
        "status": "success",
        "sections": sections,
        "cache": state.cache.stats(),
    }))
}

/// GET /api/discover/:section
pub async fn section_games(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> ApiResult<Json<Value>> {
    let response = state.discovery.get_section_games(&section).await?;

    Ok(Json(json!({
        "status": "success",
        "section": response.section,
        "games": response.games,
    })))
}

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<usize>,
}

/// GET /api/discovery/featured?limit=N
pub async fn featured_games(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> Json<Value> {
    let limit = query.limit.unwrap_or(DEFAULT_FEATURED_LIMIT);
    let featured = state.discovery.get_featured_games(limit).await;

    Json(json!({
        "status": "success",
        "sections": featured.sections,
        "featured": featured.featured,
    }))
}

/// GET /api/discover/refresh
pub async fn refresh_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "lastRefresh": state.discovery.last_refresh().await,
        "cacheStats": state.cache.stats(),
    }))
}

/// POST /api/discover/refresh (requires x-api-key)
///
/// 200 when at least one section refreshed ("partial" if some failed), 502
/// when every section failed.
pub async fn refresh_sections(State(state): State<AppState>) -> Response {
    let report = state.discovery.refresh_all_sections().await;

    let (status, label, message) = if report.is_complete() {
        (
            StatusCode::OK,
            "success",
            "Discovery sections refreshed successfully",
        )
    } else if !report.refreshed.is_empty() {
        (
            StatusCode::OK,
            "partial",
            "Some discovery sections could not be refreshed",
        )
    } else {
        (
            StatusCode::BAD_GATEWAY,
            "error",
            "Failed to refresh discovery sections",
        )
    };

    (
        status,
        Json(json!({
            "status": label,
            "message": message,
            "lastRefresh": report.last_refresh,
            "refreshed": report.refreshed,
            "failed": report.failed,
            "sections": report.sections,
            "cacheStats": state.cache.stats(),
        })),
    )
        .into_response()
}
