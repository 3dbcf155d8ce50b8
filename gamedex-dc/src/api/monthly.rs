//! Monthly subscription line-up endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use gamedex_common::monthly::{current_year_month, parse_period, Subscription};

use crate::error::{ApiError, ApiResult};
use crate::monthly::DEFAULT_MONTHS_BACK;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MonthlyQuery {
    pub provider: Option<String>,
    pub months: Option<String>,
}

fn parse_provider(raw: Option<&str>) -> ApiResult<Option<Subscription>> {
    raw.filter(|p| !p.is_empty())
        .map(|p| p.parse().map_err(ApiError::BadRequest))
        .transpose()
}

fn parse_year_month(year: &str, month: &str) -> Option<(i32, u32)> {
    let year: i32 = year.trim().parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// GET /api/monthly-games?provider=&months=N
///
/// Non-empty months among the last N (default 12), counting the current one.
pub async fn recent_months(
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> ApiResult<Json<Value>> {
    let provider = parse_provider(query.provider.as_deref())?;
    let count = match query.months.as_deref() {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid months value: {}", raw)))?,
        None => DEFAULT_MONTHS_BACK,
    };

    let (year, month) = current_year_month();
    let months = state.monthly.recent(year, month, count, provider).await?;

    Ok(Json(json!({
        "status": "success",
        "months": months,
    })))
}

/// GET /api/monthly-games/:year/:month?provider=
pub async fn month_detail(
    State(state): State<AppState>,
    Path((year, month)): Path<(String, String)>,
    Query(query): Query<MonthlyQuery>,
) -> ApiResult<Json<Value>> {
    let (year, month) = parse_year_month(&year, &month)
        .ok_or_else(|| ApiError::BadRequest("Invalid year or month".to_string()))?;
    let provider = parse_provider(query.provider.as_deref())?;

    let record = state
        .monthly
        .month_for(year, month, provider)
        .await?
        .ok_or_else(|| ApiError::NotFound("No monthly games for given period".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "year": record.year,
        "month": record.month,
        "period": record.period,
        "entries": record.entries,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    pub period: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
}

/// POST /api/monthly-games/refresh?period=YYYY-MM (requires x-api-key)
///
/// Also accepts `year` + `month`; defaults to the current month.
pub async fn refresh_month(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> ApiResult<Json<Value>> {
    let (year, month) = match (&query.period, &query.year, &query.month) {
        (Some(period), _, _) => parse_period(period)
            .ok_or_else(|| ApiError::BadRequest("Invalid period. Use YYYY-MM.".to_string()))?,
        (None, Some(year), Some(month)) => parse_year_month(year, month)
            .ok_or_else(|| ApiError::BadRequest("Invalid year or month".to_string()))?,
        _ => current_year_month(),
    };

    let cleared = state.monthly.invalidate(year, month).await;

    Ok(Json(json!({
        "status": "success",
        "cleared": cleared,
    })))
}
