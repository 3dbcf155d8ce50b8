//! Game, similar-games and franchise endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::catalog::{FranchiseGames, SimilarGame};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use gamedex_common::GameResult;

fn parse_id(raw: &str, what: &str) -> ApiResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} ID: {}", what, raw)))
}

/// GET /api/games/:id
pub async fn game_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<GameResult>> {
    let id = parse_id(&id, "game")?;
    state
        .catalog
        .game_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Game not found".to_string()))
}

/// GET /api/games/:id/similar
pub async fn similar_games(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<SimilarGame>>> {
    let id = parse_id(&id, "game")?;
    state
        .catalog
        .similar_games(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Game not found".to_string()))
}

/// GET /api/franchises/:id
pub async fn franchise(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FranchiseGames>> {
    let id = parse_id(&id, "franchise")?;
    state
        .catalog
        .franchise(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Franchise not found".to_string()))
}
