//! HTTP API for gamedex-dc

pub mod auth;
pub mod catalog;
pub mod debug;
pub mod discover;
pub mod health;
pub mod monthly;
pub mod provider;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub use auth::auth_middleware;
pub use health::health_routes;

/// Public discovery routes
pub fn discover_routes() -> Router<AppState> {
    Router::new()
        .route("/api/discover/sections", get(discover::list_sections))
        .route("/api/discover/refresh", get(discover::refresh_status))
        .route("/api/discover/debug", get(debug::inspect_cache))
        .route("/api/discover/:section", get(discover::section_games))
        .route("/api/discovery/featured", get(discover::featured_games))
}

/// Routes guarded by the shared refresh key
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/discover/refresh", post(discover::refresh_sections))
        .route("/api/discover/debug", post(debug::clear_cache))
        .route("/api/monthly-games/refresh", post(monthly::refresh_month))
}

/// Catalogue lookups
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/games/:id", get(catalog::game_detail))
        .route("/api/games/:id/similar", get(catalog::similar_games))
        .route("/api/franchises/:id", get(catalog::franchise))
}

/// Monthly subscription line-ups
pub fn monthly_routes() -> Router<AppState> {
    Router::new()
        .route("/api/monthly-games", get(monthly::recent_months))
        .route("/api/monthly-games/:year/:month", get(monthly::month_detail))
}

/// Provider pass-through and status
pub fn provider_routes() -> Router<AppState> {
    Router::new()
        .route("/api/provider/rate-limit", get(provider::rate_limit))
        .route("/api/v4/*endpoint", post(provider::passthrough))
}
