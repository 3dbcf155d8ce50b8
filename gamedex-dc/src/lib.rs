//! gamedex-dc library - Discovery & Cache service
//!
//! Curated game sections, catalogue lookups, monthly subscription line-ups
//! and a tiered cache in front of a rate-limited metadata provider.

use axum::Router;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod monthly;
pub mod provider;

use cache::TieredCache;
use catalog::CatalogService;
use discovery::{DiscoveryService, SectionRegistry};
use monthly::MonthlyService;
use provider::ProviderClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TieredCache>,
    pub client: Arc<ProviderClient>,
    pub discovery: Arc<DiscoveryService>,
    pub catalog: Arc<CatalogService>,
    pub monthly: Arc<MonthlyService>,
    /// Expected `x-api-key` value for administrative routes
    pub refresh_api_key: Option<Arc<str>>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire services around a cache and provider client; section time bounds
    /// are resolved now
    pub fn new(
        cache: Arc<TieredCache>,
        client: Arc<ProviderClient>,
        refresh_api_key: Option<String>,
        monthly_file: PathBuf,
    ) -> Self {
        let registry = Arc::new(SectionRegistry::new(Utc::now()));
        let discovery = Arc::new(DiscoveryService::new(
            client.clone(),
            cache.clone(),
            registry,
        ));
        let catalog = Arc::new(CatalogService::new(client.clone(), cache.clone()));
        let monthly = Arc::new(MonthlyService::new(cache.clone(), monthly_file));

        Self {
            cache,
            client,
            discovery,
            catalog,
            monthly,
            refresh_api_key: refresh_api_key.map(Arc::from),
            started_at: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    // Administrative routes (require x-api-key)
    let protected = api::admin_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        api::auth_middleware,
    ));

    Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .merge(api::discover_routes())
        .merge(api::catalog_routes())
        .merge(api::monthly_routes())
        .merge(api::provider_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
