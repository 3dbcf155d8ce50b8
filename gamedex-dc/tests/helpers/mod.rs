//! Shared test fixtures: a local mock of the identity and provider endpoints
//!
//! The mock answers `POST /token` with a bearer token and `POST /v4/*endpoint`
//! from a rule table. Rules match on endpoint plus a substring of the query
//! body; the first match wins. Unmatched `games` queries get the default
//! two-game fixture, anything else an empty array.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::path::{Path as FsPath, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gamedex_dc::cache::{MemoryTier, TieredCache, DEFAULT_TTL};
use gamedex_dc::config::ProviderSettings;
use gamedex_dc::provider::ProviderClient;
use gamedex_dc::AppState;

pub const TEST_API_KEY: &str = "test-refresh-key";

/// Released 2000-01-01 with plenty of ratings; survives the classics filter
pub fn classic_game() -> Value {
    json!({
        "id": 1,
        "name": "Old Favourite",
        "cover": {"id": 11, "url": "//images.igdb.com/igdb/image/upload/t_thumb/old.jpg"},
        "first_release_date": 946_684_800,
        "total_rating": 92.5,
        "total_rating_count": 1500,
        "genres": [{"id": 12, "name": "Role-playing (RPG)"}]
    })
}

/// Released recently with few ratings
pub fn recent_game() -> Value {
    json!({
        "id": 2,
        "name": "New Release",
        "cover": {"id": 22, "url": "//images.igdb.com/igdb/image/upload/t_thumb/new.jpg"},
        "first_release_date": chrono::Utc::now().timestamp() - 86_400,
        "total_rating": 81.0,
        "total_rating_count": 12,
        "platforms": [{"id": 6, "name": "PC (Microsoft Windows)"}]
    })
}

struct Rule {
    endpoint: String,
    needle: String,
    response: Value,
}

#[derive(Default)]
struct Inner {
    token_calls: AtomicUsize,
    query_calls: AtomicUsize,
    queries: Mutex<Vec<(String, String)>>,
    rules: Mutex<Vec<Rule>>,
    failing: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
struct MockState(Arc<Inner>);

pub struct MockProvider {
    pub base_url: String,
    state: MockState,
}

async fn token(State(state): State<MockState>) -> Json<Value> {
    let n = state.0.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("mock-token-{}", n),
        "expires_in": 3600,
        "token_type": "bearer"
    }))
}

async fn query(
    State(state): State<MockState>,
    Path(endpoint): Path<String>,
    body: String,
) -> Response {
    state.0.query_calls.fetch_add(1, Ordering::SeqCst);
    state
        .0
        .queries
        .lock()
        .unwrap()
        .push((endpoint.clone(), body.clone()));

    let failing = state.0.failing.lock().unwrap();
    if failing.iter().any(|needle| body.contains(needle.as_str())) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "mock failure").into_response();
    }
    drop(failing);

    let rules = state.0.rules.lock().unwrap();
    if let Some(rule) = rules
        .iter()
        .find(|rule| rule.endpoint == endpoint && body.contains(rule.needle.as_str()))
    {
        return Json(rule.response.clone()).into_response();
    }

    let default = if endpoint == "games" {
        json!([classic_game(), recent_game()])
    } else {
        json!([])
    };

    (
        [
            ("x-ratelimit-limit", "4"),
            ("x-ratelimit-remaining", "3"),
            ("x-ratelimit-reset", "1700000000"),
        ],
        Json(default),
    )
        .into_response()
}

impl MockProvider {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/token", post(token))
            .route("/v4/*endpoint", post(query))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn settings(&self) -> ProviderSettings {
        ProviderSettings::new(
            format!("{}/v4", self.base_url),
            format!("{}/token", self.base_url),
        )
        .with_credentials("test-client", "test-secret")
    }

    /// Answer `endpoint` queries whose body contains `needle` with `response`
    pub fn respond(&self, endpoint: &str, needle: &str, response: Value) {
        self.state.0.rules.lock().unwrap().push(Rule {
            endpoint: endpoint.to_string(),
            needle: needle.to_string(),
            response,
        });
    }

    /// Fail every query whose body contains `needle` with a 500
    pub fn fail_when(&self, needle: &str) {
        self.state.0.failing.lock().unwrap().push(needle.to_string());
    }

    pub fn heal(&self) {
        self.state.0.failing.lock().unwrap().clear();
    }

    pub fn query_count(&self) -> usize {
        self.state.0.query_calls.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.state.0.token_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.state.0.queries.lock().unwrap().clone()
    }
}

/// Memory-only cache
pub fn memory_cache() -> Arc<TieredCache> {
    Arc::new(TieredCache::new(Arc::new(MemoryTier::new(DEFAULT_TTL))))
}

/// App state wired to the mock with the test refresh key
///
/// The monthly data file does not exist.
pub fn app_state(mock: &MockProvider, cache: Arc<TieredCache>) -> AppState {
    let missing = std::env::temp_dir().join("gamedex-test-no-monthly-data.json");
    app_state_with_monthly(mock, cache, &missing)
}

pub fn app_state_with_monthly(
    mock: &MockProvider,
    cache: Arc<TieredCache>,
    monthly_file: &FsPath,
) -> AppState {
    let client = Arc::new(ProviderClient::new(&mock.settings(), cache.clone()).unwrap());
    AppState::new(
        cache,
        client,
        Some(TEST_API_KEY.to_string()),
        PathBuf::from(monthly_file),
    )
}

/// Write a two-period monthly data file into `dir`
pub fn write_monthly_data(dir: &FsPath) -> PathBuf {
    let path = dir.join("monthly-games.json");
    let data = json!({
        "2024-12": [
            {"provider": "xbox-game-pass", "games": [{"igdbId": 7, "startDate": "2024-12-03"}]}
        ],
        "2025-03": [
            {"provider": "playstation-plus", "tier": "essential",
             "games": [{"igdbId": 1, "startDate": "2025-03-04", "endDate": "2025-04-01"}]},
            {"provider": "epic-games-store",
             "games": [{"igdbId": 2, "startDate": "2025-03-13", "notes": "Free for a week"}]}
        ]
    });
    std::fs::write(&path, data.to_string()).unwrap();
    path
}
