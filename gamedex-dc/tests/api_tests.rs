//! HTTP API integration tests
//!
//! Drives the full router against a mock provider.

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use gamedex_common::monthly::{current_year_month, months_back, period_key};
use gamedex_dc::build_router;
use helpers::{
    app_state, app_state_with_monthly, memory_cache, write_monthly_data, MockProvider,
    TEST_API_KEY,
};
use tempfile::TempDir;

async fn setup() -> (MockProvider, Router) {
    let mock = MockProvider::start().await;
    let app = build_router(app_state(&mock, memory_cache()));
    (mock, app)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn keyed_request(method: &str, uri: &str, key: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", key);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn extract_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (mock, app) = setup().await;

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "gamedex-dc");
    assert_eq!(json["cache_tiers"][0]["name"], "memory");
    assert_eq!(mock.query_count(), 0);
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test]
async fn test_list_sections() {
    let (_mock, app) = setup().await;

    let response = app
        .oneshot(test_request("GET", "/api/discover/sections"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "success");
    let sections = json["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 6);
    assert_eq!(sections[0]["id"], "upcoming");
    assert!(sections[0]["lastUpdated"].is_string());
    assert!(json["cache"]["hits"].is_u64());
}

#[tokio::test]
async fn test_section_games() {
    let (_mock, app) = setup().await;

    let response = app
        .oneshot(test_request("GET", "/api/discover/classics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["section"]["id"], "classics");
    assert_eq!(json["section"]["count"], 1);
    assert_eq!(json["games"].as_array().unwrap().len(), 1);
    assert_eq!(
        json["games"][0]["cover"]["url"],
        "https://images.igdb.com/igdb/image/upload/t_cover_big/old.jpg"
    );
}

#[tokio::test]
async fn test_unknown_section_is_404() {
    let (mock, app) = setup().await;

    let response = app
        .oneshot(test_request("GET", "/api/discover/nonexistent"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(mock.query_count(), 0);
}

#[tokio::test]
async fn test_section_provider_failure_is_502() {
    let (mock, app) = setup().await;
    mock.fail_when("sort hypes desc");

    let response = app
        .oneshot(test_request("GET", "/api/discover/trending"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = extract_json(response).await;
    assert_eq!(json["error"]["code"], "PROVIDER_ERROR");
}

#[tokio::test]
async fn test_featured_with_limit() {
    let (_mock, app) = setup().await;

    let response = app
        .oneshot(test_request("GET", "/api/discovery/featured?limit=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["sections"].as_array().unwrap().len(), 6);
    let featured = json["featured"].as_object().unwrap();
    assert_eq!(featured.len(), 6);
    assert!(featured
        .values()
        .all(|games| games.as_array().unwrap().len() == 1));
}

#[tokio::test]
async fn test_refresh_status_is_public() {
    let (_mock, app) = setup().await;

    let response = app
        .oneshot(test_request("GET", "/api/discover/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert!(json["lastRefresh"].is_null());
    assert!(json["cacheStats"].is_object());
}

// =============================================================================
// Refresh (x-api-key)
// =============================================================================

#[tokio::test]
async fn test_refresh_requires_key() {
    let (mock, app) = setup().await;

    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/discover/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(keyed_request("POST", "/api/discover/refresh", "wrong-key", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = extract_json(response).await;
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    assert_eq!(mock.query_count(), 0);
}

#[tokio::test]
async fn test_refresh_with_key() {
    let (mock, app) = setup().await;

    let response = app
        .oneshot(keyed_request("POST", "/api/discover/refresh", TEST_API_KEY, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["refreshed"].as_array().unwrap().len(), 6);
    assert!(json["failed"].as_array().unwrap().is_empty());
    assert!(json["lastRefresh"].is_string());
    assert_eq!(mock.query_count(), 6);
}

#[tokio::test]
async fn test_refresh_partial_failure() {
    let (mock, app) = setup().await;
    mock.fail_when("status = 0");

    let response = app
        .oneshot(keyed_request("POST", "/api/discover/refresh", TEST_API_KEY, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "partial");
    assert_eq!(json["failed"][0]["id"], "upcoming");
}

#[tokio::test]
async fn test_refresh_total_failure_is_502() {
    let (mock, app) = setup().await;
    mock.fail_when("limit 20;");

    let response = app
        .oneshot(keyed_request("POST", "/api/discover/refresh", TEST_API_KEY, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["failed"].as_array().unwrap().len(), 6);
}

// =============================================================================
// Debug
// =============================================================================

#[tokio::test]
async fn test_debug_inspect() {
    let (_mock, app) = setup().await;

    let response = app
        .oneshot(test_request("GET", "/api/discover/debug"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    let keys: Vec<&str> = json["cacheKeys"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(keys.contains(&"discovery:all_sections"));
    assert!(keys.contains(&"discovery:trending"));
    assert_eq!(json["tiers"][0]["available"], true);
}

#[tokio::test]
async fn test_debug_clear_requires_key_or_body() {
    let (_mock, app) = setup().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/discover/debug")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(keyed_request(
            "POST",
            "/api/discover/debug",
            TEST_API_KEY,
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = extract_json(response).await;
    assert_eq!(json["error"]["message"], "Missing key parameter");
}

#[tokio::test]
async fn test_debug_clear_without_body_is_json_400() {
    let (_mock, app) = setup().await;

    let response = app
        .clone()
        .oneshot(keyed_request("POST", "/api/discover/debug", TEST_API_KEY, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/discover/debug")
                .header("x-api-key", TEST_API_KEY)
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(extract_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_debug_clear_key_then_all() {
    let mock = MockProvider::start().await;
    let cache = memory_cache();
    let app = build_router(app_state(&mock, cache.clone()));

    cache.set("discovery:trending", &json!([])).await;
    cache.set("discovery:upcoming", &json!([])).await;

    let response = app
        .clone()
        .oneshot(keyed_request(
            "POST",
            "/api/discover/debug",
            TEST_API_KEY,
            Some(json!({"key": "discovery:trending"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache.keys().await, vec!["discovery:upcoming".to_string()]);

    let response = app
        .oneshot(keyed_request(
            "POST",
            "/api/discover/debug",
            TEST_API_KEY,
            Some(json!({"clearAll": true})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cache.keys().await.is_empty());
}

// =============================================================================
// Catalogue
// =============================================================================

#[tokio::test]
async fn test_game_detail() {
    let (mock, app) = setup().await;
    mock.respond("games", "where id = 404;", json!([]));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/games/abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/games/404"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(test_request("GET", "/api/games/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["id"], 1);
    assert_eq!(json["name"], "Old Favourite");
    assert_eq!(
        json["cover"]["url"],
        "https://images.igdb.com/igdb/image/upload/t_cover_big/old.jpg"
    );
}

#[tokio::test]
async fn test_similar_games_falls_back_to_genre() {
    let (mock, app) = setup().await;

    let response = app
        .oneshot(test_request("GET", "/api/games/1/similar"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    let games = json.as_array().unwrap();
    assert_eq!(games.len(), 2);
    assert!(games.iter().all(|g| g["similarityReason"] == "Same genre"));

    let queries = mock.queries();
    assert_eq!(queries.len(), 2);
    assert!(queries[1].1.contains("where genres = (12)"));
}

#[tokio::test]
async fn test_franchise() {
    let (mock, app) = setup().await;
    mock.respond(
        "franchises",
        "where id = 5;",
        json!([{"id": 5, "name": "Saga", "slug": "saga", "games": [1, 2]}]),
    );

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/franchises/5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["franchise"]["name"], "Saga");
    assert_eq!(json["games"].as_array().unwrap().len(), 2);

    // Unknown franchise: default mock answers [] for non-games endpoints
    let response = app
        .oneshot(test_request("GET", "/api/franchises/6"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Provider
// =============================================================================

#[tokio::test]
async fn test_passthrough_and_rate_limit() {
    let (mock, app) = setup().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v4/games")
                .body(Body::from("fields name; limit 2;"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(mock.queries()[0], ("games".to_string(), "fields name; limit 2;".to_string()));

    let response = app
        .oneshot(test_request("GET", "/api/provider/rate-limit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["rateLimit"]["limit"], 4);
    assert_eq!(json["rateLimit"]["remaining"], 3);
    assert_eq!(json["rateLimit"]["reset"], 1_700_000_000_000i64);
    assert_eq!(json["admittedLastSecond"], 1);
}

#[tokio::test]
async fn test_passthrough_rejects_traversal() {
    let (mock, app) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v4/games/../token")
                .body(Body::from("fields name;"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mock.query_count(), 0);
}

// =============================================================================
// Monthly line-ups
// =============================================================================

#[tokio::test]
async fn test_month_detail_and_provider_filter() {
    let mock = MockProvider::start().await;
    let dir = TempDir::new().unwrap();
    let path = write_monthly_data(dir.path());
    let app = build_router(app_state_with_monthly(&mock, memory_cache(), &path));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/monthly-games/2025/3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["period"], "2025-03");
    assert_eq!(json["year"], 2025);
    assert_eq!(json["month"], 3);
    assert_eq!(json["entries"].as_array().unwrap().len(), 2);
    assert_eq!(json["entries"][0]["tier"], "essential");

    let response = app
        .clone()
        .oneshot(test_request(
            "GET",
            "/api/monthly-games/2025/03?provider=epic-games-store",
        ))
        .await
        .unwrap();
    let json = extract_json(response).await;
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["games"][0]["notes"], "Free for a week");

    let response = app
        .oneshot(test_request("GET", "/api/monthly-games/2025/3?provider=steam"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Monthly data never touches the metadata provider
    assert_eq!(mock.query_count(), 0);
}

#[tokio::test]
async fn test_month_detail_errors() {
    let mock = MockProvider::start().await;
    let dir = TempDir::new().unwrap();
    let path = write_monthly_data(dir.path());
    let app = build_router(app_state_with_monthly(&mock, memory_cache(), &path));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/monthly-games/2025/13"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        extract_json(response).await["error"]["message"],
        "Invalid year or month"
    );

    let response = app
        .oneshot(test_request("GET", "/api/monthly-games/2025/2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        extract_json(response).await["error"]["message"],
        "No monthly games for given period"
    );
}

#[tokio::test]
async fn test_missing_monthly_file_is_500() {
    let (_mock, app) = setup().await;

    let response = app
        .oneshot(test_request("GET", "/api/monthly-games/2025/3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(extract_json(response).await["error"]["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_recent_months_lists_non_empty_periods() {
    let mock = MockProvider::start().await;
    let dir = TempDir::new().unwrap();

    let (year, month) = current_year_month();
    let recent = months_back(year, month, 3);
    let current = period_key(recent[0].0, recent[0].1);
    let two_ago = period_key(recent[2].0, recent[2].1);
    let path = dir.path().join("monthly.json");
    std::fs::write(
        &path,
        json!({
            current.clone(): [{"provider": "xbox-game-pass", "games": []}],
            two_ago.clone(): [{"provider": "epic-games-store", "games": []}],
            "1999-01": [{"provider": "epic-games-store", "games": []}]
        })
        .to_string(),
    )
    .unwrap();
    let app = build_router(app_state_with_monthly(&mock, memory_cache(), &path));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/monthly-games"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    let months = json["months"].as_object().unwrap();
    assert_eq!(months.len(), 2);
    assert!(months.contains_key(&current));
    assert!(months.contains_key(&two_ago));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/monthly-games?months=2"))
        .await
        .unwrap();
    let json = extract_json(response).await;
    assert_eq!(json["months"].as_object().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(test_request(
            "GET",
            "/api/monthly-games?provider=epic-games-store",
        ))
        .await
        .unwrap();
    let json = extract_json(response).await;
    let months = json["months"].as_object().unwrap();
    assert_eq!(months.keys().collect::<Vec<_>>(), vec![&two_ago]);

    let response = app
        .oneshot(test_request("GET", "/api/monthly-games?months=many"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_monthly_refresh_validates_and_clears() {
    let mock = MockProvider::start().await;
    let dir = TempDir::new().unwrap();
    let path = write_monthly_data(dir.path());
    let cache = memory_cache();
    let app = build_router(app_state_with_monthly(&mock, cache.clone(), &path));

    // Warm both cache entries
    app.clone()
        .oneshot(test_request("GET", "/api/monthly-games/2025/3"))
        .await
        .unwrap();
    assert!(cache
        .keys()
        .await
        .contains(&"monthly-games-2025-03".to_string()));

    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/monthly-games/refresh?period=2025-03"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    for bad in ["period=2025-3", "period=2025-13", "year=2025&month=0"] {
        let response = app
            .clone()
            .oneshot(keyed_request(
                "POST",
                &format!("/api/monthly-games/refresh?{}", bad),
                TEST_API_KEY,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", bad);
    }

    let response = app
        .oneshot(keyed_request(
            "POST",
            "/api/monthly-games/refresh?period=2025-03",
            TEST_API_KEY,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(
        json["cleared"],
        json!(["monthly-games-period-map", "monthly-games-2025-03"])
    );
    assert!(cache.keys().await.is_empty());
}
