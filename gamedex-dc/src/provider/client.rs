//! Metadata provider client
//!
//! Single choke point for provider traffic: cache lookup, rate-limit
//! admission, token, request, cache write. Requests carry the provider's query
//! language as a plain-text body and return JSON arrays.

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use gamedex_common::api::RateLimitInfo;
use gamedex_common::time::now_millis;

use super::rate_limiter::RateLimiter;
use super::token::TokenManager;
use super::{ProviderError, ProviderResult};
use crate::cache::TieredCache;
use crate::config::ProviderSettings;

const USER_AGENT: &str = concat!("gamedex-dc/", env!("CARGO_PKG_VERSION"));

pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
    timeout: Duration,
    limiter: Arc<RateLimiter>,
    tokens: Arc<TokenManager>,
    cache: Arc<TieredCache>,
    rate_limit: Mutex<RateLimitInfo>,
    requests: AtomicU64,
}

impl ProviderClient {
    pub fn new(settings: &ProviderSettings, cache: Arc<TieredCache>) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let limiter = Arc::new(RateLimiter::new(settings.requests_per_second));
        let tokens = Arc::new(TokenManager::new(http.clone(), settings, cache.clone()));

        Ok(Self::with_parts(http, settings, limiter, tokens, cache))
    }

    /// Build around an existing limiter and token manager
    pub fn with_parts(
        http: reqwest::Client,
        settings: &ProviderSettings,
        limiter: Arc<RateLimiter>,
        tokens: Arc<TokenManager>,
        cache: Arc<TieredCache>,
    ) -> Self {
        let ceiling = limiter.ceiling() as u32;
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            timeout: settings.request_timeout,
            limiter,
            tokens,
            cache,
            rate_limit: Mutex::new(RateLimitInfo {
                limit: ceiling,
                remaining: ceiling,
                reset: now_millis() + 1000,
            }),
            requests: AtomicU64::new(0),
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    /// Provider requests actually sent (cache hits excluded)
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Last rate-limit state reported by the provider
    pub fn rate_limit_info(&self) -> RateLimitInfo {
        *self.rate_limit.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Query `endpoint` with `body`, cache-first when `cache_key` is given
    ///
    /// A cache hit costs neither a rate-limit admission nor a token.
    pub async fn query<T>(&self, endpoint: &str, body: &str, cache_key: Option<&str>) -> ProviderResult<T>
    where
        T: DeserializeOwned + Serialize,
    {
        if let Some(key) = cache_key {
            if let Some(cached) = self.cache.get::<T>(key).await {
                debug!(key = %key, "Provider query served from cache");
                return Ok(cached);
            }
        }

        let data: T = self.fetch(endpoint, body).await?;

        if let Some(key) = cache_key {
            self.cache.set(key, &data).await;
        }

        Ok(data)
    }

    /// Uncached query decoded as `T`
    pub async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, body: &str) -> ProviderResult<T> {
        let raw = self.send(endpoint, body).await?;
        serde_json::from_value(raw).map_err(|e| {
            ProviderError::Parse(format!("Unexpected response shape from {}: {}", endpoint, e))
        })
    }

    /// Uncached query returning the provider's JSON untouched
    pub async fn query_raw(&self, endpoint: &str, body: &str) -> ProviderResult<Value> {
        self.send(endpoint, body).await
    }

    async fn send(&self, endpoint: &str, body: &str) -> ProviderResult<Value> {
        let client_id = self.client_id.as_deref().ok_or_else(|| {
            ProviderError::Config("IGDB_CLIENT_ID is not configured".to_string())
        })?;

        // Bounded like the request itself
        self.limiter.admit_within(self.timeout).await?;
        let token = self.tokens.get_valid_token().await?;

        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        debug!(endpoint = %endpoint, "Querying provider");
        self.requests.fetch_add(1, Ordering::Relaxed);

        let response = self
            .http
            .post(&url)
            .header("Client-ID", client_id)
            .bearer_auth(&token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "text/plain")
            .body(body.to_string())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, self.timeout))?;

        self.record_rate_limit(response.headers());

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            let message = response.text().await.unwrap_or_default();
            warn!(endpoint = %endpoint, status = status.as_u16(), "Provider request failed");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }

    /// Keep the provider's view of our quota; all three headers or nothing
    fn record_rate_limit(&self, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
        };

        if let (Some(limit), Some(remaining), Some(reset)) = (
            header("x-ratelimit-limit"),
            header("x-ratelimit-remaining"),
            header("x-ratelimit-reset"),
        ) {
            let info = RateLimitInfo {
                limit: limit.clamp(0, u32::MAX as i64) as u32,
                remaining: remaining.clamp(0, u32::MAX as i64) as u32,
                // Header is in seconds
                reset: reset.saturating_mul(1000),
            };
            *self.rate_limit.lock().unwrap_or_else(|e| e.into_inner()) = info;
        }
    }
}
