//! OAuth client-credentials token management
//!
//! Token lookup order: held token → cached token (warm restart) → credential
//! exchange. The held-token mutex stays locked across the exchange, so
//! concurrent callers that find no valid token wait for the single in-flight
//! exchange and reuse its result.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{ProviderError, ProviderResult};
use crate::cache::TieredCache;
use crate::config::ProviderSettings;

/// Cache key for the persisted token
pub const TOKEN_CACHE_KEY: &str = "igdb_access_token";

/// Subtracted from the provider's stated lifetime
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 60;

/// Bearer token with its safety-margined expiry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Build a token from the provider's lifetime in seconds
    pub fn issued_at(token: String, issued: DateTime<Utc>, expires_in_secs: i64) -> Self {
        Self {
            token,
            expires_at: issued + ChronoDuration::seconds(expires_in_secs - EXPIRY_SAFETY_MARGIN_SECS),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

/// Identity endpoint reply
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

pub struct TokenManager {
    http: reqwest::Client,
    identity_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout: Duration,
    cache: Arc<TieredCache>,
    current: Mutex<Option<AccessToken>>,
    exchanges: AtomicU64,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, settings: &ProviderSettings, cache: Arc<TieredCache>) -> Self {
        Self {
            http,
            identity_url: settings.identity_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            timeout: settings.request_timeout,
            cache,
            current: Mutex::new(None),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Return a token that is valid right now
    pub async fn get_valid_token(&self) -> ProviderResult<String> {
        let mut current = self.current.lock().await;
        let now = Utc::now();

        if let Some(held) = current.as_ref().filter(|t| t.is_valid_at(now)) {
            return Ok(held.token.clone());
        }

        if let Some(cached) = self.cache.get::<AccessToken>(TOKEN_CACHE_KEY).await {
            if cached.is_valid_at(now) {
                debug!("Adopted cached access token");
                let token = cached.token.clone();
                *current = Some(cached);
                return Ok(token);
            }
        }

        let fresh = self.exchange().await?;
        self.cache.set(TOKEN_CACHE_KEY, &fresh).await;

        let token = fresh.token.clone();
        *current = Some(fresh);
        Ok(token)
    }

    /// Forget the held and cached token (e.g. after the provider rejected it)
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
        self.cache.delete(TOKEN_CACHE_KEY).await;
    }

    /// Number of credential exchanges performed so far
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    async fn exchange(&self) -> ProviderResult<AccessToken> {
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id.as_str(), secret.as_str()),
            _ => {
                return Err(ProviderError::Config(
                    "IGDB_CLIENT_ID and IGDB_CLIENT_SECRET must be set".to_string(),
                ))
            }
        };

        self.exchanges.fetch_add(1, Ordering::Relaxed);
        debug!("Requesting new access token");

        let issued = Utc::now();
        let response = self
            .http
            .post(&self.identity_url)
            .query(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Identity endpoint unreachable");
                ProviderError::Auth(format!("Token request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Token request rejected");
            return Err(ProviderError::Auth(format!(
                "Token request failed: {}",
                status
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Auth(format!("Malformed token response: {}", e)))?;

        if body.access_token.is_empty() {
            return Err(ProviderError::Auth("Access token is empty".to_string()));
        }

        info!(expires_in = body.expires_in, "Obtained new access token");
        Ok(AccessToken::issued_at(body.access_token, issued, body.expires_in))
    }
}
