//! Discovery aggregator
//!
//! Serves curated sections cache-first, keeps an aggregate metadata entry
//! (names and counts of every section) and refreshes everything on demand or
//! on a timer.
//!
//! Cache keys:
//! - `discovery:{section}`: transformed game list of one section
//! - `discovery:all_sections`: aggregate metadata, derived from the above
//! - `discovery:last_refresh`: time of the last successful provider fetch

pub mod sections;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use gamedex_common::api::{DiscoveryResponse, DiscoverySectionMeta, FeaturedResponse};
use gamedex_common::GameResult;

use crate::cache::TieredCache;
use crate::provider::{ProviderClient, ProviderError};

pub use sections::{
    section_cache_key, DiscoverySection, SectionRegistry, SectionTransform, SECTION_KEY_PREFIX,
};

pub const ALL_SECTIONS_KEY: &str = "discovery:all_sections";
pub const LAST_REFRESH_KEY: &str = "discovery:last_refresh";

/// Games per section in the featured view
pub const DEFAULT_FEATURED_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Section '{0}' not found")]
    SectionNotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Section that could not be refreshed
#[derive(Debug, Clone, Serialize)]
pub struct SectionFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of a full refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    pub failed: Vec<SectionFailure>,
    /// None when no refresh has ever succeeded
    pub last_refresh: Option<DateTime<Utc>>,
    pub sections: Vec<DiscoverySectionMeta>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct DiscoveryService {
    client: Arc<ProviderClient>,
    cache: Arc<TieredCache>,
    registry: Arc<SectionRegistry>,
    /// Serializes full refreshes
    refresh_lock: Mutex<()>,
}

impl DiscoveryService {
    pub fn new(
        client: Arc<ProviderClient>,
        cache: Arc<TieredCache>,
        registry: Arc<SectionRegistry>,
    ) -> Self {
        Self {
            client,
            cache,
            registry,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.cache.get(LAST_REFRESH_KEY).await
    }

    async fn mark_refreshed(&self) -> DateTime<Utc> {
        let now = Utc::now();
        self.cache.set(LAST_REFRESH_KEY, &now).await;
        now
    }

    /// Query the provider for a section and apply its transform
    async fn fetch_section(&self, section: &DiscoverySection) -> Result<Vec<GameResult>, ProviderError> {
        let games: Vec<GameResult> = self
            .client
            .fetch(&section.endpoint, &section.query)
            .await?;
        Ok(section.apply_transform(games))
    }

    /// Games of one section, fetched and cached on first access
    pub async fn get_section_games(&self, id: &str) -> Result<DiscoveryResponse, DiscoveryError> {
        let section = self
            .registry
            .get(id)
            .ok_or_else(|| DiscoveryError::SectionNotFound(id.to_string()))?;
        let key = section.cache_key();

        let (games, last_updated) = match self.cache.get::<Vec<GameResult>>(&key).await {
            Some(games) => {
                let last_updated = self.last_refresh().await.unwrap_or_else(Utc::now);
                (games, last_updated)
            }
            None => {
                debug!(section = %id, "Section not cached, fetching");
                let games = self.fetch_section(section).await?;
                self.cache.set(&key, &games).await;
                let fetched_at = self.mark_refreshed().await;
                self.update_cached_count(section, games.len(), fetched_at).await;
                (games, fetched_at)
            }
        };

        let games: Vec<GameResult> = games
            .into_iter()
            .map(GameResult::with_normalized_cover)
            .collect();

        Ok(DiscoveryResponse {
            section: section.meta(games.len(), last_updated),
            games,
        })
    }

    /// Keep the aggregate entry (if cached) in step with a fresh section fetch
    async fn update_cached_count(&self, section: &DiscoverySection, count: usize, at: DateTime<Utc>) {
        let Some(mut metas) = self
            .cache
            .get::<Vec<DiscoverySectionMeta>>(ALL_SECTIONS_KEY)
            .await
        else {
            return;
        };

        for meta in metas.iter_mut() {
            meta.last_updated = at;
            if meta.id == section.id {
                meta.count = count;
            }
        }
        self.cache.set(ALL_SECTIONS_KEY, &metas).await;
    }

    /// Metadata of every section
    ///
    /// Cold, this fetches every uncached section. A section whose fetch fails
    /// is reported with count 0 and the aggregate is then left uncached so the
    /// next call retries.
    pub async fn get_all_sections_meta(&self) -> Vec<DiscoverySectionMeta> {
        if let Some(metas) = self
            .cache
            .get::<Vec<DiscoverySectionMeta>>(ALL_SECTIONS_KEY)
            .await
        {
            return metas;
        }

        let mut counts = Vec::with_capacity(self.registry.len());
        let mut fetched_any = false;
        let mut complete = true;

        for section in self.registry.iter() {
            let key = section.cache_key();
            let count = match self.cache.get::<Vec<GameResult>>(&key).await {
                Some(games) => games.len(),
                None => match self.fetch_section(section).await {
                    Ok(games) => {
                        self.cache.set(&key, &games).await;
                        fetched_any = true;
                        games.len()
                    }
                    Err(e) => {
                        warn!(section = %section.id, error = %e, "Section fetch failed, reporting empty");
                        complete = false;
                        0
                    }
                },
            };
            counts.push((section, count));
        }

        let last_updated = if fetched_any {
            self.mark_refreshed().await
        } else {
            self.last_refresh().await.unwrap_or_else(Utc::now)
        };

        let metas: Vec<DiscoverySectionMeta> = counts
            .into_iter()
            .map(|(section, count)| section.meta(count, last_updated))
            .collect();

        if complete {
            self.cache.set(ALL_SECTIONS_KEY, &metas).await;
        }

        metas
    }

    /// Re-fetch every section from the provider, bypassing the cache
    ///
    /// A section whose fetch fails keeps its previous cached list. The
    /// aggregate is rebuilt from the section caches afterwards without further
    /// provider calls.
    pub async fn refresh_all_sections(&self) -> RefreshReport {
        let _guard = self.refresh_lock.lock().await;
        info!(sections = self.registry.len(), "Refreshing all discovery sections");

        self.cache.delete(ALL_SECTIONS_KEY).await;

        let mut refreshed = Vec::new();
        let mut failed = Vec::new();

        for section in self.registry.iter() {
            match self.fetch_section(section).await {
                Ok(games) => {
                    debug!(section = %section.id, count = games.len(), "Section refreshed");
                    self.cache.set(&section.cache_key(), &games).await;
                    refreshed.push(section.id.clone());
                }
                Err(e) => {
                    error!(section = %section.id, error = %e, "Section refresh failed");
                    failed.push(SectionFailure {
                        id: section.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let last_refresh = if refreshed.is_empty() {
            self.last_refresh().await
        } else {
            Some(self.mark_refreshed().await)
        };

        let sections = self
            .rebuild_meta(last_refresh.unwrap_or_else(Utc::now))
            .await;

        info!(
            refreshed = refreshed.len(),
            failed = failed.len(),
            "Discovery refresh finished"
        );

        RefreshReport {
            refreshed,
            failed,
            last_refresh,
            sections,
        }
    }

    /// Recompute and cache the aggregate from section caches only
    async fn rebuild_meta(&self, last_updated: DateTime<Utc>) -> Vec<DiscoverySectionMeta> {
        let mut metas = Vec::with_capacity(self.registry.len());
        for section in self.registry.iter() {
            let count = self
                .cache
                .get::<Vec<GameResult>>(&section.cache_key())
                .await
                .map(|games| games.len())
                .unwrap_or(0);
            metas.push(section.meta(count, last_updated));
        }

        self.cache.set(ALL_SECTIONS_KEY, &metas).await;
        metas
    }

    /// Leading `limit` games of every section that has any
    ///
    /// Sections that cannot be fetched are left out of `featured`.
    pub async fn get_featured_games(&self, limit: usize) -> FeaturedResponse {
        let sections = self.get_all_sections_meta().await;
        let mut featured = BTreeMap::new();

        for meta in &sections {
            match self.get_section_games(&meta.id).await {
                Ok(response) if !response.games.is_empty() => {
                    let games: Vec<GameResult> = response.games.into_iter().take(limit).collect();
                    featured.insert(meta.id.clone(), games);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(section = %meta.id, error = %e, "Skipping section in featured view");
                }
            }
        }

        FeaturedResponse { sections, featured }
    }
}

/// Run [`DiscoveryService::refresh_all_sections`] every `interval` until
/// `cancel` fires
pub fn spawn_refresh_loop(
    service: Arc<DiscoveryService>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately; sections are fetched lazily at startup
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Discovery refresh loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let report = service.refresh_all_sections().await;
                    if !report.is_complete() {
                        warn!(failed = report.failed.len(), "Scheduled refresh incomplete");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryTier, DEFAULT_TTL};
    use crate::config::ProviderSettings;

    fn service() -> (DiscoveryService, Arc<ProviderClient>, Arc<TieredCache>) {
        let cache = Arc::new(TieredCache::new(Arc::new(MemoryTier::new(DEFAULT_TTL))));
        // Nothing listens here; any provider call fails
        let settings = ProviderSettings::new("http://127.0.0.1:1", "http://127.0.0.1:1/token")
            .with_credentials("id", "secret");
        let client = Arc::new(ProviderClient::new(&settings, cache.clone()).unwrap());
        let registry = Arc::new(SectionRegistry::new(Utc::now()));
        (
            DiscoveryService::new(client.clone(), cache.clone(), registry),
            client,
            cache,
        )
    }

    #[tokio::test]
    async fn test_unknown_section_makes_no_provider_call() {
        let (service, client, _) = service();

        let err = service.get_section_games("nonexistent").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::SectionNotFound(ref id) if id == "nonexistent"));
        assert_eq!(client.request_count(), 0);
        assert_eq!(client.limiter().in_window().await, 0);
    }

    #[tokio::test]
    async fn test_cached_section_served_with_normalized_covers() {
        let (service, client, cache) = service();
        let stored = serde_json::json!([
            {"id": 1, "name": "A", "cover": {"url": "//images.igdb.com/igdb/image/upload/t_thumb/a.jpg"}},
            {"id": 2, "name": "B"}
        ]);
        cache.set("discovery:trending", &stored).await;

        let response = service.get_section_games("trending").await.unwrap();
        assert_eq!(response.section.count, 2);
        assert_eq!(response.games.len(), 2);
        assert_eq!(
            response.games[0].cover.as_ref().unwrap().url,
            "https://images.igdb.com/igdb/image/upload/t_cover_big/a.jpg"
        );
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_provider_surfaces_error() {
        let (service, _, _) = service();
        let err = service.get_section_games("upcoming").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Provider(_)));
    }

    #[tokio::test]
    async fn test_failed_meta_is_not_cached() {
        let (service, _, cache) = service();

        let metas = service.get_all_sections_meta().await;
        assert_eq!(metas.len(), 6);
        assert!(metas.iter().all(|m| m.count == 0));
        assert!(cache.get_value(ALL_SECTIONS_KEY).await.is_none());
    }
}
