//! Tiered cache orchestration
//!
//! Read path: memory → each fallback tier in order; a fallback hit is copied
//! into the memory tier. Write path: memory, then every fallback tier, each
//! independently. Failures of any tier are logged and absorbed.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gamedex_common::api::CacheStats;

use super::memory::MemoryTier;
use super::tier::{CacheTier, TierStatus};

/// Default entry lifetime for TTL-capable tiers (30 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Key/value cache over an ordered list of tiers
pub struct TieredCache {
    memory: Arc<MemoryTier>,
    /// Slower tiers, consulted in order after the memory tier
    fallbacks: Vec<Arc<dyn CacheTier>>,
    hits: AtomicU64,
    misses: AtomicU64,
    last_write: Mutex<DateTime<Utc>>,
}

impl TieredCache {
    /// Cache with only the in-process tier
    pub fn new(memory: Arc<MemoryTier>) -> Self {
        Self {
            memory,
            fallbacks: Vec::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            last_write: Mutex::new(Utc::now()),
        }
    }

    /// Append a fallback tier (consulted after all previously added tiers)
    pub fn with_tier(mut self, tier: Arc<dyn CacheTier>) -> Self {
        self.fallbacks.push(tier);
        self
    }

    /// The in-process tier
    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    /// Look up `key` and decode it as `T`
    ///
    /// A stored value that no longer decodes as `T` is reported as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value has unexpected shape, ignoring");
                None
            }
        }
    }

    /// Look up `key` as raw JSON
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        if let Ok(Some(value)) = self.memory.get(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }

        for tier in &self.fallbacks {
            match tier.get(key).await {
                Ok(Some(value)) => {
                    debug!(key = %key, tier = tier.name(), "Cache hit in fallback tier");
                    // Memory tier writes cannot fail
                    let _ = self.memory.set(key, &value).await;
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(key = %key, tier = tier.name(), error = %e, "Cache tier read failed, treating as miss");
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Write `value` under `key` to every tier
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Value not serializable, not cached");
                return;
            }
        };

        let _ = self.memory.set(key, &value).await;

        for tier in &self.fallbacks {
            if let Err(e) = tier.set(key, &value).await {
                warn!(key = %key, tier = tier.name(), error = %e, "Cache tier write failed");
            }
        }

        self.touch();
    }

    /// Remove `key` from every tier
    pub async fn delete(&self, key: &str) {
        let _ = self.memory.delete(key).await;

        for tier in &self.fallbacks {
            if let Err(e) = tier.delete(key).await {
                warn!(key = %key, tier = tier.name(), error = %e, "Cache tier delete failed");
            }
        }
    }

    /// Empty every tier and reset the hit/miss counters
    pub async fn clear(&self) {
        let _ = self.memory.clear().await;

        for tier in &self.fallbacks {
            if let Err(e) = tier.clear().await {
                warn!(tier = tier.name(), error = %e, "Cache tier clear failed");
            }
        }

        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.touch();
        info!("Cache cleared");
    }

    /// Keys currently held by the memory tier
    pub async fn keys(&self) -> Vec<String> {
        self.memory.keys().await
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            last_write: *self.last_write.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }

    /// Reachability of each tier, memory first
    pub fn tier_status(&self) -> Vec<TierStatus> {
        std::iter::once(TierStatus {
            name: self.memory.name().to_string(),
            available: true,
        })
        .chain(self.fallbacks.iter().map(|tier| TierStatus {
            name: tier.name().to_string(),
            available: tier.is_available(),
        }))
        .collect()
    }

    /// Purge expired memory-tier entries
    pub async fn sweep_expired(&self) -> usize {
        self.memory.sweep_expired().await
    }

    fn touch(&self) {
        *self.last_write.lock().unwrap_or_else(|e| e.into_inner()) = Utc::now();
    }
}

/// Periodically purge expired memory-tier entries until `cancel` fires
pub fn spawn_sweeper(
    cache: Arc<TieredCache>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Cache sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = cache.sweep_expired().await;
                    if removed > 0 {
                        debug!(removed, "Swept expired cache entries");
                    }
                }
            }
        }
    })
}
