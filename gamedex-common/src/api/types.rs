//! Shared API request/response types
//!
//! Field names are camelCase on the wire to match what the web front end
//! already consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::games::GameResult;

// ========================================
// Discovery Types
// ========================================

/// Derived, countable view of one discovery section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySectionMeta {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of games currently cached for the section
    pub count: usize,
    /// When the section data was last refreshed from the provider
    pub last_updated: DateTime<Utc>,
}

/// One section with its games
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryResponse {
    pub section: DiscoverySectionMeta,
    pub games: Vec<GameResult>,
}

/// First few games of every section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturedResponse {
    pub sections: Vec<DiscoverySectionMeta>,
    /// Section id -> leading games of that section
    pub featured: BTreeMap<String, Vec<GameResult>>,
}

// ========================================
// Observability Types
// ========================================

/// Cache hit/miss counters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Last successful `set` (or last `clear`)
    pub last_write: DateTime<Utc>,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Rate-limit state reported by the provider's response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Window reset, Unix epoch milliseconds
    pub reset: i64,
}
