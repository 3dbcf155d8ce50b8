//! Cache tier trait and per-tier error type

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors a single tier can report
///
/// None of these are fatal to a cache operation: the tiered cache treats a
/// failed read as a miss for that tier and a failed write as logged-only.
#[derive(Debug, Error)]
pub enum TierError {
    #[error("Tier unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type TierResult<T> = Result<T, TierError>;

/// One backing store layer of the tiered cache
///
/// Values are JSON documents. Implementations must be safe to call
/// concurrently; a single `set` must be atomic from a reader's point of view
/// (readers see the old or the new value, never a partial one).
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Tier identifier for logs and diagnostics (e.g., "memory", "redis", "disk")
    fn name(&self) -> &'static str;

    /// Whether the tier believes its backend is reachable
    fn is_available(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> TierResult<Option<Value>>;

    async fn set(&self, key: &str, value: &Value) -> TierResult<()>;

    /// Remove one key; removing an absent key is not an error
    async fn delete(&self, key: &str) -> TierResult<()>;

    /// Remove every key this tier holds
    async fn clear(&self) -> TierResult<()>;
}

/// Tier diagnostic entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierStatus {
    pub name: String,
    pub available: bool,
}
