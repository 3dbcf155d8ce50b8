//! Shared external cache tier (Redis)
//!
//! Values are stored as JSON strings with the same TTL as the memory tier.
//! The connection is established lazily: if Redis is down at startup the
//! tier keeps retrying, at most once per `RECONNECT_INTERVAL`, and every
//! operation in between fails fast so the tiered cache treats it as a miss.
//! Once connected, the connection manager reconnects on its own.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use super::tier::{CacheTier, TierError, TierResult};

/// Default bound on a single Redis round trip
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Minimum spacing between connection attempts while Redis is unreachable
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(30);

/// Redis-backed cache tier
pub struct RedisTier {
    client: redis::Client,
    conn: RwLock<Option<ConnectionManager>>,
    last_attempt: Mutex<Option<Instant>>,
    ttl: Duration,
    op_timeout: Duration,
    available: AtomicBool,
}

impl RedisTier {
    /// Tier for the server at `url`, not yet connected
    ///
    /// Fails only if the URL is malformed.
    pub fn new(url: &str, ttl: Duration, op_timeout: Duration) -> TierResult<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
            conn: RwLock::new(None),
            last_attempt: Mutex::new(None),
            ttl,
            op_timeout,
            available: AtomicBool::new(false),
        })
    }

    /// Build the tier and make the first connection attempt
    ///
    /// A failed attempt is returned alongside the tier, which stays usable
    /// and retries on later operations.
    pub async fn connect(
        url: &str,
        ttl: Duration,
        op_timeout: Duration,
    ) -> TierResult<(Self, Option<TierError>)> {
        let tier = Self::new(url, ttl, op_timeout)?;
        let error = tier.connection().await.err();
        Ok((tier, error))
    }

    /// Current connection, connecting first if needed and allowed
    async fn connection(&self) -> TierResult<ConnectionManager> {
        if let Some(conn) = self.conn.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut slot = self.conn.write().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        {
            let mut last = self
                .last_attempt
                .lock()
                .map_err(|_| TierError::Unavailable("reconnect state poisoned".to_string()))?;
            if let Some(at) = *last {
                if at.elapsed() < RECONNECT_INTERVAL {
                    return Err(TierError::Unavailable("waiting to reconnect".to_string()));
                }
            }
            *last = Some(Instant::now());
        }

        let attempt = tokio::time::timeout(self.op_timeout, self.client.get_connection_manager())
            .await
            .map_err(|_| TierError::Timeout(self.op_timeout))
            .and_then(|result| result.map_err(TierError::Redis));

        match attempt {
            Ok(conn) => {
                info!(ttl_secs = self.ttl.as_secs(), "Redis cache tier connected");
                self.available.store(true, Ordering::Relaxed);
                *slot = Some(conn.clone());
                Ok(conn)
            }
            Err(e) => {
                warn!(
                    "Redis connection failed ({}); retrying in {:?}",
                    e, RECONNECT_INTERVAL
                );
                self.available.store(false, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Run one Redis command with the per-operation timeout, tracking
    /// reachability for diagnostics
    async fn run<T, F>(&self, op: F) -> TierResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        let result = match tokio::time::timeout(self.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TierError::Redis(e)),
            Err(_) => Err(TierError::Timeout(self.op_timeout)),
        };

        self.available.store(result.is_ok(), Ordering::Relaxed);
        result
    }
}

#[async_trait]
impl CacheTier for RedisTier {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    async fn get(&self, key: &str) -> TierResult<Option<Value>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = self
            .run(async {
                redis::cmd("GET")
                    .arg(key)
                    .query_async::<_, Option<String>>(&mut conn)
                    .await
            })
            .await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> TierResult<()> {
        let body = serde_json::to_string(value)?;
        let ttl_secs = self.ttl.as_secs().max(1);
        let mut conn = self.connection().await?;

        self.run(async {
            redis::cmd("SET")
                .arg(key)
                .arg(body)
                .arg("EX")
                .arg(ttl_secs)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn delete(&self, key: &str) -> TierResult<()> {
        let mut conn = self.connection().await?;
        self.run(async {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn clear(&self) -> TierResult<()> {
        let mut conn = self.connection().await?;
        self.run(async {
            redis::cmd("FLUSHDB")
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }
}
