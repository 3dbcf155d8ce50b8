//! Sliding-window admission control for provider requests
//!
//! Keeps the timestamps of the admissions inside the trailing window. A caller
//! that would exceed the ceiling sleeps until the oldest admission leaves the
//! window. The lock is held while sleeping so waiters are admitted in arrival
//! order.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{ProviderError, ProviderResult};

/// Provider ceiling (requests per second)
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 4;

const WINDOW: Duration = Duration::from_secs(1);

pub struct RateLimiter {
    admissions: Mutex<VecDeque<Instant>>,
    ceiling: usize,
    window: Duration,
}

impl RateLimiter {
    /// Limiter admitting at most `requests_per_second` calls per trailing second
    pub fn new(requests_per_second: u32) -> Self {
        Self::with_window(requests_per_second, WINDOW)
    }

    pub fn with_window(ceiling: u32, window: Duration) -> Self {
        let ceiling = ceiling.max(1) as usize;
        Self {
            admissions: Mutex::new(VecDeque::with_capacity(ceiling)),
            ceiling,
            window,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Wait until one more call fits in the window, then record it
    ///
    /// Cancel-safe: a future dropped while waiting records nothing.
    pub async fn admit(&self) {
        let mut admissions = self.admissions.lock().await;

        loop {
            let now = Instant::now();
            while let Some(&oldest) = admissions.front() {
                if now.duration_since(oldest) >= self.window {
                    admissions.pop_front();
                } else {
                    break;
                }
            }

            if admissions.len() < self.ceiling {
                admissions.push_back(now);
                return;
            }

            // Non-empty: len >= ceiling >= 1
            let oldest = admissions[0];
            let wait_time = (oldest + self.window).saturating_duration_since(now);
            tracing::debug!("Rate limiting: waiting {:?}", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }

    /// [`admit`](Self::admit) with an upper bound on the wait
    pub async fn admit_within(&self, timeout: Duration) -> ProviderResult<()> {
        tokio::time::timeout(timeout, self.admit())
            .await
            .map_err(|_| ProviderError::Timeout(timeout))
    }

    /// Admissions currently inside the trailing window
    pub async fn in_window(&self) -> usize {
        let now = Instant::now();
        self.admissions
            .lock()
            .await
            .iter()
            .filter(|at| now.duration_since(**at) < self.window)
            .count()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND)
    }
}
