//! Metadata provider access
//!
//! All provider traffic goes through [`ProviderClient`], which owns the
//! process-wide [`RateLimiter`] and [`TokenManager`].

pub mod client;
pub mod rate_limiter;
pub mod token;

use std::time::Duration;
use thiserror::Error;

pub use client::ProviderClient;
pub use rate_limiter::{RateLimiter, DEFAULT_REQUESTS_PER_SECOND};
pub use token::{AccessToken, TokenManager, TOKEN_CACHE_KEY};

/// Provider client errors
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credential exchange failed (unreachable, rejected, or malformed reply)
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider not configured: {0}")]
    Config(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Map a transport error, keeping timeouts distinguishable
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Network(err.to_string())
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
