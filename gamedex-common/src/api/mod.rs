//! Shared API types and authentication helpers
//!
//! Pure data and pure functions only; HTTP framework glue lives in the
//! services.

pub mod auth;
pub mod types;

pub use auth::{check_shared_secret, SecretError, REFRESH_KEY_HEADER};
pub use types::{
    CacheStats, DiscoveryResponse, DiscoverySectionMeta, FeaturedResponse, RateLimitInfo,
};
