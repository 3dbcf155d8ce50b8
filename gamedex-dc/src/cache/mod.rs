//! Tiered cache
//!
//! Three backing tiers behind one key/value contract:
//! 1. `MemoryTier`: in-process, TTL enforced actively
//! 2. `RedisTier`: optional shared external cache, TTL delegated to Redis
//! 3. `DiskTier`: one JSON file per key, no TTL
//!
//! Reads fall through the tiers in order and backfill the memory tier on a
//! lower-tier hit. Writes go to every tier independently. Tier failures are
//! values (`TierError`) that `TieredCache` logs and absorbs; they never reach
//! callers.

pub mod disk;
pub mod memory;
pub mod shared;
pub mod tier;
pub mod tiered;

pub use disk::{sanitize_key, DiskTier};
pub use memory::MemoryTier;
pub use shared::RedisTier;
pub use tier::{CacheTier, TierError, TierResult, TierStatus};
pub use tiered::{spawn_sweeper, TieredCache, DEFAULT_TTL};
