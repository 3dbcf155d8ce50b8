//! Running configuration for gamedex-dc
//!
//! Resolution order for every setting: command line → environment → TOML file
//! → compiled default. Missing provider credentials are not a startup error;
//! provider calls fail with a configuration error instead.

use gamedex_common::config::{default_data_dir, env_var, resolve_setting, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::DEFAULT_TTL;
use crate::provider::DEFAULT_REQUESTS_PER_SECOND;

pub const DEFAULT_BIND: &str = "127.0.0.1:5740";
pub const DEFAULT_PROVIDER_URL: &str = "https://api.igdb.com/v4";
pub const DEFAULT_IDENTITY_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_MONTHLY_FILE: &str = "monthly-games.json";

/// Metadata provider connection settings
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: String,
    pub identity_url: String,
    /// Bound on each identity/provider HTTP call
    pub request_timeout: Duration,
    pub requests_per_second: u32,
}

impl ProviderSettings {
    /// Settings pointing at a custom provider/identity pair (used by tests and
    /// local mocks)
    pub fn new(base_url: impl Into<String>, identity_url: impl Into<String>) -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: base_url.into(),
            identity_url: identity_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }

    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER_URL, DEFAULT_IDENTITY_URL)
    }
}

/// Tiered cache settings
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub directory: PathBuf,
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

/// Discovery settings
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub refresh_api_key: Option<String>,
    /// None disables the background refresh loop
    pub refresh_interval: Option<Duration>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: String,
    pub provider: ProviderSettings,
    pub cache: CacheSettings,
    pub discovery: DiscoverySettings,
    /// Monthly subscription data file
    pub monthly_file: PathBuf,
    /// Default log filter when RUST_LOG is unset
    pub log_level: Option<String>,
}

impl ServiceConfig {
    /// Resolve the running configuration
    ///
    /// `cli_bind` has already absorbed `GAMEDEX_DC_BIND` through clap.
    pub fn resolve(cli_bind: Option<String>, toml: &TomlConfig) -> Self {
        let bind = cli_bind
            .or_else(|| toml.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let provider = ProviderSettings {
            client_id: resolve_setting(
                "Provider client id",
                "IGDB_CLIENT_ID",
                toml.provider.client_id.as_ref(),
            ),
            client_secret: resolve_setting(
                "Provider client secret",
                "IGDB_CLIENT_SECRET",
                toml.provider.client_secret.as_ref(),
            ),
            base_url: resolve_setting(
                "Provider base URL",
                "GAMEDEX_PROVIDER_URL",
                toml.provider.base_url.as_ref(),
            )
            .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
            identity_url: resolve_setting(
                "Identity URL",
                "GAMEDEX_IDENTITY_URL",
                toml.provider.identity_url.as_ref(),
            )
            .unwrap_or_else(|| DEFAULT_IDENTITY_URL.to_string()),
            request_timeout: toml
                .provider
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            requests_per_second: toml
                .provider
                .requests_per_second
                .filter(|rps| *rps > 0)
                .unwrap_or(DEFAULT_REQUESTS_PER_SECOND),
        };

        if provider.client_id.is_none() || provider.client_secret.is_none() {
            warn!("Provider credentials not configured; section fetches will fail until IGDB_CLIENT_ID and IGDB_CLIENT_SECRET are set");
        }

        let cache = CacheSettings {
            redis_url: resolve_setting("Redis URL", "REDIS_URL", toml.cache.redis_url.as_ref()),
            directory: env_var("GAMEDEX_CACHE_DIR")
                .map(PathBuf::from)
                .or_else(|| toml.cache.directory.clone())
                .unwrap_or_else(|| default_data_dir().join("cache")),
            ttl: toml
                .cache
                .ttl_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TTL),
            sweep_interval: toml
                .cache
                .sweep_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
        };

        let refresh_api_key = resolve_setting(
            "Discovery refresh key",
            "DISCOVERY_API_KEY",
            toml.discovery.refresh_api_key.as_ref(),
        );
        if refresh_api_key.is_none() {
            info!("No discovery refresh key configured; manual refresh is disabled");
        }

        let discovery = DiscoverySettings {
            refresh_api_key,
            refresh_interval: match toml.discovery.refresh_interval_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => Some(DEFAULT_REFRESH_INTERVAL),
            },
        };

        let monthly_file = env_var("GAMEDEX_MONTHLY_FILE")
            .map(PathBuf::from)
            .or_else(|| toml.monthly.data_file.clone())
            .unwrap_or_else(|| default_data_dir().join(DEFAULT_MONTHLY_FILE));

        Self {
            bind,
            provider,
            cache,
            discovery,
            monthly_file,
            log_level: toml.logging.level.clone(),
        }
    }
}
