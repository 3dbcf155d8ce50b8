//! gamedex-dc (Discovery & Cache) - Main entry point
//!
//! Serves curated game sections and catalogue lookups from a tiered cache in
//! front of the metadata provider.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamedex_common::config::{default_config_path, load_toml_config, read_toml_config};
use gamedex_dc::cache::{spawn_sweeper, DiskTier, MemoryTier, RedisTier, TieredCache};
use gamedex_dc::cache::shared::DEFAULT_OP_TIMEOUT;
use gamedex_dc::config::ServiceConfig;
use gamedex_dc::discovery::spawn_refresh_loop;
use gamedex_dc::provider::ProviderClient;
use gamedex_dc::{build_router, AppState};

const MODULE_NAME: &str = "gamedex-dc";

/// Command-line arguments for gamedex-dc
#[derive(Parser, Debug)]
#[command(name = "gamedex-dc")]
#[command(about = "Discovery & Cache service for GameDex")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "GAMEDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long, env = "GAMEDEX_DC_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME));

    // Peek at the configured log level; the file is loaded (and any problem
    // with it reported) once tracing is up
    let configured_level = config_path
        .as_deref()
        .and_then(|path| read_toml_config(path).ok())
        .and_then(|toml| toml.logging.level);
    let default_filter = match configured_level {
        Some(level) => format!("gamedex_dc={},tower_http={}", level, level),
        None => "gamedex_dc=info,tower_http=info".to_string(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting GameDex Discovery & Cache (gamedex-dc) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    let toml = config_path
        .as_deref()
        .map(load_toml_config)
        .unwrap_or_default();

    let config = ServiceConfig::resolve(args.bind, &toml);

    // Cache tiers: memory → redis (optional) → disk
    let memory = Arc::new(MemoryTier::new(config.cache.ttl));
    let mut cache = TieredCache::new(memory);

    if let Some(url) = &config.cache.redis_url {
        match RedisTier::connect(url, config.cache.ttl, DEFAULT_OP_TIMEOUT).await {
            Ok((tier, failure)) => {
                if let Some(e) = failure {
                    warn!("Redis unavailable ({}); shared cache tier will reconnect lazily", e);
                }
                cache = cache.with_tier(Arc::new(tier));
            }
            Err(e) => warn!("Invalid REDIS_URL ({}); continuing without shared cache tier", e),
        }
    } else {
        info!("No REDIS_URL configured; shared cache tier disabled");
    }

    info!("Disk cache directory: {}", config.cache.directory.display());
    let cache = Arc::new(cache.with_tier(Arc::new(DiskTier::new(&config.cache.directory))));

    let client = Arc::new(
        ProviderClient::new(&config.provider, cache.clone())
            .context("Failed to build provider client")?,
    );
    info!(
        "Provider: {} ({} requests/second)",
        config.provider.base_url, config.provider.requests_per_second
    );

    info!("Monthly data file: {}", config.monthly_file.display());
    let state = AppState::new(
        cache.clone(),
        client,
        config.discovery.refresh_api_key.clone(),
        config.monthly_file.clone(),
    );

    // Background tasks
    let cancel = CancellationToken::new();
    let mut tasks = vec![spawn_sweeper(
        cache.clone(),
        config.cache.sweep_interval,
        cancel.clone(),
    )];
    match config.discovery.refresh_interval {
        Some(interval) => {
            info!("Scheduled discovery refresh every {:?}", interval);
            tasks.push(spawn_refresh_loop(
                state.discovery.clone(),
                interval,
                cancel.clone(),
            ));
        }
        None => info!("Scheduled discovery refresh disabled"),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!("gamedex-dc listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    for task in tasks {
        let _ = task.await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
