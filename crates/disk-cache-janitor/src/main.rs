//! Disk cache janitor - runs the eviction loop over a cache directory
//!
//! Useful when the directory is filled by other processes (or other
//! implementations of the same file layout) and only needs its limits
//! enforced. Configuration comes from `DISK_CACHE_*` environment variables.

mod error;

use crate::error::Result;
use disk_cache::{CacheConfig, DiskCache};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("disk_cache_janitor=info".parse()?)
        .add_directive("disk_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting disk cache janitor...");

    let cache = DiskCache::new(CacheConfig::from_env()?);
    let config = cache.config();
    info!("Cache dir: {:?}", config.dir);
    info!("Max bytes: {}", config.max_bytes);
    info!("Max files: {}", config.max_files);
    info!("Cleanup interval: {:?}", config.cleanup_interval);

    cache.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    cache.stop().await;

    let stats = cache.stats();
    info!(
        passes = stats.cleanup_passes,
        evicted = stats.evicted_files,
        failed = stats.failed_evictions,
        "Disk cache janitor stopped"
    );

    Ok(())
}
