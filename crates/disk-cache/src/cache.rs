//! Filesystem-backed key/value store with a background eviction loop
//!
//! There is no in-memory index. Every operation goes to the directory, which
//! stays the single source of truth across restarts and crashes.

use crate::config::CacheConfig;
use crate::error::{CacheError, ConfigError, Result};
use crate::eviction::{self, Limits, TEMP_SUFFIX};
use crate::types::{CacheState, CacheStats, CleanupReport};
use std::fs::{File, FileTimes};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// A disk cache storing one file per key under a root directory.
///
/// `get` and `set` work in every state. The cleanup loop only runs between
/// [`start`](DiskCache::start) and [`stop`](DiskCache::stop); there is no
/// locking between the loop and foreground calls, so a pass may evict a value
/// right after it was written when the directory is over its limits.
pub struct DiskCache {
    inner: Arc<Inner>,
    lifecycle: Mutex<Lifecycle>,
}

struct Inner {
    config: CacheConfig,
    counters: Counters,
    temp_seq: AtomicU64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_errors: AtomicU64,
    cleanup_passes: AtomicU64,
    evicted_files: AtomicU64,
    failed_evictions: AtomicU64,
}

enum Lifecycle {
    Unstarted,
    Running(CleanupTask),
    Stopped,
}

struct CleanupTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl DiskCache {
    /// Create an unstarted cache. No I/O happens until the first call.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                counters: Counters::default(),
                temp_seq: AtomicU64::new(0),
            }),
            lifecycle: Mutex::new(Lifecycle::Unstarted),
        }
    }

    /// Configuration the cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Path of the file backing `key`, or `None` when no mapper is configured
    pub fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.inner.path_for(key)
    }

    /// Current lifecycle state of the cleanup loop
    pub async fn state(&self) -> CacheState {
        match *self.lifecycle.lock().await {
            Lifecycle::Unstarted => CacheState::Unstarted,
            Lifecycle::Running(_) => CacheState::Running,
            Lifecycle::Stopped => CacheState::Stopped,
        }
    }

    /// Validate the configuration, make sure the root exists and start the
    /// cleanup loop. On error nothing is started.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if matches!(*lifecycle, Lifecycle::Running(_)) {
            return Err(CacheError::AlreadyStarted);
        }

        let config = &self.inner.config;
        config.validate()?;
        fs::create_dir_all(&config.dir)
            .await
            .map_err(|e| CacheError::Write {
                path: config.dir.clone(),
                source: Box::new(e),
            })?;

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(cleanup_loop(self.inner.clone(), shutdown_rx));
        *lifecycle = Lifecycle::Running(CleanupTask { shutdown, handle });

        info!(
            dir = ?config.dir,
            max_bytes = config.max_bytes,
            max_files = config.max_files,
            interval_ms = config.cleanup_interval.as_millis() as u64,
            "Disk cache started"
        );
        Ok(())
    }

    /// Stop the cleanup loop and wait for it to exit.
    ///
    /// A pass already in progress is allowed to finish. Calling this on a
    /// cache that is not running does nothing.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running(task) => {
                info!(dir = ?self.inner.config.dir, "Stopping disk cache");
                let _ = task.shutdown.send(());
                if let Err(e) = task.handle.await {
                    error!(error = %e, "Cleanup loop ended abnormally");
                }
            }
            previous => {
                debug!("Stop requested on a disk cache that is not running");
                *lifecycle = previous;
            }
        }
    }

    /// Read the value for `key` and mark it as recently used.
    ///
    /// Every failure, not only absence, is reported as
    /// [`CacheError::NotFound`].
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let counters = &self.inner.counters;
        let Some(path) = self.inner.path_for(key) else {
            counters.misses.fetch_add(1, Ordering::Relaxed);
            return Err(CacheError::NotFound);
        };

        match fs::read(&path).await {
            Ok(data) => {
                touch(path).await;
                counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, size = data.len(), "Cache hit");
                Ok(data)
            }
            Err(e) => {
                counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, error = %e, "Cache miss");
                Err(CacheError::NotFound)
            }
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// The bytes are written to a hidden temp file next to the target and
    /// renamed into place, so readers never see a partial value.
    pub async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let counters = &self.inner.counters;
        let Some(path) = self.inner.path_for(key) else {
            counters.write_errors.fetch_add(1, Ordering::Relaxed);
            return Err(ConfigError::MissingMapper.into());
        };

        let tmp = self.inner.temp_path(&path);
        if let Err(e) = write_then_rename(&tmp, &path, value).await {
            counters.write_errors.fetch_add(1, Ordering::Relaxed);
            let _ = fs::remove_file(&tmp).await;
            warn!(key = %key, path = ?path, error = %e, "Failed to write cache entry");
            return Err(CacheError::Write {
                path,
                source: Box::new(e),
            });
        }

        counters.writes.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, size = value.len(), "Cached value");
        Ok(())
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        let c = &self.inner.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            writes: c.writes.load(Ordering::Relaxed),
            write_errors: c.write_errors.load(Ordering::Relaxed),
            cleanup_passes: c.cleanup_passes.load(Ordering::Relaxed),
            evicted_files: c.evicted_files.load(Ordering::Relaxed),
            failed_evictions: c.failed_evictions.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    pub(crate) async fn cleanup(&self) -> Result<CleanupReport> {
        self.inner.cleanup().await
    }
}

impl Inner {
    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let mapper = self.config.mapper.as_ref()?;
        Some(self.config.dir.join(mapper.map(key)))
    }

    fn temp_path(&self, path: &Path) -> PathBuf {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(
            ".{}.{}-{}{}",
            name,
            std::process::id(),
            seq,
            TEMP_SUFFIX
        ))
    }

    fn limits(&self) -> Limits {
        Limits {
            max_bytes: self.config.max_bytes,
            max_files: self.config.max_files,
        }
    }

    async fn cleanup(&self) -> Result<CleanupReport> {
        let dir = self.config.dir.clone();
        let limits = self.limits();
        // Temp files older than one interval belong to interrupted writes
        let temp_grace = self.config.cleanup_interval;
        let report =
            tokio::task::spawn_blocking(move || eviction::run_pass(&dir, limits, temp_grace))
                .await??;

        let c = &self.counters;
        c.cleanup_passes.fetch_add(1, Ordering::Relaxed);
        c.evicted_files
            .fetch_add(report.deleted_files as u64, Ordering::Relaxed);
        c.failed_evictions
            .fetch_add(report.failed_deletions as u64, Ordering::Relaxed);

        Ok(report)
    }
}

async fn cleanup_loop(inner: Arc<Inner>, mut shutdown: oneshot::Receiver<()>) {
    let period = inner.config.cleanup_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => match inner.cleanup().await {
                Ok(report) if report.deleted_files > 0 || report.failed_deletions > 0 => {
                    info!(
                        scanned = report.scanned_files,
                        deleted = report.deleted_files,
                        deleted_bytes = report.deleted_bytes,
                        failed = report.failed_deletions,
                        retained = report.retained_files,
                        retained_bytes = report.retained_bytes,
                        "Disk cache cleanup evicted entries"
                    );
                }
                Ok(report) => {
                    debug!(
                        scanned = report.scanned_files,
                        bytes = report.scanned_bytes,
                        "Disk cache within limits"
                    );
                }
                Err(e) => error!("Error during cleanup: {}", e),
            },
            _ = &mut shutdown => break,
        }
    }

    info!("Stopped disk cache cleanup loop");
}

async fn write_then_rename(tmp: &Path, path: &Path, value: &[u8]) -> std::io::Result<()> {
    fs::write(tmp, value).await?;
    fs::rename(tmp, path).await
}

/// Open a file so its timestamps can be set. Unix only needs ownership, so
/// read-only entries can still be refreshed there.
fn open_for_times(path: &Path) -> std::io::Result<File> {
    if cfg!(unix) {
        File::open(path)
    } else {
        File::options().write(true).open(path)
    }
}

/// Set access and modification time to now. Failures are only logged.
async fn touch(path: PathBuf) {
    let result = tokio::task::spawn_blocking(move || {
        let now = SystemTime::now();
        let times = FileTimes::new().set_accessed(now).set_modified(now);
        open_for_times(&path)?.set_times(times)
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "Failed to refresh cache entry timestamp"),
        Err(e) => debug!(error = %e, "Timestamp refresh task failed"),
    }
}
