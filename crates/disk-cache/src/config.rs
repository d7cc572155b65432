//! Cache configuration

use crate::error::ConfigError;
use crate::mapper::{KeyMapper, MapperKind};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_BYTES: u64 = 1 << 20; // 1MB
const DEFAULT_MAX_FILES: u64 = 256;
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for a [`DiskCache`](crate::DiskCache).
///
/// A limit of 0 disables that limit. The configuration is moved into the
/// cache on construction and cannot be changed afterwards.
#[derive(Clone)]
pub struct CacheConfig {
    /// Root directory where entries are stored
    pub dir: PathBuf,
    /// Maximum total bytes to keep when cleaning up
    pub max_bytes: u64,
    /// Maximum number of files to keep when cleaning up
    pub max_files: u64,
    /// Interval between cleanup passes
    pub cleanup_interval: Duration,
    /// Maps keys to file names
    pub mapper: Option<Arc<dyn KeyMapper>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
            max_bytes: DEFAULT_MAX_BYTES,
            max_files: DEFAULT_MAX_FILES,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            mapper: Some(MapperKind::default().build()),
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("dir", &self.dir)
            .field("max_bytes", &self.max_bytes)
            .field("max_files", &self.max_files)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("mapper", &self.mapper.as_ref().map(|_| "<mapper>"))
            .finish()
    }
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_max_files(mut self, max_files: u64) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_mapper(mut self, mapper: impl KeyMapper + 'static) -> Self {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    /// Check the constraints required to start the cleanup loop
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ZeroCleanupInterval);
        }
        if self.mapper.is_none() {
            return Err(ConfigError::MissingMapper);
        }
        Ok(())
    }

    /// Parse configuration from environment variables
    ///
    /// Unset variables fall back to the defaults; malformed or negative
    /// values are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let dir = lookup("DISK_CACHE_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.dir);

        let max_bytes =
            parse_limit(&lookup, "DISK_CACHE_MAX_BYTES")?.unwrap_or(defaults.max_bytes);
        let max_files =
            parse_limit(&lookup, "DISK_CACHE_MAX_FILES")?.unwrap_or(defaults.max_files);

        let cleanup_interval = match lookup("DISK_CACHE_CLEANUP_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| invalid("DISK_CACHE_CLEANUP_SECS", &raw))?;
                Duration::from_secs(secs)
            }
            None => defaults.cleanup_interval,
        };

        let mapper = match lookup("DISK_CACHE_MAPPER") {
            Some(raw) => raw.parse::<MapperKind>()?.build(),
            None => MapperKind::default().build(),
        };

        let config = Self {
            dir,
            max_bytes,
            max_files,
            cleanup_interval,
            mapper: Some(mapper),
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_limit<F>(lookup: &F, name: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let value = raw.trim().parse::<i64>().map_err(|_| invalid(name, &raw))?;
    if value < 0 {
        return Err(ConfigError::NegativeLimit {
            name: name.to_string(),
            value,
        });
    }
    Ok(Some(value as u64))
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}
