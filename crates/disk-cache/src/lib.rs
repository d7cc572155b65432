//! Filesystem-backed key/value cache with periodic oldest-first eviction
//!
//! Values are stored as one file per key under a root directory. A
//! background task periodically scans the directory and removes the
//! least recently used files until the configured byte and file count
//! limits hold. File modification times serve as the recency signal and
//! are refreshed on every successful read.

mod cache;
mod config;
mod error;
mod eviction;
mod mapper;
mod types;

pub use cache::DiskCache;
pub use config::CacheConfig;
pub use error::{CacheError, ConfigError, Result};
pub use mapper::{IdentityMapper, KeyMapper, MapperKind, OpportunisticMapper};
pub use types::{CacheState, CacheStats, CleanupReport};
