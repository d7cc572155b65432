//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of the background cleanup loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Unstarted,
    Running,
    Stopped,
}

/// Outcome of a single cleanup pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupReport {
    pub started_at: DateTime<Utc>,
    pub scanned_files: usize,
    pub scanned_bytes: u64,
    pub deleted_files: usize,
    pub deleted_bytes: u64,
    pub failed_deletions: usize,
    /// Files left after the trim, by the pass's own accounting
    pub retained_files: usize,
    pub retained_bytes: u64,
}

impl CleanupReport {
    pub(crate) fn empty() -> Self {
        Self {
            started_at: Utc::now(),
            scanned_files: 0,
            scanned_bytes: 0,
            deleted_files: 0,
            deleted_bytes: 0,
            failed_deletions: 0,
            retained_files: 0,
            retained_bytes: 0,
        }
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_errors: u64,
    pub cleanup_passes: u64,
    pub evicted_files: u64,
    pub failed_evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.cleanup_passes, 0);
    }

    #[test]
    fn test_cleanup_report_serialization() {
        let report = CleanupReport {
            scanned_files: 12,
            scanned_bytes: 4096,
            deleted_files: 2,
            deleted_bytes: 1024,
            retained_files: 10,
            retained_bytes: 3072,
            ..CleanupReport::empty()
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"deleted_files\":2"));
        assert!(json.contains("\"retained_bytes\":3072"));

        let deserialized: CleanupReport = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.scanned_files, 12);
        assert_eq!(deserialized.started_at, report.started_at);
    }

    #[test]
    fn test_cache_state_serialization() {
        let json = serde_json::to_string(&CacheState::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }
}
