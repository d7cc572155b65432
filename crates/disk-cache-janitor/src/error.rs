//! Error types for the disk cache janitor

use std::fmt;

#[derive(Debug)]
pub enum JanitorError {
    Cache(disk_cache::CacheError),
    Config(String),
    Io(Box<std::io::Error>),
}

impl fmt::Display for JanitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JanitorError::Cache(err) => write!(f, "Cache error: {}", err),
            JanitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            JanitorError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for JanitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JanitorError::Cache(err) => Some(err),
            JanitorError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<disk_cache::CacheError> for JanitorError {
    fn from(err: disk_cache::CacheError) -> Self {
        JanitorError::Cache(err)
    }
}

impl From<disk_cache::ConfigError> for JanitorError {
    fn from(err: disk_cache::ConfigError) -> Self {
        JanitorError::Config(err.to_string())
    }
}

impl From<std::io::Error> for JanitorError {
    fn from(err: std::io::Error) -> Self {
        JanitorError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for JanitorError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        JanitorError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JanitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display() {
        let err = JanitorError::from(disk_cache::CacheError::AlreadyStarted);
        assert_eq!(
            format!("{}", err),
            "Cache error: Cache cleanup loop is already running"
        );
    }

    #[test]
    fn test_config_error_from_cache_config() {
        let err = JanitorError::from(disk_cache::ConfigError::ZeroCleanupInterval);
        assert_eq!(
            format!("{}", err),
            "Configuration error: cleanup interval must be > 0"
        );
    }

    #[test]
    fn test_error_is_debug() {
        let err = JanitorError::Config("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Config"));
    }
}
