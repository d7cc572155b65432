//! Error types for the disk cache

use std::fmt;
use std::path::PathBuf;

/// A configuration value that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroCleanupInterval,
    MissingMapper,
    NegativeLimit { name: String, value: i64 },
    InvalidValue { name: String, value: String },
    UnknownMapper(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroCleanupInterval => write!(f, "cleanup interval must be > 0"),
            ConfigError::MissingMapper => write!(f, "key mapper must be set"),
            ConfigError::NegativeLimit { name, value } => {
                write!(f, "{} cannot be < 0 (got {})", name, value)
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "invalid value for {}: {:?}", name, value)
            }
            ConfigError::UnknownMapper(name) => write!(f, "unknown key mapper: {:?}", name),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub enum CacheError {
    Config(ConfigError),
    /// Returned by `get` for every read failure, including absence
    NotFound,
    Write {
        path: PathBuf,
        source: Box<std::io::Error>,
    },
    Scan {
        path: PathBuf,
        source: Box<std::io::Error>,
    },
    AlreadyStarted,
    Join(String),
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Config(err) => write!(f, "Configuration error: {}", err),
            CacheError::NotFound => write!(f, "Item not found"),
            CacheError::Write { path, source } => {
                write!(f, "Write error for {}: {}", path.display(), source)
            }
            CacheError::Scan { path, source } => {
                write!(f, "Scan error in {}: {}", path.display(), source)
            }
            CacheError::AlreadyStarted => write!(f, "Cache cleanup loop is already running"),
            CacheError::Join(msg) => write!(f, "Background task failed: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Config(err) => Some(err),
            CacheError::Write { source, .. } => Some(source.as_ref()),
            CacheError::Scan { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<ConfigError> for CacheError {
    fn from(err: ConfigError) -> Self {
        CacheError::Config(err)
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        CacheError::Join(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
