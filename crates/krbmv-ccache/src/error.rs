use std::path::PathBuf;

use krbmv_types::{CacheType, TypeError};

/// Errors from credential cache operations.
///
/// An empty cache is not an error: principal lookups report it as
/// `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum CcacheError {
    /// The name has no usable type prefix.
    #[error("invalid cache name: {0}")]
    InvalidName(#[from] TypeError),

    /// The residual is not valid for the cache type.
    #[error("malformed {cache_type} cache name {name:?}: {reason}")]
    MalformedName {
        cache_type: CacheType,
        name: String,
        reason: String,
    },

    /// The cache does not exist.
    #[error("credential cache not found: {0}")]
    NotFound(String),

    /// A store was attempted before the cache was initialized.
    #[error("credential cache {0} is not initialized")]
    NotInitialized(String),

    /// The DIR collection names an invalid primary cache.
    #[error("invalid primary cache {primary:?} in {dir}")]
    InvalidPrimary { dir: PathBuf, primary: String },

    /// A unique cache was requested but the default cache is not of that type.
    #[error("cannot create a new {0} cache: the default cache is not a {0} cache")]
    NoCollection(CacheType),

    /// The file format version is not supported.
    #[error("unsupported credential cache format version {0:#06x}")]
    UnsupportedVersion(u16),

    /// The cache contents cannot be decoded.
    #[error("corrupt credential cache at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },

    /// A field is too large to be encoded.
    #[error("field of {0} bytes exceeds the cache format limit")]
    FieldTooLarge(usize),

    /// A MEMORY cache lock was poisoned.
    #[error("memory cache lock poisoned: {0}")]
    LockPoisoned(String),

    /// I/O error from the underlying file system.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CcacheError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| CcacheError::Io { path, source }
    }
}

/// Result alias for credential cache operations.
pub type CcacheResult<T> = Result<T, CcacheError>;
