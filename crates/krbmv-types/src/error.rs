use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty cache name")]
    EmptyCacheName,

    #[error("unknown credential cache type: {0:?}")]
    UnknownCacheType(String),

    #[error("invalid principal {name:?}: {reason}")]
    InvalidPrincipal { name: String, reason: String },
}
