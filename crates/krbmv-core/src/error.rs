use krbmv_ccache::CcacheError;
use thiserror::Error;

/// Fatal conditions of a migration run. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// No destination cache name was supplied.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A named cache cannot be opened or created.
    #[error("cannot resolve credential cache {name}: {source}")]
    CacheResolution {
        name: String,
        #[source]
        source: CcacheError,
    },

    /// The destination is a FILE cache that already holds a principal.
    #[error(
        "{name} is a FILE cache already holding principal {principal}; refusing to overwrite without force"
    )]
    UnsafeOverwrite { name: String, principal: String },

    /// Initializing the target or storing a credential failed.
    #[error("failed to copy credentials into {target}: {source}")]
    Copy {
        target: String,
        #[source]
        source: CcacheError,
    },
}

pub type MigrateResult<T> = Result<T, MigrateError>;
