//! Cache resolution with errors classified for the migration run.

use krbmv_ccache::CacheStore;
use krbmv_types::{CacheName, CacheType};

use crate::error::{MigrateError, MigrateResult};

/// Open the cache named `name`.
pub fn resolve<S: CacheStore>(store: &S, name: &CacheName) -> MigrateResult<S::Cache> {
    store
        .resolve(name)
        .map_err(|source| MigrateError::CacheResolution {
            name: name.to_string_lossy(),
            source,
        })
}

/// The store's default cache name, used when no source is given.
pub fn default_name<S: CacheStore>(store: &S) -> CacheName {
    store.default_name().clone()
}

/// Allocate a new, empty, uniquely named cache of `cache_type`.
pub fn new_unique<S: CacheStore>(store: &S, cache_type: CacheType) -> MigrateResult<S::Cache> {
    store
        .new_unique(cache_type)
        .map_err(|source| MigrateError::CacheResolution {
            name: format!("new {cache_type} cache"),
            source,
        })
}
