use krbmv_types::{CacheName, CacheType, Credential, Principal};

use crate::error::CcacheResult;

/// Lazy, finite, single-pass sequence of credential records.
pub type CredentialIter<'a> = Box<dyn Iterator<Item = CcacheResult<Credential>> + 'a>;

/// A resolved credential cache handle.
///
/// Implementations must satisfy these invariants:
/// - An empty or uninitialized cache reports `Ok(None)` from
///   [`principal`](Self::principal). Errors are reserved for caches that
///   cannot be read at all.
/// - [`initialize`](Self::initialize) is a no-op when the cache already
///   belongs to the given principal, so it may be called before every store.
/// - [`store`](Self::store) never alters the credential it is given.
/// - Enumeration follows the cache's native order, without reordering or
///   deduplication.
pub trait CredentialCache {
    /// Storage kind of this cache.
    fn cache_type(&self) -> CacheType;

    /// Full name of this cache, including its type prefix.
    fn name(&self) -> &CacheName;

    /// The principal the cache is initialized for, if any.
    fn principal(&self) -> CcacheResult<Option<Principal>>;

    /// Prepare the cache to hold credentials for `principal`.
    ///
    /// When the cache holds a different principal (or none), its contents
    /// are replaced by an empty cache for `principal`.
    fn initialize(&self, principal: &Principal) -> CcacheResult<()>;

    /// Append one credential record.
    ///
    /// Fails if the cache has not been initialized.
    fn store(&self, credential: &Credential) -> CcacheResult<()>;

    /// Enumerate the stored credential records.
    fn credentials(&self) -> CcacheResult<CredentialIter<'_>>;
}

/// The runtime that resolves names into cache handles.
///
/// This is the capability surface the migration engine consumes. Process
/// defaults are held as explicit state rather than read from the
/// environment.
pub trait CacheStore {
    type Cache: CredentialCache;

    /// The default cache name of this context.
    fn default_name(&self) -> &CacheName;

    /// Replace the default cache name of this context.
    fn set_default_name(&mut self, name: CacheName);

    /// Open a handle for `name`.
    fn resolve(&self, name: &CacheName) -> CcacheResult<Self::Cache>;

    /// Create a brand-new, uniquely named, empty cache of `cache_type`.
    ///
    /// For collection types the cache is allocated inside the collection
    /// named by the current default.
    fn new_unique(&self, cache_type: CacheType) -> CcacheResult<Self::Cache>;
}
