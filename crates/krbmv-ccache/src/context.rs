use std::path::PathBuf;

use krbmv_types::{CacheName, CacheType, Credential, Principal};
use tracing::debug;

use crate::dir;
use crate::error::{CcacheError, CcacheResult};
use crate::file::{path_bytes, path_from_bytes, FileCache};
use crate::memory::{MemoryCache, MemoryRegistry};
use crate::traits::{CacheStore, CredentialCache, CredentialIter};

/// Process-wide credential cache runtime.
///
/// Owns the default cache name and the `MEMORY` caches of the process.
/// Created once at startup; handles resolved from it stay valid for the
/// rest of the run.
#[derive(Debug)]
pub struct Krb5Context {
    default_name: CacheName,
    memory: MemoryRegistry,
}

impl Krb5Context {
    /// Create a context whose default cache is `default_name`.
    pub fn new(default_name: CacheName) -> Self {
        Self {
            default_name,
            memory: MemoryRegistry::new(),
        }
    }

    /// The MIT built-in default, `FILE:/tmp/krb5cc_<uid>`.
    pub fn system_default_name(uid: u32) -> CacheName {
        CacheName::from(format!("FILE:/tmp/krb5cc_{uid}").as_str())
    }

    /// Directory holding the default cache, when the default is a `FILE` name.
    fn default_file_dir(&self) -> Option<PathBuf> {
        if self.default_name.cache_type().ok()? != CacheType::File {
            return None;
        }
        let path = path_from_bytes(self.default_name.residual());
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Some(parent.to_path_buf()),
            _ => Some(PathBuf::from(".")),
        }
    }

    fn file_cache(&self, cache_type: CacheType, path: PathBuf) -> Ccache {
        let name = match cache_type {
            CacheType::Dir => dir::subsidiary_name(&path),
            _ => CacheName::with_type(CacheType::File, path_bytes(&path)),
        };
        Ccache {
            name,
            cache_type,
            backend: Backend::File(FileCache::new(path)),
        }
    }
}

impl CacheStore for Krb5Context {
    type Cache = Ccache;

    fn default_name(&self) -> &CacheName {
        &self.default_name
    }

    fn set_default_name(&mut self, name: CacheName) {
        debug!(%name, "default cache name set");
        self.default_name = name;
    }

    fn resolve(&self, name: &CacheName) -> CcacheResult<Ccache> {
        let cache_type = name.cache_type()?;
        let residual = name.residual();
        let malformed = |reason: &str| CcacheError::MalformedName {
            cache_type,
            name: name.to_string_lossy(),
            reason: reason.to_string(),
        };

        let cache = match cache_type {
            CacheType::File => {
                if residual.is_empty() {
                    return Err(malformed("empty path"));
                }
                self.file_cache(CacheType::File, path_from_bytes(residual))
            }
            CacheType::Dir => self.file_cache(CacheType::Dir, dir::resolve_residual(residual)?),
            CacheType::Memory => {
                if residual.is_empty() {
                    return Err(malformed("empty memory cache name"));
                }
                Ccache {
                    name: CacheName::with_type(CacheType::Memory, residual),
                    cache_type,
                    backend: Backend::Memory(self.memory.resolve(residual)?),
                }
            }
        };
        debug!(requested = %name, resolved = %cache.name, "resolved cache");
        Ok(cache)
    }

    fn new_unique(&self, cache_type: CacheType) -> CcacheResult<Ccache> {
        let cache = match cache_type {
            CacheType::File => {
                let dir = self
                    .default_file_dir()
                    .ok_or(CcacheError::NoCollection(CacheType::File))?;
                let (_file, path) = tempfile::Builder::new()
                    .prefix("krb5cc_")
                    .rand_bytes(6)
                    .tempfile_in(&dir)
                    .map_err(CcacheError::io(&dir))?
                    .keep()
                    .map_err(|e| CcacheError::io(&dir)(e.error))?;
                self.file_cache(CacheType::File, path)
            }
            CacheType::Dir => {
                let collection = dir::collection_dir(&self.default_name)
                    .ok_or(CcacheError::NoCollection(CacheType::Dir))?;
                self.file_cache(CacheType::Dir, dir::new_unique_in(&collection)?)
            }
            CacheType::Memory => {
                let (residual, memory) = self.memory.new_unique()?;
                Ccache {
                    name: CacheName::with_type(CacheType::Memory, &residual),
                    cache_type,
                    backend: Backend::Memory(memory),
                }
            }
        };
        debug!(name = %cache.name, "created unique cache");
        Ok(cache)
    }
}

#[derive(Clone, Debug)]
enum Backend {
    File(FileCache),
    Memory(MemoryCache),
}

/// A resolved cache handle of any supported type.
#[derive(Clone, Debug)]
pub struct Ccache {
    name: CacheName,
    cache_type: CacheType,
    backend: Backend,
}

impl CredentialCache for Ccache {
    fn cache_type(&self) -> CacheType {
        self.cache_type
    }

    fn name(&self) -> &CacheName {
        &self.name
    }

    fn principal(&self) -> CcacheResult<Option<Principal>> {
        match &self.backend {
            Backend::File(file) => file.principal(),
            Backend::Memory(memory) => memory.principal(),
        }
    }

    fn initialize(&self, principal: &Principal) -> CcacheResult<()> {
        let reset = match &self.backend {
            Backend::File(file) => file.initialize(principal)?,
            Backend::Memory(memory) => memory.initialize(principal)?,
        };
        if reset {
            debug!(name = %self.name, %principal, "initialized cache");
        }
        Ok(())
    }

    fn store(&self, credential: &Credential) -> CcacheResult<()> {
        match &self.backend {
            Backend::File(file) => file.store(credential),
            Backend::Memory(memory) => memory.store(credential, &self.name.to_string_lossy()),
        }
    }

    fn credentials(&self) -> CcacheResult<CredentialIter<'_>> {
        match &self.backend {
            Backend::File(file) => Ok(Box::new(file.credentials()?)),
            Backend::Memory(memory) => {
                let records = memory.credentials()?;
                Ok(Box::new(records.into_iter().map(Ok::<_, CcacheError>)))
            }
        }
    }
}
