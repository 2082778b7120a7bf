//! Process-local `MEMORY` caches.
//!
//! [`MemoryRegistry`] holds every `MEMORY:` cache of a context in a
//! `HashMap` behind a `RwLock`. Handles share their entry, so writes through
//! one handle are visible through any other handle resolved from the same
//! name. Data is lost when the context is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use krbmv_types::{Credential, Principal};

use crate::error::{CcacheError, CcacheResult};

#[derive(Debug, Default)]
struct MemoryEntry {
    principal: Option<Principal>,
    credentials: Vec<Credential>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> CcacheError {
    CcacheError::LockPoisoned(e.to_string())
}

/// Registry of named in-memory caches.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    caches: RwLock<HashMap<Vec<u8>, Arc<RwLock<MemoryEntry>>>>,
    next_unique: AtomicU64,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cache named `residual`, creating it empty if absent.
    pub fn resolve(&self, residual: &[u8]) -> CcacheResult<MemoryCache> {
        let mut caches = self.caches.write().map_err(poisoned)?;
        let entry = caches.entry(residual.to_vec()).or_default().clone();
        Ok(MemoryCache { entry })
    }

    /// Allocate an unused name and return it with its empty cache.
    pub fn new_unique(&self) -> CcacheResult<(Vec<u8>, MemoryCache)> {
        let mut caches = self.caches.write().map_err(poisoned)?;
        loop {
            let n = self.next_unique.fetch_add(1, Ordering::Relaxed) + 1;
            let name = format!("krbmv{n:06}").into_bytes();
            if !caches.contains_key(&name) {
                let entry = Arc::new(RwLock::new(MemoryEntry::default()));
                caches.insert(name.clone(), entry.clone());
                return Ok((name, MemoryCache { entry }));
            }
        }
    }
}

/// Handle to one in-memory cache.
#[derive(Clone, Debug)]
pub struct MemoryCache {
    entry: Arc<RwLock<MemoryEntry>>,
}

impl MemoryCache {
    pub fn principal(&self) -> CcacheResult<Option<Principal>> {
        Ok(self.entry.read().map_err(poisoned)?.principal.clone())
    }

    /// Reset to an empty cache for `principal` unless it already belongs to
    /// it. Returns `true` if the contents were reset.
    pub fn initialize(&self, principal: &Principal) -> CcacheResult<bool> {
        let mut entry = self.entry.write().map_err(poisoned)?;
        if entry.principal.as_ref() == Some(principal) {
            return Ok(false);
        }
        entry.principal = Some(principal.clone());
        entry.credentials.clear();
        Ok(true)
    }

    pub fn store(&self, credential: &Credential, name: &str) -> CcacheResult<()> {
        let mut entry = self.entry.write().map_err(poisoned)?;
        if entry.principal.is_none() {
            return Err(CcacheError::NotInitialized(name.to_string()));
        }
        entry.credentials.push(credential.clone());
        Ok(())
    }

    /// Snapshot of the stored records, in insertion order.
    pub fn credentials(&self) -> CcacheResult<Vec<Credential>> {
        Ok(self.entry.read().map_err(poisoned)?.credentials.clone())
    }
}
