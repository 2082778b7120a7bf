//! Credential cache backend for krbmv.
//!
//! This crate reads and writes MIT Kerberos credential caches natively and
//! exposes them through two traits: [`CacheStore`] resolves names into
//! handles, and [`CredentialCache`] is the read/write surface of one handle.
//!
//! # Cache Types
//!
//! - `FILE:<path>` -- one cache file, one principal
//! - `DIR:<dir>` / `DIR::<dir>/tkt…` -- a collection of cache files
//! - `MEMORY:<name>` -- process-local, held by the [`Krb5Context`]
//!
//! # Design Rules
//!
//! 1. An empty cache is a state, not an error: principal lookups return
//!    `Ok(None)`.
//! 2. Resolving a `FILE` name never touches disk.
//! 3. Re-initializing a cache for the principal it already holds keeps its
//!    contents.
//! 4. Records are written back field for field; nothing is re-derived.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod codec;
pub mod context;
mod dir;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use context::{Ccache, Krb5Context};
pub use error::{CcacheError, CcacheResult};
pub use file::FileCache;
pub use memory::{MemoryCache, MemoryRegistry};
pub use traits::{CacheStore, CredentialCache, CredentialIter};
