//! Credential cache migration engine.
//!
//! Moves every credential from a source cache into a destination cache
//! without destroying a principal that already lives there. The run is a
//! strict pipeline:
//!
//! 1. [`resolver`] opens the source and destination caches.
//! 2. [`planner`] picks the write target: the destination itself, or a new
//!    unique cache inside the destination collection.
//! 3. [`copier`] streams every source record into that target.
//!
//! [`migrate`] drives the three steps and returns a [`MigrationReport`].

pub mod config;
pub mod copier;
pub mod error;
pub mod migrate;
pub mod planner;
pub mod resolver;

pub use config::MigrateConfig;
pub use copier::{copy, copy_records, open_source, CopyStats};
pub use error::{MigrateError, MigrateResult};
pub use migrate::{migrate, MigrationReport};
pub use planner::{plan, WritePlan};

// Re-export the backend surface callers need to build a store.
pub use krbmv_ccache::{CacheStore, Ccache, CredentialCache, Krb5Context};
pub use krbmv_types::{CacheName, CacheType, Credential, Principal};
