//! Foundation types for krbmv.
//!
//! This crate provides the value types shared by the credential cache
//! backend and the migration engine. Nothing here performs I/O.
//!
//! # Key Types
//!
//! - [`CacheName`] -- Byte-string cache identifier with an optional type prefix
//! - [`CacheType`] -- Storage kind of a cache (`FILE`, `DIR`, `MEMORY`)
//! - [`Principal`] -- Kerberos identity attached to a cache or a ticket
//! - [`Credential`] -- One ticket record as stored in a cache
//! - [`TicketTimes`] -- Validity window of a ticket

pub mod credential;
pub mod error;
pub mod name;
pub mod principal;

pub use credential::{Address, AuthData, Credential, KeyBlock, TicketTimes};
pub use error::TypeError;
pub use name::{CacheName, CacheType};
pub use principal::{Principal, KRB5_NT_PRINCIPAL, KRB5_NT_SRV_INST, KRB5_NT_UNKNOWN};
