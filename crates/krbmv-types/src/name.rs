use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Storage kind of a credential cache.
///
/// Only the kinds this workspace can actually open are represented. Any
/// other prefix, including MIT kinds such as `KEYRING` or `KCM`, is rejected
/// when a [`CacheName`] is classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheType {
    /// A single cache file holding one principal.
    File,
    /// A directory collection of `tkt*` cache files.
    Dir,
    /// A process-local cache owned by the context.
    Memory,
}

impl CacheType {
    /// The type tag as it appears in a cache name prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::File => "FILE",
            CacheType::Dir => "DIR",
            CacheType::Memory => "MEMORY",
        }
    }

    /// Classify a raw name prefix. Matching is case-sensitive.
    pub fn from_prefix(prefix: &[u8]) -> Result<Self, TypeError> {
        match prefix {
            b"FILE" => Ok(CacheType::File),
            b"DIR" => Ok(CacheType::Dir),
            b"MEMORY" => Ok(CacheType::Memory),
            other => Err(TypeError::UnknownCacheType(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_prefix(s.as_bytes())
    }
}

/// Opaque identifier naming a credential cache.
///
/// A name is a byte string such as `FILE:/tmp/krb5cc_1000`,
/// `DIR:/run/user/1000/krb5cc` or a bare path. The part before the first
/// colon is the type prefix; a name without a colon, or one that starts
/// with `/`, has no prefix and denotes a `FILE` cache.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheName(Vec<u8>);

impl CacheName {
    /// Wrap raw bytes as a cache name.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Build `TYPE:residual`.
    pub fn with_type(cache_type: CacheType, residual: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(cache_type.as_str().len() + 1 + residual.len());
        bytes.extend_from_slice(cache_type.as_str().as_bytes());
        bytes.push(b':');
        bytes.extend_from_slice(residual);
        Self(bytes)
    }

    /// The raw name bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` if the name is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into the optional type prefix and the residual.
    pub fn split(&self) -> (Option<&[u8]>, &[u8]) {
        if self.0.first() == Some(&b'/') {
            return (None, &self.0);
        }
        match self.0.iter().position(|&b| b == b':') {
            Some(idx) => (Some(&self.0[..idx]), &self.0[idx + 1..]),
            None => (None, &self.0),
        }
    }

    /// The residual part of the name (everything after the type prefix).
    pub fn residual(&self) -> &[u8] {
        self.split().1
    }

    /// Classify the name by its prefix. Names without a prefix are `FILE`.
    pub fn cache_type(&self) -> Result<CacheType, TypeError> {
        match self.split().0 {
            None => Ok(CacheType::File),
            Some(prefix) => CacheType::from_prefix(prefix),
        }
    }

    /// Lossy UTF-8 rendering, for logs and reports.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Debug for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheName({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl FromStr for CacheName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TypeError::EmptyCacheName);
        }
        Ok(Self(s.as_bytes().to_vec()))
    }
}

impl From<&str> for CacheName {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for CacheName {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for CacheName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

impl<'de> Deserialize<'de> for CacheName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_names_split() {
        let name = CacheName::from("DIR:/run/user/1000/krb5cc");
        let (prefix, residual) = name.split();
        assert_eq!(prefix, Some(&b"DIR"[..]));
        assert_eq!(residual, b"/run/user/1000/krb5cc");
        assert_eq!(name.cache_type().unwrap(), CacheType::Dir);
    }

    #[test]
    fn bare_path_is_file() {
        let name = CacheName::from("/tmp/krb5cc_1000");
        assert_eq!(name.split().0, None);
        assert_eq!(name.cache_type().unwrap(), CacheType::File);
        assert_eq!(name.residual(), b"/tmp/krb5cc_1000");
    }

    #[test]
    fn path_with_colon_keeps_leading_slash() {
        let name = CacheName::from("/tmp/odd:name");
        assert_eq!(name.cache_type().unwrap(), CacheType::File);
        assert_eq!(name.residual(), b"/tmp/odd:name");
    }

    #[test]
    fn subsidiary_dir_name_keeps_colon_in_residual() {
        let name = CacheName::from("DIR::/tmp/cc/tkt123");
        assert_eq!(name.cache_type().unwrap(), CacheType::Dir);
        assert_eq!(name.residual(), b":/tmp/cc/tkt123");
    }

    #[test]
    fn unknown_prefix_rejected() {
        let name = CacheName::from("BOGUS:/tmp/x");
        assert_eq!(
            name.cache_type().unwrap_err(),
            TypeError::UnknownCacheType("BOGUS".into())
        );
    }

    #[test]
    fn prefix_is_case_sensitive() {
        assert!(CacheName::from("file:/tmp/x").cache_type().is_err());
    }

    #[test]
    fn with_type_builds_prefix() {
        let name = CacheName::with_type(CacheType::Memory, b"scratch");
        assert_eq!(name.as_bytes(), b"MEMORY:scratch");
    }

    #[test]
    fn empty_name_fails_to_parse() {
        assert_eq!("".parse::<CacheName>().unwrap_err(), TypeError::EmptyCacheName);
    }

    #[test]
    fn serde_as_string() {
        let name = CacheName::from("FILE:/tmp/a");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"FILE:/tmp/a\"");
        let back: CacheName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
        assert_eq!(serde_json::to_string(&CacheType::Dir).unwrap(), "\"DIR\"");
    }
}
