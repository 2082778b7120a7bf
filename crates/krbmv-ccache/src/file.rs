//! Cache files on disk, shared by the `FILE` and `DIR` types.

use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use krbmv_types::{Credential, Principal};
use tracing::debug;

use crate::codec::{self, CredentialReader};
use crate::error::{CcacheError, CcacheResult};

/// Convert raw name bytes into a path.
pub(crate) fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(OsStr::from_bytes(bytes))
}

/// Raw bytes of a path.
pub(crate) fn path_bytes(path: &Path) -> &[u8] {
    path.as_os_str().as_bytes()
}

/// A credential cache stored in a single file.
///
/// A missing or zero-length file is an empty cache with no principal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Whole file contents, or `None` if the file does not exist.
    fn read_image(&self) -> CcacheResult<Option<Bytes>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CcacheError::io(&self.path)(e)),
        }
    }

    pub fn principal(&self) -> CcacheResult<Option<Principal>> {
        match self.read_image()? {
            Some(data) if !data.is_empty() => Ok(Some(codec::decode(data)?.principal)),
            _ => Ok(None),
        }
    }

    /// Replace the file with an empty cache for `principal`, unless it
    /// already belongs to that principal. Returns `true` if the file was
    /// rewritten.
    pub fn initialize(&self, principal: &Principal) -> CcacheResult<bool> {
        if matches!(self.principal(), Ok(Some(ref current)) if current == principal) {
            debug!(path = %self.path.display(), %principal, "cache already initialized");
            return Ok(false);
        }

        let header = codec::encode_header(principal)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // Temporary files are created with mode 0600.
        let mut tmp = tempfile::Builder::new()
            .prefix(".krbmv")
            .tempfile_in(dir)
            .map_err(CcacheError::io(dir))?;
        tmp.write_all(&header).map_err(CcacheError::io(tmp.path()))?;
        tmp.persist(&self.path)
            .map_err(|e| CcacheError::io(&self.path)(e.error))?;

        debug!(path = %self.path.display(), %principal, "initialized cache file");
        Ok(true)
    }

    /// Append one credential, encoded in the file's own format version.
    pub fn store(&self, credential: &Credential) -> CcacheResult<()> {
        let mut file = match OpenOptions::new().read(true).append(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(self.not_initialized());
            }
            Err(e) => return Err(CcacheError::io(&self.path)(e)),
        };

        let mut prefix = [0u8; 2];
        match file.read_exact(&mut prefix) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(self.not_initialized());
            }
            Err(e) => return Err(CcacheError::io(&self.path)(e)),
        }
        let version = codec::peek_version(&prefix)?;

        let record = codec::encode_credential(credential, version)?;
        file.write_all(&record).map_err(CcacheError::io(&self.path))?;
        Ok(())
    }

    /// Enumerate records. A missing file is an error; an empty one yields
    /// nothing.
    pub fn credentials(&self) -> CcacheResult<CredentialReader> {
        match self.read_image()? {
            None => Err(CcacheError::NotFound(self.path.display().to_string())),
            Some(data) if data.is_empty() => Ok(CredentialReader::empty()),
            Some(data) => Ok(codec::decode(data)?.credentials),
        }
    }

    fn not_initialized(&self) -> CcacheError {
        CcacheError::NotInitialized(self.path.display().to_string())
    }
}
