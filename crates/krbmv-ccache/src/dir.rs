//! `DIR` collections: a directory of `tkt*` cache files plus a `primary`
//! file naming the one a bare collection name resolves to.

use std::fs;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use krbmv_types::{CacheName, CacheType};
use tracing::debug;

use crate::error::{CcacheError, CcacheResult};
use crate::file::{path_bytes, path_from_bytes};

const PRIMARY_FILE: &str = "primary";
const SUBSIDIARY_PREFIX: &str = "tkt";

/// Resolve the residual of a `DIR:` name to the path of a subsidiary file.
///
/// - `DIR:<dir>` names the collection; it resolves to its primary cache and
///   the directory is created if missing.
/// - `DIR::<dir>/tkt…` names one subsidiary; its directory must exist.
pub(crate) fn resolve_residual(residual: &[u8]) -> CcacheResult<PathBuf> {
    let malformed = |reason: &str| CcacheError::MalformedName {
        cache_type: CacheType::Dir,
        name: String::from_utf8_lossy(residual).into_owned(),
        reason: reason.to_string(),
    };

    if let Some(subsidiary) = residual.strip_prefix(b":") {
        let path = path_from_bytes(subsidiary);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| malformed("subsidiary name has no file name"))?;
        if !file_name.starts_with(SUBSIDIARY_PREFIX) {
            return Err(malformed("subsidiary file name must begin with \"tkt\""));
        }
        let dir = path.parent().ok_or_else(|| malformed("subsidiary has no directory"))?;
        if !dir.is_dir() {
            return Err(CcacheError::NotFound(dir.display().to_string()));
        }
        return Ok(path);
    }

    if residual.is_empty() {
        return Err(malformed("empty collection directory"));
    }
    let dir = path_from_bytes(residual);
    ensure_dir(&dir)?;
    let primary = read_primary(&dir)?;
    Ok(dir.join(primary))
}

/// The `DIR::` name of a subsidiary file.
pub(crate) fn subsidiary_name(path: &Path) -> CacheName {
    let mut residual = Vec::with_capacity(path_bytes(path).len() + 1);
    residual.push(b':');
    residual.extend_from_slice(path_bytes(path));
    CacheName::with_type(CacheType::Dir, &residual)
}

/// The collection directory named by `name`, if it is a `DIR` name.
///
/// A subsidiary name refers to the directory it lives in.
pub(crate) fn collection_dir(name: &CacheName) -> Option<PathBuf> {
    if name.cache_type().ok()? != CacheType::Dir {
        return None;
    }
    let residual = name.residual();
    match residual.strip_prefix(b":") {
        Some(subsidiary) => path_from_bytes(subsidiary).parent().map(Path::to_path_buf),
        None if residual.is_empty() => None,
        None => Some(path_from_bytes(residual)),
    }
}

/// Create a new empty subsidiary with a random `tkt` name in `dir`.
pub(crate) fn new_unique_in(dir: &Path) -> CcacheResult<PathBuf> {
    ensure_dir(dir)?;
    let (_file, path) = tempfile::Builder::new()
        .prefix(SUBSIDIARY_PREFIX)
        .rand_bytes(6)
        .tempfile_in(dir)
        .map_err(CcacheError::io(dir))?
        .keep()
        .map_err(|e| CcacheError::io(dir)(e.error))?;
    debug!(path = %path.display(), "allocated new subsidiary cache");
    Ok(path)
}

/// The primary subsidiary file name, defaulting to `tkt`.
fn read_primary(dir: &Path) -> CcacheResult<String> {
    let path = dir.join(PRIMARY_FILE);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(SUBSIDIARY_PREFIX.to_string());
        }
        Err(e) => return Err(CcacheError::io(&path)(e)),
    };
    let primary = contents.lines().next().unwrap_or_default().trim().to_string();
    if !primary.starts_with(SUBSIDIARY_PREFIX) || primary.contains('/') {
        return Err(CcacheError::InvalidPrimary {
            dir: dir.to_path_buf(),
            primary,
        });
    }
    Ok(primary)
}

fn ensure_dir(dir: &Path) -> CcacheResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .map_err(CcacheError::io(dir))?;
    debug!(dir = %dir.display(), "created collection directory");
    Ok(())
}
