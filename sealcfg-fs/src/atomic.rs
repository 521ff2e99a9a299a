//! Atomic file replacement.

use crate::error::{FsError, FsResult};
use std::fs::Permissions;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// then renames it over the target. Readers see either the old or the new
/// contents, never a partial write.
///
/// `permissions` are applied to the temporary file before the rename.
pub fn write_atomic(path: &Path, bytes: &[u8], permissions: Option<Permissions>) -> FsResult<()> {
    let write_error = |source| FsError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(bytes).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;
    if let Some(permissions) = permissions {
        tmp.as_file().set_permissions(permissions).map_err(write_error)?;
    }
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
