//! whole-file reads and atomic replacement for repository metadata

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::storage::error::{StorageError, StorageResult};

/// write `bytes` to `path` by renaming a fully written temp file over it
///
/// readers never observe a half-written file. The temp file lives in the
/// target's directory so the rename stays on one filesystem.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let dir = path.parent().ok_or_else(|| StorageError::CorruptedData {
        path: path.to_path_buf(),
        reason: "path has no parent directory".to_string(),
    })?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// read a small text entry (a ref or HEAD), trimming the trailing newline
pub(crate) fn read_trimmed(path: &Path) -> StorageResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s.trim_end().to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(e)),
    }
}
