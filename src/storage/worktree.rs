//! Working-tree file access.
//!
//! the tracked tree is flat: only regular files directly inside the
//! working directory take part. Sub-directories (including the repository
//! directory itself) are ignored.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::storage::blob::ContentStore;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BlobId, InvalidNameError};

/// the user's working directory
#[derive(Debug, Clone)]
pub struct WorkTree {
    root: PathBuf,
}

impl WorkTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// resolve a tracked path, rejecting anything that is not a plain name
    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let valid = !path.is_empty()
            && path != "."
            && path != ".."
            && !path.contains('/')
            && !path.contains('\\');
        if !valid {
            return Err(InvalidNameError::InvalidPath(path.to_string()).into());
        }
        Ok(self.root.join(path))
    }

    /// names of all regular files in the working directory, sorted
    pub fn list_files(&self) -> StorageResult<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => files.push(name),
                Err(name) => warn!(name = ?name, "skipping file with a non-UTF-8 name"),
            }
        }
        files.sort();
        Ok(files)
    }

    /// check whether `path` is a regular file
    pub fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.resolve(path)?.is_file())
    }

    /// read a file's content, `None` if it does not exist
    pub fn read(&self, path: &str) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(self.resolve(path)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// hash a file's current content, `None` if it does not exist
    pub fn hash(&self, path: &str) -> StorageResult<Option<BlobId>> {
        match self.read(path)? {
            Some(bytes) => Ok(Some(ContentStore::hash(&bytes)?)),
            None => Ok(None),
        }
    }

    /// create or overwrite a file
    pub fn write(&self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        fs::write(self.resolve(path)?, bytes)?;
        Ok(())
    }

    /// delete a file; deleting a missing file is not an error
    pub fn delete(&self, path: &str) -> StorageResult<()> {
        match fs::remove_file(self.resolve(path)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
