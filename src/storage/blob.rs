//!  Content-addressed blob storage.
//!
//! every distinct file content is stored exactly once, under the hex form
//! of its hash. Blobs are append-only: nothing here ever deletes or
//! rewrites an existing object.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fsio;
use crate::storage::types::BlobId;

/// a directory of blobs keyed by content hash
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// open a store rooted at `root` (the directory must exist)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// the directory blobs live in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// hash `bytes` without storing them
    pub fn hash(bytes: &[u8]) -> StorageResult<BlobId> {
        Ok(BlobId::of(bytes)?)
    }

    /// store `bytes` and return their id
    ///
    /// idempotent: identical content yields the same id and is only
    /// written the first time.
    pub fn put(&self, bytes: &[u8]) -> StorageResult<BlobId> {
        let id = Self::hash(bytes)?;
        let path = self.path_of(id);
        if path.exists() {
            trace!(blob = %id, "blob already stored");
            return Ok(id);
        }

        fsio::write_atomic(&path, bytes)?;
        trace!(blob = %id, size = bytes.len(), "stored blob");
        Ok(id)
    }

    /// read a blob's content
    pub fn get(&self, id: BlobId) -> StorageResult<Vec<u8>> {
        match fs::read(self.path_of(id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::BlobNotFound(id)),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// check whether a blob is present
    pub fn contains(&self, id: BlobId) -> bool {
        self.path_of(id).is_file()
    }

    fn path_of(&self, id: BlobId) -> PathBuf {
        self.root.join(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, ContentStore) {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_put_then_get() {
        let (_dir, store) = setup_store();

        let id = store.put(b"hello world").unwrap();
        assert!(store.contains(id));
        assert_eq!(store.get(id).unwrap(), b"hello world");
    }

    #[test]
    fn test_put_is_idempotent() {
        let (dir, store) = setup_store();

        let first = store.put(b"same bytes").unwrap();
        let second = store.put(b"same bytes").unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_hash_matches_put() {
        let (_dir, store) = setup_store();

        let hashed = ContentStore::hash(b"abc").unwrap();
        assert!(!store.contains(hashed));

        let stored = store.put(b"abc").unwrap();
        assert_eq!(hashed, stored);
    }

    #[test]
    fn test_missing_blob() {
        let (_dir, store) = setup_store();
        let id = ContentStore::hash(b"never stored").unwrap();

        let result = store.get(id);
        assert!(matches!(result, Err(StorageError::BlobNotFound(missing)) if missing == id));
    }

    #[test]
    fn test_distinct_content_distinct_ids() {
        let (_dir, store) = setup_store();
        let a = store.put(b"a").unwrap();
        let b = store.put(b"b").unwrap();
        assert_ne!(a, b);
    }
}
