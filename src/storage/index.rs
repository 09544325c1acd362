//! The staging area (index).
//!
//! the index is the table of pending changes between HEAD and the next
//! commit. It is read whole at the start of a command and written back
//! whole at the end; there are no partial updates.
//!
//! on disk it is a JSON object mapping path to entry:
//! ```text
//! {
//!   "a.txt": { "staged": "<blob id>" },
//!   "b.txt": "removed"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::storage::commit::FileTable;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fsio;
use crate::storage::types::BlobId;

/// the pending state of a single path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexEntry {
    /// no pending change; never persisted
    Unchanged,
    /// add or modify to this blob
    Staged(BlobId),
    /// remove from the next commit
    Removed,
}

/// the singleton table of pending changes, ordered by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagingArea {
    entries: BTreeMap<String, IndexEntry>,
}

impl StagingArea {
    /// an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// load the index from `path`; a missing file is an empty index
    pub fn load(path: &Path) -> StorageResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let index: Self = serde_json::from_slice(&bytes)?;
        if index.entries.values().any(|e| *e == IndexEntry::Unchanged) {
            return Err(StorageError::CorruptedData {
                path: path.to_path_buf(),
                reason: "index records an unchanged entry".to_string(),
            });
        }
        Ok(index)
    }

    /// write the whole index to `path`
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        fsio::write_atomic(path, &bytes)
    }

    /// the pending state of `path`
    pub fn get(&self, path: &str) -> IndexEntry {
        self.entries.get(path).copied().unwrap_or(IndexEntry::Unchanged)
    }

    /// record a pending change; `Unchanged` forgets the path
    pub fn put(&mut self, path: impl Into<String>, entry: IndexEntry) {
        let path = path.into();
        match entry {
            IndexEntry::Unchanged => {
                self.entries.remove(&path);
            }
            entry => {
                self.entries.insert(path, entry);
            }
        }
    }

    /// forget any pending change for `path`, returning what was there
    pub fn remove(&mut self, path: &str) -> IndexEntry {
        self.entries.remove(path).unwrap_or(IndexEntry::Unchanged)
    }

    /// check whether `path` has a pending change
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// drop every pending change
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// paths staged for addition with their blobs, in path order
    pub fn staged(&self) -> impl Iterator<Item = (&str, BlobId)> + '_ {
        self.entries.iter().filter_map(|(path, entry)| match entry {
            IndexEntry::Staged(id) => Some((path.as_str(), *id)),
            _ => None,
        })
    }

    /// paths staged for removal, in path order
    pub fn removed(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(|(_, entry)| **entry == IndexEntry::Removed)
            .map(|(path, _)| path.as_str())
    }

    /// fold the pending changes into a parent's file table
    ///
    /// removed paths are dropped, staged paths are set or overwritten.
    pub fn apply_to(&self, parent: &FileTable) -> FileTable {
        let mut files = parent.clone();
        for (path, entry) in &self.entries {
            match entry {
                IndexEntry::Staged(id) => {
                    files.insert(path.clone(), *id);
                }
                IndexEntry::Removed => {
                    files.remove(path);
                }
                IndexEntry::Unchanged => {}
            }
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn blob(content: &str) -> BlobId {
        BlobId::of(content.as_bytes()).unwrap()
    }

    #[test]
    fn test_put_get_remove() {
        let mut index = StagingArea::new();
        assert_eq!(index.get("a.txt"), IndexEntry::Unchanged);

        index.put("a.txt", IndexEntry::Staged(blob("a")));
        index.put("b.txt", IndexEntry::Removed);
        assert_eq!(index.get("a.txt"), IndexEntry::Staged(blob("a")));
        assert_eq!(index.get("b.txt"), IndexEntry::Removed);
        assert_eq!(index.len(), 2);

        assert_eq!(index.remove("a.txt"), IndexEntry::Staged(blob("a")));
        assert_eq!(index.remove("a.txt"), IndexEntry::Unchanged);
        assert!(!index.contains("a.txt"));
    }

    #[test]
    fn test_put_unchanged_forgets() {
        let mut index = StagingArea::new();
        index.put("a.txt", IndexEntry::Removed);
        index.put("a.txt", IndexEntry::Unchanged);
        assert!(index.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("INDEX");

        let mut index = StagingArea::new();
        index.put("a.txt", IndexEntry::Staged(blob("a")));
        index.put("b.txt", IndexEntry::Removed);
        index.save(&path).unwrap();

        assert_eq!(StagingArea::load(&path).unwrap(), index);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let index = StagingArea::load(&dir.path().join("INDEX")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_rejects_unchanged_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("INDEX");
        fs::write(&path, br#"{"a.txt": "unchanged"}"#).unwrap();

        assert!(matches!(
            StagingArea::load(&path),
            Err(StorageError::CorruptedData { .. })
        ));
    }

    #[test]
    fn test_staged_and_removed_are_ordered() {
        let mut index = StagingArea::new();
        index.put("c.txt", IndexEntry::Staged(blob("c")));
        index.put("a.txt", IndexEntry::Staged(blob("a")));
        index.put("b.txt", IndexEntry::Removed);

        let staged: Vec<_> = index.staged().map(|(p, _)| p).collect();
        assert_eq!(staged, vec!["a.txt", "c.txt"]);
        assert_eq!(index.removed().collect::<Vec<_>>(), vec!["b.txt"]);
    }

    #[test]
    fn test_apply_to_parent_table() {
        let mut parent = FileTable::new();
        parent.insert("keep.txt".to_string(), blob("keep"));
        parent.insert("gone.txt".to_string(), blob("gone"));
        parent.insert("edit.txt".to_string(), blob("old"));

        let mut index = StagingArea::new();
        index.put("gone.txt", IndexEntry::Removed);
        index.put("edit.txt", IndexEntry::Staged(blob("new")));
        index.put("new.txt", IndexEntry::Staged(blob("fresh")));

        let files = index.apply_to(&parent);

        let mut expected = FileTable::new();
        expected.insert("keep.txt".to_string(), blob("keep"));
        expected.insert("edit.txt".to_string(), blob("new"));
        expected.insert("new.txt".to_string(), blob("fresh"));
        assert_eq!(files, expected);
    }
}
