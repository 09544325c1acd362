//!  Commit creation and history traversal
//!
//!  commits are immutable snapshots of the tracked file table:
//! - each commit records its primary parent (none for the root)
//! - merge commits also record the merged-in commit as a second parent
//! - the id is the hash of the serialized record, so any change to the
//!   message, author, time, parents or files yields a new id
//!
//! commits are stored as JSON under `<root>/<first 4 hex>/<remaining hex>`
//! to keep directory fan-out bounded and make prefix lookup a single
//! directory scan.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fsio;
use crate::storage::types::{BlobId, CommitId, Signature, HEX_LEN};

/// shortest prefix accepted by [`CommitGraph::lookup`]
pub const MIN_PREFIX_LEN: usize = 4;

/// number of hex characters used for the shard directory
const SHARD_LEN: usize = 4;

/// mapping from working-tree path to blob id
pub type FileTable = BTreeMap<String, BlobId>;

/// an immutable commit record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: CommitId,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub parent: Option<CommitId>,
    pub merge_parent: Option<CommitId>,
    pub files: FileTable,
}

impl Commit {
    /// check if this is the root commit
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// check if this is a merge commit (has a second parent)
    pub fn is_merge(&self) -> bool {
        self.merge_parent.is_some()
    }

    /// primary parent first, then the merge parent
    pub fn parents(&self) -> impl Iterator<Item = CommitId> + '_ {
        self.parent.iter().chain(self.merge_parent.iter()).copied()
    }

    /// the blob recorded for `path`, if tracked
    pub fn blob(&self, path: &str) -> Option<BlobId> {
        self.files.get(path).copied()
    }

    /// check if `path` is tracked by this commit
    pub fn tracks(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// get a short summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// on-disk format, the id is the file name rather than a field
#[derive(Serialize, Deserialize)]
struct CommitJson {
    message: String,
    author: String,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<CommitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    merge_parent: Option<CommitId>,
    files: FileTable,
}

/// serialize a commit record (everything except the id)
fn serialize_commit(json: &CommitJson) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(json)?)
}

/// deserialize a commit record, checking the content against its id
fn deserialize_commit(bytes: &[u8], expected: CommitId, path: &Path) -> StorageResult<Commit> {
    let actual = CommitId::hash(bytes)?;
    if actual != expected {
        return Err(StorageError::CorruptedData {
            path: path.to_path_buf(),
            reason: format!("content hashes to {} but is stored as {}", actual, expected),
        });
    }

    let json: CommitJson = serde_json::from_slice(bytes)?;
    Ok(Commit {
        id: expected,
        message: json.message,
        author: json.author,
        timestamp: json.timestamp,
        parent: json.parent,
        merge_parent: json.merge_parent,
        files: json.files,
    })
}

/// the persisted set of commits
#[derive(Debug, Clone)]
pub struct CommitGraph {
    root: PathBuf,
}

impl CommitGraph {
    /// open a commit store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, id: CommitId) -> PathBuf {
        let hex = id.to_string();
        let (shard, rest) = hex.split_at(SHARD_LEN);
        self.root.join(shard).join(rest)
    }

    /// persist a record and return the resulting commit
    fn write(&self, json: CommitJson) -> StorageResult<Commit> {
        let bytes = serialize_commit(&json)?;
        let id = CommitId::hash(&bytes)?;
        let path = self.path_of(id);

        if !path.exists() {
            if let Some(shard) = path.parent() {
                fs::create_dir_all(shard)?;
            }
            fsio::write_atomic(&path, &bytes)?;
        }
        debug!(commit = %id, message = %json.message, "created commit");

        Ok(Commit {
            id,
            message: json.message,
            author: json.author,
            timestamp: json.timestamp,
            parent: json.parent,
            merge_parent: json.merge_parent,
            files: json.files,
        })
    }

    /// load a commit by its full id
    pub fn get(&self, id: CommitId) -> StorageResult<Commit> {
        let path = self.path_of(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::CommitNotFound(id.to_string()))
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        deserialize_commit(&bytes, id, &path)
    }

    /// resolve a full id or a unique prefix of at least [`MIN_PREFIX_LEN`]
    pub fn lookup(&self, id_or_prefix: &str) -> StorageResult<Commit> {
        let prefix = id_or_prefix.trim().to_ascii_lowercase();

        if prefix.len() < MIN_PREFIX_LEN {
            return Err(StorageError::IdTooShort(prefix));
        }
        if prefix.len() > HEX_LEN || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::CommitNotFound(prefix));
        }
        if prefix.len() == HEX_LEN {
            return self.get(CommitId::from_hex(&prefix)?);
        }

        let (shard, rest) = prefix.split_at(SHARD_LEN);
        let entries = match fs::read_dir(self.root.join(shard)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::CommitNotFound(prefix))
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut matches = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.len() == HEX_LEN - SHARD_LEN && name.starts_with(rest) {
                matches.push(format!("{}{}", shard, name));
            }
        }

        match matches.as_slice() {
            [] => Err(StorageError::CommitNotFound(prefix)),
            [only] => self.get(CommitId::from_hex(only)?),
            many => Err(StorageError::AmbiguousId {
                prefix,
                candidates: many.len(),
            }),
        }
    }

    /// every persisted commit id, sorted
    pub fn all_commits(&self) -> StorageResult<Vec<CommitId>> {
        let mut ids = Vec::new();

        for shard in fs::read_dir(&self.root)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            let shard_name = shard.file_name().to_string_lossy().into_owned();
            if shard_name.len() != SHARD_LEN {
                continue;
            }

            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                // skips in-flight temp files and anything else foreign
                if let Ok(id) = CommitId::from_hex(&format!("{}{}", shard_name, name)) {
                    ids.push(id);
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// iterate primary-parent history starting at `start`
    pub fn walk(&self, start: CommitId) -> History<'_> {
        History::new(self, start)
    }
}

/// builder for creating commits with a fluent interface
pub struct CommitBuilder<'a> {
    graph: &'a CommitGraph,
    message: String,
    author: Signature,
    timestamp: Option<DateTime<Utc>>,
    parent: Option<CommitId>,
    merge_parent: Option<CommitId>,
    files: FileTable,
}

impl<'a> CommitBuilder<'a> {
    /// create a new CommitBuilder
    pub fn new(graph: &'a CommitGraph) -> Self {
        Self {
            graph,
            message: String::new(),
            author: Signature::sprig(),
            timestamp: None,
            parent: None,
            merge_parent: None,
            files: FileTable::new(),
        }
    }

    /// set the commit message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// set the author signature
    pub fn author(mut self, author: Signature) -> Self {
        self.author = author;
        self
    }

    /// pin the timestamp (defaults to now)
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// set the primary parent
    pub fn parent(mut self, parent: CommitId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// set the merged-in parent
    pub fn merge_parent(mut self, parent: CommitId) -> Self {
        self.merge_parent = Some(parent);
        self
    }

    /// set the file table
    pub fn files(mut self, files: FileTable) -> Self {
        self.files = files;
        self
    }

    /// persist the commit and return it
    pub fn commit(self) -> StorageResult<Commit> {
        if self.merge_parent.is_some() && self.parent.is_none() {
            return Err(StorageError::CorruptedData {
                path: self.graph.root.clone(),
                reason: "a merge parent requires a primary parent".to_string(),
            });
        }

        self.graph.write(CommitJson {
            message: self.message,
            author: self.author.to_string(),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            parent: self.parent,
            merge_parent: self.merge_parent,
            files: self.files,
        })
    }
}

/// create the root commit for a new repository
///
/// the root is dated at the Unix epoch and tracks no files.
pub fn create_initial_commit(graph: &CommitGraph, author: &Signature) -> StorageResult<Commit> {
    CommitBuilder::new(graph)
        .message(CommitMessage::INITIAL)
        .author(author.clone())
        .timestamp(DateTime::<Utc>::UNIX_EPOCH)
        .commit()
}

/// lazy walk along primary parents
///
/// finite and not restartable: once the root has been yielded the
/// iterator is exhausted.
pub struct History<'g> {
    graph: &'g CommitGraph,
    next: Option<CommitId>,
    seen: HashSet<CommitId>,
}

impl<'g> History<'g> {
    fn new(graph: &'g CommitGraph, start: CommitId) -> Self {
        Self {
            graph,
            next: Some(start),
            seen: HashSet::new(),
        }
    }
}

impl Iterator for History<'_> {
    type Item = StorageResult<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        if !self.seen.insert(id) {
            return Some(Err(StorageError::CorruptedData {
                path: self.graph.path_of(id),
                reason: "parent chain revisits a commit".to_string(),
            }));
        }

        match self.graph.get(id) {
            Ok(commit) => {
                self.next = commit.parent;
                Some(Ok(commit))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// message formatting for commits the engine writes itself
pub struct CommitMessage;

impl CommitMessage {
    /// message of the root commit
    pub const INITIAL: &'static str = "initial commit";

    /// format the message of a merge commit
    pub fn merge(given: &str, active: &str) -> String {
        format!("Merged {} into {}.", given, active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_graph() -> (TempDir, CommitGraph) {
        let dir = TempDir::new().unwrap();
        let graph = CommitGraph::new(dir.path());
        (dir, graph)
    }

    fn blob(content: &str) -> BlobId {
        BlobId::of(content.as_bytes()).unwrap()
    }

    #[test]
    fn test_initial_commit() {
        let (_dir, graph) = setup_graph();

        let root = create_initial_commit(&graph, &Signature::sprig()).unwrap();
        let loaded = graph.get(root.id).unwrap();

        assert_eq!(loaded, root);
        assert!(loaded.is_root());
        assert!(loaded.files.is_empty());
        assert_eq!(loaded.message, "initial commit");
        assert_eq!(loaded.timestamp, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_commit_builder() {
        let (_dir, graph) = setup_graph();
        let root = create_initial_commit(&graph, &Signature::sprig()).unwrap();

        let mut files = FileTable::new();
        files.insert("a.txt".to_string(), blob("x"));

        let second = CommitBuilder::new(&graph)
            .message("Second commit")
            .parent(root.id)
            .files(files.clone())
            .commit()
            .unwrap();

        let info = graph.get(second.id).unwrap();
        assert_eq!(info.parent, Some(root.id));
        assert_eq!(info.merge_parent, None);
        assert_eq!(info.files, files);
        assert_eq!(info.summary(), "Second commit");
    }

    #[test]
    fn test_merge_parent_requires_parent() {
        let (_dir, graph) = setup_graph();
        let root = create_initial_commit(&graph, &Signature::sprig()).unwrap();

        let result = CommitBuilder::new(&graph)
            .message("bad")
            .merge_parent(root.id)
            .commit();
        assert!(matches!(result, Err(StorageError::CorruptedData { .. })));
    }

    #[test]
    fn test_id_covers_metadata() {
        let (_dir, graph) = setup_graph();
        let root = create_initial_commit(&graph, &Signature::sprig()).unwrap();
        let when = Utc::now();

        let a = CommitBuilder::new(&graph)
            .message("one")
            .parent(root.id)
            .timestamp(when)
            .commit()
            .unwrap();
        let b = CommitBuilder::new(&graph)
            .message("two")
            .parent(root.id)
            .timestamp(when)
            .commit()
            .unwrap();
        let a_again = CommitBuilder::new(&graph)
            .message("one")
            .parent(root.id)
            .timestamp(when)
            .commit()
            .unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.id, a_again.id);
    }

    #[test]
    fn test_history_iteration() {
        let (_dir, graph) = setup_graph();
        let c1 = create_initial_commit(&graph, &Signature::sprig()).unwrap();
        let c2 = CommitBuilder::new(&graph).message("Second").parent(c1.id).commit().unwrap();
        let c3 = CommitBuilder::new(&graph).message("Third").parent(c2.id).commit().unwrap();

        let commits: Vec<_> = graph.walk(c3.id).collect::<Result<_, _>>().unwrap();

        assert_eq!(commits.len(), 3);
        assert_eq!(commits[0].id, c3.id);
        assert_eq!(commits[1].id, c2.id);
        assert_eq!(commits[2].id, c1.id);
    }

    #[test]
    fn test_history_follows_primary_parent_only() {
        let (_dir, graph) = setup_graph();
        let root = create_initial_commit(&graph, &Signature::sprig()).unwrap();
        let side = CommitBuilder::new(&graph).message("side").parent(root.id).commit().unwrap();
        let main = CommitBuilder::new(&graph).message("main").parent(root.id).commit().unwrap();
        let merge = CommitBuilder::new(&graph)
            .message(CommitMessage::merge("side", "master"))
            .parent(main.id)
            .merge_parent(side.id)
            .commit()
            .unwrap();

        let ids: Vec<_> = graph.walk(merge.id).map(|c| c.unwrap().id).collect();
        assert_eq!(ids, vec![merge.id, main.id, root.id]);
        assert!(merge.is_merge());
        assert_eq!(merge.parents().collect::<Vec<_>>(), vec![main.id, side.id]);
    }

    #[test]
    fn test_lookup_by_prefix() {
        let (_dir, graph) = setup_graph();
        let root = create_initial_commit(&graph, &Signature::sprig()).unwrap();
        let hex = root.id.to_string();

        assert_eq!(graph.lookup(&hex).unwrap().id, root.id);
        assert_eq!(graph.lookup(&hex[..4]).unwrap().id, root.id);
        assert_eq!(graph.lookup(&hex[..10].to_uppercase()).unwrap().id, root.id);
    }

    #[test]
    fn test_lookup_errors() {
        let (_dir, graph) = setup_graph();
        create_initial_commit(&graph, &Signature::sprig()).unwrap();

        assert!(matches!(graph.lookup("abc"), Err(StorageError::IdTooShort(_))));
        assert!(matches!(graph.lookup("zzzzzz"), Err(StorageError::CommitNotFound(_))));
        assert!(matches!(
            graph.lookup(&"0".repeat(HEX_LEN)),
            Err(StorageError::CommitNotFound(_))
        ));
    }

    #[test]
    fn test_lookup_ambiguous_prefix() {
        let (dir, graph) = setup_graph();
        let root = create_initial_commit(&graph, &Signature::sprig()).unwrap();

        // forge a sibling entry in the same shard sharing the next characters
        let hex = root.id.to_string();
        let shard = dir.path().join(&hex[..SHARD_LEN]);
        let mut twin = hex[SHARD_LEN..HEX_LEN - 1].to_string();
        twin.push(if hex.ends_with('0') { '1' } else { '0' });
        fs::write(shard.join(twin), b"{}").unwrap();

        let result = graph.lookup(&hex[..8]);
        assert!(matches!(result, Err(StorageError::AmbiguousId { candidates: 2, .. })));
    }

    #[test]
    fn test_corrupted_commit_detected() {
        let (_dir, graph) = setup_graph();
        let root = create_initial_commit(&graph, &Signature::sprig()).unwrap();
        fs::write(graph.path_of(root.id), b"{\"tampered\": true}").unwrap();

        assert!(matches!(graph.get(root.id), Err(StorageError::CorruptedData { .. })));
    }

    #[test]
    fn test_all_commits() {
        let (_dir, graph) = setup_graph();
        let c1 = create_initial_commit(&graph, &Signature::sprig()).unwrap();
        let c2 = CommitBuilder::new(&graph).message("two").parent(c1.id).commit().unwrap();

        let mut expected = vec![c1.id, c2.id];
        expected.sort();
        assert_eq!(graph.all_commits().unwrap(), expected);
    }

    #[test]
    fn test_commit_messages() {
        assert_eq!(CommitMessage::merge("feat", "master"), "Merged feat into master.");
    }
}
