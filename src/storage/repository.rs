//!   On-disk repository layout.
//!
//!  This is the central component of the storage layer. It owns the paths
//!  of the repository directory and hands out the individual stores; the
//!  facade in [`crate::repo`] never builds a path itself.
//!
//! ```text
//! <work dir>/
//!   .sprig/
//!     objects/                  blobs by content hash
//!     commits/<4 hex>/<36 hex>  commit records
//!     branches/<name>           branch tips
//!     branches/.current         active branch name
//!     HEAD                      current commit id
//!     INDEX                     staging table
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::storage::blob::ContentStore;
use crate::storage::commit::{self, Commit, CommitGraph};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::index::StagingArea;
use crate::storage::refs::RefStore;
use crate::storage::types::Signature;
use crate::storage::worktree::WorkTree;

/// name of the repository directory inside the working directory
pub const REPO_DIR: &str = ".sprig";

/// Handles to every persisted namespace of one repository.
#[derive(Debug, Clone)]
pub struct Storage {
    repo_dir: PathBuf,
    index_path: PathBuf,
    pub blobs: ContentStore,
    pub commits: CommitGraph,
    pub refs: RefStore,
    pub worktree: WorkTree,
}

impl Storage {
    fn at(work_dir: &Path) -> Self {
        let repo_dir = work_dir.join(REPO_DIR);
        Self {
            index_path: repo_dir.join("INDEX"),
            blobs: ContentStore::new(repo_dir.join("objects")),
            commits: CommitGraph::new(repo_dir.join("commits")),
            refs: RefStore::new(repo_dir.join("branches"), repo_dir.join("HEAD")),
            worktree: WorkTree::new(work_dir),
            repo_dir,
        }
    }

    /// check whether `work_dir` holds a repository
    pub fn is_initialized(work_dir: impl AsRef<Path>) -> bool {
        work_dir.as_ref().join(REPO_DIR).is_dir()
    }

    /// Open an existing repository.
    pub fn open(work_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let work_dir = work_dir.as_ref();
        if !Self::is_initialized(work_dir) {
            return Err(StorageError::NotInitialized(work_dir.to_path_buf()));
        }
        Ok(Self::at(work_dir))
    }

    /// Initialize a new repository.
    ///
    /// Creates the directory layout, the root commit and the default
    /// branch, and an empty index. Returns the root commit.
    pub fn init(work_dir: impl AsRef<Path>, author: &Signature) -> StorageResult<(Self, Commit)> {
        let work_dir = work_dir.as_ref();
        if Self::is_initialized(work_dir) {
            return Err(StorageError::AlreadyInitialized(work_dir.to_path_buf()));
        }

        let storage = Self::at(work_dir);
        fs::create_dir_all(storage.blobs.root())?;
        fs::create_dir_all(storage.repo_dir.join("commits"))?;
        fs::create_dir_all(storage.repo_dir.join("branches"))?;

        let root = commit::create_initial_commit(&storage.commits, author)?;
        let branch = storage.refs.init_default_branch(root.id)?;
        storage.save_index(&StagingArea::new())?;

        info!(path = %storage.repo_dir.display(), branch = %branch, "initialized repository");
        Ok((storage, root))
    }

    /// the `.sprig` directory
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Read the whole staging area.
    pub fn load_index(&self) -> StorageResult<StagingArea> {
        StagingArea::load(&self.index_path)
    }

    /// Write the whole staging area back.
    pub fn save_index(&self, index: &StagingArea) -> StorageResult<()> {
        index.save(&self.index_path)
    }

    /// The commit HEAD points at.
    pub fn head_commit(&self) -> StorageResult<Commit> {
        let head = self.refs.head()?;
        self.commits.get(head)
    }
}
