//! Repository facade.
//!
//! [`Repository`] implements every user command on top of the storage
//! layer. Each command loads what it needs, checks all of its
//! preconditions, and only then touches the working tree, the index or
//! the refs.
//!
//! # Example
//!
//! ```no_run
//! use sprig::repo::{Repository, RepositoryConfig};
//!
//! let config = RepositoryConfig::new("/tmp/project");
//! let (repo, _root) = Repository::init(config)?;
//!
//! std::fs::write("/tmp/project/notes.txt", "hello\n")?;
//! repo.add("notes.txt")?;
//! repo.commit("add notes")?;
//!
//! for commit in repo.log()? {
//!     println!("{} {}", commit.id.short(), commit.summary());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;
mod report;

pub use config::RepositoryConfig;
pub use error::{ErrorKind, RepoError, RepoResult};
pub use report::{LogEntry, Modification, StatusReport};

use tracing::{debug, info};

use crate::merge::{self, find_split_point, AncestryCache, Reconciliation};
use crate::storage::{
    BranchName, Commit, CommitBuilder, CommitId, CommitMessage, ContentStore, IndexEntry,
    StagingArea, Storage, StorageError,
};

/// how a merge ended
#[derive(Debug, Clone)]
pub enum MergeOutcome {
    /// the active branch was moved to the given tip, no commit was made
    FastForward(CommitId),
    /// a merge commit was created
    Merged {
        commit: Commit,
        reconciliation: Reconciliation,
    },
}

impl MergeOutcome {
    /// check if the merge left conflict markers in the working tree
    pub fn has_conflict(&self) -> bool {
        match self {
            MergeOutcome::FastForward(_) => false,
            MergeOutcome::Merged { reconciliation, .. } => reconciliation.has_conflict(),
        }
    }
}

/// An open repository.
#[derive(Debug, Clone)]
pub struct Repository {
    config: RepositoryConfig,
    storage: Storage,
}

impl Repository {
    /// Initialize a repository in the configured working directory.
    ///
    /// Returns the repository and its root commit.
    pub fn init(config: RepositoryConfig) -> RepoResult<(Self, Commit)> {
        let (storage, root) = Storage::init(&config.work_dir, &config.author).map_err(|e| match e {
            StorageError::AlreadyInitialized(_) => RepoError::AlreadyInitialized,
            other => RepoError::Storage(other),
        })?;
        Ok((Self { config, storage }, root))
    }

    /// Open the repository in the configured working directory.
    pub fn open(config: RepositoryConfig) -> RepoResult<Self> {
        let storage = Storage::open(&config.work_dir).map_err(|e| match e {
            StorageError::NotInitialized(_) => RepoError::NotInitialized,
            other => RepoError::Storage(other),
        })?;
        Ok(Self { config, storage })
    }

    /// the configuration this repository was opened with
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// the underlying stores
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// the current staging area
    pub fn staging(&self) -> RepoResult<StagingArea> {
        Ok(self.storage.load_index()?)
    }

    /// the commit HEAD points at
    pub fn head(&self) -> RepoResult<Commit> {
        Ok(self.storage.head_commit()?)
    }

    /// the checked-out branch
    pub fn active_branch(&self) -> RepoResult<BranchName> {
        Ok(self.storage.refs.active_branch()?)
    }

    // ==================== Staging ====================

    /// Stage the working copy of `path` for the next commit.
    ///
    /// A file identical to its HEAD version is unstaged instead. Adding a
    /// path staged for removal whose working file is gone cancels the
    /// removal and restores the HEAD version.
    pub fn add(&self, path: &str) -> RepoResult<()> {
        let mut index = self.storage.load_index()?;
        let head = self.storage.head_commit()?;

        match self.storage.worktree.read(path)? {
            Some(bytes) => {
                let id = ContentStore::hash(&bytes)?;
                if head.blob(path) == Some(id) {
                    index.remove(path);
                    debug!(path, "matches HEAD, unstaged");
                } else {
                    self.storage.blobs.put(&bytes)?;
                    index.put(path, IndexEntry::Staged(id));
                    debug!(path, blob = %id, "staged");
                }
            }
            None if index.get(path) == IndexEntry::Removed => {
                index.remove(path);
                self.restore(&head, path)?;
                debug!(path, "removal cancelled");
            }
            None => {
                return Err(RepoError::FileNotFound {
                    path: path.to_string(),
                })
            }
        }

        self.storage.save_index(&index)?;
        Ok(())
    }

    /// Unstage `path`, or stage its removal if HEAD tracks it.
    ///
    /// Staging a removal also deletes the working file.
    pub fn rm(&self, path: &str) -> RepoResult<()> {
        let mut index = self.storage.load_index()?;
        let head = self.storage.head_commit()?;

        if head.tracks(path) {
            index.put(path, IndexEntry::Removed);
            self.storage.worktree.delete(path)?;
            debug!(path, "staged for removal");
        } else if index.contains(path) {
            index.remove(path);
            debug!(path, "unstaged");
        } else {
            return Err(RepoError::NothingToRemove);
        }

        self.storage.save_index(&index)?;
        Ok(())
    }

    // ==================== Commits ====================

    /// Fold the staging area into a new commit on the active branch.
    pub fn commit(&self, message: &str) -> RepoResult<Commit> {
        if message.trim().is_empty() {
            return Err(RepoError::EmptyCommitMessage);
        }
        let index = self.storage.load_index()?;
        if index.is_empty() {
            return Err(RepoError::NothingToCommit);
        }
        self.commit_index(message, index, None)
    }

    fn commit_index(
        &self,
        message: &str,
        mut index: StagingArea,
        merge_parent: Option<CommitId>,
    ) -> RepoResult<Commit> {
        for (_, blob) in index.staged() {
            if !self.storage.blobs.contains(blob) {
                return Err(RepoError::MissingBlob(blob));
            }
        }

        let parent = self.storage.head_commit()?;
        let branch = self.storage.refs.active_branch()?;

        let mut builder = CommitBuilder::new(&self.storage.commits)
            .message(message)
            .author(self.config.author.clone())
            .parent(parent.id)
            .files(index.apply_to(&parent.files));
        if let Some(merged) = merge_parent {
            builder = builder.merge_parent(merged);
        }
        let commit = builder.commit()?;

        self.storage.refs.update_branch(&branch, commit.id)?;
        self.storage.refs.set_head(commit.id)?;
        index.clear();
        self.storage.save_index(&index)?;

        info!(commit = %commit.id.short(), branch = %branch, files = commit.files.len(), "committed");
        Ok(commit)
    }

    /// Primary-parent history from HEAD back to the root commit.
    pub fn log(&self) -> RepoResult<Vec<Commit>> {
        let head = self.storage.refs.head()?;
        let history = self.storage.commits.walk(head).collect::<Result<Vec<_>, _>>()?;
        Ok(history)
    }

    /// Every commit ever made, in id order.
    pub fn global_log(&self) -> RepoResult<Vec<Commit>> {
        self.storage
            .commits
            .all_commits()?
            .into_iter()
            .map(|id| self.storage.commits.get(id).map_err(RepoError::from))
            .collect()
    }

    /// Ids of all commits whose message is exactly `message`.
    pub fn find(&self, message: &str) -> RepoResult<Vec<CommitId>> {
        let found: Vec<CommitId> = self
            .global_log()?
            .into_iter()
            .filter(|commit| commit.message == message)
            .map(|commit| commit.id)
            .collect();

        if found.is_empty() {
            return Err(RepoError::NoCommitWithMessage);
        }
        Ok(found)
    }

    /// Resolve a full commit id or a unique abbreviation.
    pub fn resolve_commit(&self, id_or_prefix: &str) -> RepoResult<Commit> {
        self.storage
            .commits
            .lookup(id_or_prefix)
            .map_err(RepoError::from_commit_lookup)
    }

    // ==================== Status ====================

    /// Describe branches, the index and the working tree.
    pub fn status(&self) -> RepoResult<StatusReport> {
        let index = self.storage.load_index()?;
        let head = self.storage.head_commit()?;

        let mut not_staged = Vec::new();
        for (path, &blob) in &head.files {
            if index.contains(path) {
                continue;
            }
            match self.storage.worktree.hash(path)? {
                None => not_staged.push((path.clone(), Modification::Deleted)),
                Some(current) if current != blob => not_staged.push((path.clone(), Modification::Modified)),
                Some(_) => {}
            }
        }
        for (path, blob) in index.staged() {
            match self.storage.worktree.hash(path)? {
                None => not_staged.push((path.to_string(), Modification::Deleted)),
                Some(current) if current != blob => {
                    not_staged.push((path.to_string(), Modification::Modified))
                }
                Some(_) => {}
            }
        }
        not_staged.sort();

        Ok(StatusReport {
            branches: self.storage.refs.list_branches()?,
            active: self.storage.refs.active_branch()?,
            staged: index.staged().map(|(path, _)| path.to_string()).collect(),
            removed: index.removed().map(str::to_string).collect(),
            not_staged,
            untracked: self.untracked_files(&head, &index)?,
        })
    }

    /// working files neither tracked by `head` nor present in `index`
    fn untracked_files(&self, head: &Commit, index: &StagingArea) -> RepoResult<Vec<String>> {
        Ok(self
            .storage
            .worktree
            .list_files()?
            .into_iter()
            .filter(|path| !head.tracks(path) && !index.contains(path))
            .collect())
    }

    // ==================== Checkout ====================

    /// Restore `path` from the HEAD commit.
    pub fn checkout_file(&self, path: &str) -> RepoResult<()> {
        let head = self.storage.head_commit()?;
        self.restore(&head, path)
    }

    /// Restore `path` from the commit named by a full or abbreviated id.
    pub fn checkout_file_in_commit(&self, id_or_prefix: &str, path: &str) -> RepoResult<()> {
        let commit = self.resolve_commit(id_or_prefix)?;
        self.restore(&commit, path)
    }

    fn restore(&self, commit: &Commit, path: &str) -> RepoResult<()> {
        let blob = commit.blob(path).ok_or_else(|| RepoError::FileNotInCommit {
            path: path.to_string(),
        })?;
        let bytes = self.storage.blobs.get(blob)?;
        self.storage.worktree.write(path, &bytes)?;
        debug!(path, commit = %commit.id.short(), "restored file");
        Ok(())
    }

    /// Switch to another branch.
    ///
    /// The working tree is replaced by the branch tip's files and the
    /// staging area is cleared.
    pub fn checkout_branch(&self, name: &str) -> RepoResult<()> {
        let branch = BranchName::new(name).map_err(|_| RepoError::NoSuchBranch)?;
        if !self.storage.refs.branch_exists(&branch) {
            return Err(RepoError::NoSuchBranch);
        }
        if self.storage.refs.active_branch()? == branch {
            return Err(RepoError::NoOpCheckout);
        }

        let target = self.storage.commits.get(self.storage.refs.resolve_branch(&branch)?)?;
        let head = self.storage.head_commit()?;
        let mut index = self.storage.load_index()?;
        self.ensure_no_untracked_in_way(&head, &index, &target)?;

        self.switch_tree(&head, &target)?;
        index.clear();
        self.storage.save_index(&index)?;
        self.storage.refs.set_head(target.id)?;
        self.storage.refs.set_active_branch(&branch)?;

        info!(branch = %branch, commit = %target.id.short(), "switched branch");
        Ok(())
    }

    /// Move the active branch to a commit and check it out.
    pub fn reset(&self, id_or_prefix: &str) -> RepoResult<()> {
        let target = self.resolve_commit(id_or_prefix)?;
        let head = self.storage.head_commit()?;
        let mut index = self.storage.load_index()?;
        self.ensure_no_untracked_in_way(&head, &index, &target)?;

        let branch = self.storage.refs.active_branch()?;
        self.switch_tree(&head, &target)?;
        index.clear();
        self.storage.save_index(&index)?;
        self.storage.refs.update_branch(&branch, target.id)?;
        self.storage.refs.set_head(target.id)?;

        info!(branch = %branch, commit = %target.id.short(), "reset");
        Ok(())
    }

    /// fail if writing `target` would clobber an untracked file
    fn ensure_no_untracked_in_way(
        &self,
        head: &Commit,
        index: &StagingArea,
        target: &Commit,
    ) -> RepoResult<()> {
        for path in self.untracked_files(head, index)? {
            let Some(wanted) = target.blob(&path) else { continue };
            if self.storage.worktree.hash(&path)? != Some(wanted) {
                return Err(RepoError::UntrackedFileInWay { path });
            }
        }
        Ok(())
    }

    /// replace the files of `from` in the working tree with those of `to`
    fn switch_tree(&self, from: &Commit, to: &Commit) -> RepoResult<()> {
        for (path, &blob) in &to.files {
            let bytes = self.storage.blobs.get(blob)?;
            self.storage.worktree.write(path, &bytes)?;
        }
        for path in from.files.keys().filter(|path| !to.tracks(path)) {
            self.storage.worktree.delete(path)?;
        }
        Ok(())
    }

    // ==================== Branches ====================

    /// Create a branch at HEAD without switching to it.
    pub fn branch(&self, name: &str) -> RepoResult<BranchName> {
        let branch = BranchName::new(name)?;
        let head = self.storage.refs.head()?;
        self.storage.refs.create_branch(&branch, head).map_err(|e| match e {
            StorageError::BranchAlreadyExists(_) => RepoError::BranchAlreadyExists,
            other => RepoError::Storage(other),
        })?;
        info!(branch = %branch, commit = %head.short(), "created branch");
        Ok(branch)
    }

    /// Delete a branch pointer; its commits stay.
    pub fn rm_branch(&self, name: &str) -> RepoResult<()> {
        let branch = BranchName::new(name).map_err(|_| RepoError::BranchDoesNotExist)?;
        match self.storage.refs.delete_inactive_branch(&branch) {
            Ok(true) => {
                info!(branch = %branch, "removed branch");
                Ok(())
            }
            Ok(false) => Err(RepoError::CannotRemoveCurrentBranch),
            Err(StorageError::BranchNotFound(_)) => Err(RepoError::BranchDoesNotExist),
            Err(other) => Err(RepoError::Storage(other)),
        }
    }

    // ==================== Merge ====================

    /// Merge the tip of branch `name` into the active branch.
    pub fn merge(&self, name: &str) -> RepoResult<MergeOutcome> {
        let active_branch = self.storage.refs.active_branch()?;
        let given_branch = BranchName::new(name).map_err(|_| RepoError::BranchDoesNotExist)?;
        if given_branch == active_branch {
            return Err(RepoError::CannotMergeWithSelf);
        }
        if !self.storage.refs.branch_exists(&given_branch) {
            return Err(RepoError::BranchDoesNotExist);
        }
        let mut index = self.storage.load_index()?;
        if !index.is_empty() {
            return Err(RepoError::UncommittedChanges);
        }

        let head = self.storage.head_commit()?;
        let given = self
            .storage
            .commits
            .get(self.storage.refs.resolve_branch(&given_branch)?)?;
        self.ensure_no_untracked_in_way(&head, &index, &given)?;

        let mut cache = AncestryCache::new(&self.storage.commits);
        let split_id = find_split_point(&mut cache, head.id, given.id)?;

        if split_id == given.id {
            return Err(RepoError::NothingToMerge);
        }
        if split_id == head.id {
            self.switch_tree(&head, &given)?;
            self.storage.refs.update_branch(&active_branch, given.id)?;
            self.storage.refs.set_head(given.id)?;
            info!(branch = %active_branch, commit = %given.id.short(), "fast-forwarded");
            return Ok(MergeOutcome::FastForward(given.id));
        }

        let split = cache.commit(split_id)?.clone();
        let reconciliation = merge::reconcile(&self.storage, &mut index, &head, &given, &split)?;

        let message = CommitMessage::merge(given_branch.as_str(), active_branch.as_str());
        let commit = self.commit_index(&message, index, Some(given.id))?;

        info!(
            given = %given_branch,
            commit = %commit.id.short(),
            conflicts = reconciliation.conflicted.len(),
            "merged"
        );
        Ok(MergeOutcome::Merged {
            commit,
            reconciliation,
        })
    }
}
