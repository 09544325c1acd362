//!  Branch and reference management.
//!
//!  refs are plain text files holding a commit id. This module handles:
//! - branch lifecycle (create, update, delete, list)
//! - the HEAD entry (the currently checked-out commit)
//! - the active branch entry (which branch commits advance)
//!
//! the active branch is recorded inside the branches directory under a
//! name that [`BranchName`] validation rejects, so it can never collide
//! with a real branch.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fsio;
use crate::storage::types::{BranchName, CommitId};

/// file inside the branches directory naming the active branch
const ACTIVE_ENTRY: &str = ".current";

/// Manages branch tips, HEAD and the active branch.
#[derive(Debug, Clone)]
pub struct RefStore {
    branches_dir: PathBuf,
    head_file: PathBuf,
}

impl RefStore {
    /// create a store over an existing branches directory and HEAD path
    pub fn new(branches_dir: impl Into<PathBuf>, head_file: impl Into<PathBuf>) -> Self {
        Self {
            branches_dir: branches_dir.into(),
            head_file: head_file.into(),
        }
    }

    fn branch_path(&self, branch: &BranchName) -> PathBuf {
        self.branches_dir.join(branch.as_str())
    }

    fn read_id(path: &Path) -> StorageResult<Option<CommitId>> {
        match fsio::read_trimmed(path)? {
            Some(hex) => CommitId::from_hex(&hex).map(Some).map_err(|_| {
                StorageError::CorruptedData {
                    path: path.to_path_buf(),
                    reason: format!("not a commit id: {:?}", hex),
                }
            }),
            None => Ok(None),
        }
    }

    fn write_id(path: &Path, id: CommitId) -> StorageResult<()> {
        fsio::write_atomic(path, format!("{}\n", id).as_bytes())
    }

    // ==================== Branches ====================

    /// Check if a branch exists.
    pub fn branch_exists(&self, branch: &BranchName) -> bool {
        self.branch_path(branch).is_file()
    }

    /// Resolve a branch name to its current tip.
    pub fn resolve_branch(&self, branch: &BranchName) -> StorageResult<CommitId> {
        Self::read_id(&self.branch_path(branch))?
            .ok_or_else(|| StorageError::BranchNotFound(branch.to_string()))
    }

    /// Create a new branch pointing to the given commit.
    pub fn create_branch(&self, branch: &BranchName, target: CommitId) -> StorageResult<()> {
        if self.branch_exists(branch) {
            return Err(StorageError::BranchAlreadyExists(branch.clone()));
        }

        Self::write_id(&self.branch_path(branch), target)?;
        debug!(branch = %branch, target = %target.short(), "created branch");
        Ok(())
    }

    /// Update an existing branch to point to a new commit.
    pub fn update_branch(&self, branch: &BranchName, target: CommitId) -> StorageResult<()> {
        if !self.branch_exists(branch) {
            return Err(StorageError::BranchNotFound(branch.to_string()));
        }

        Self::write_id(&self.branch_path(branch), target)?;
        debug!(branch = %branch, target = %target.short(), "moved branch");
        Ok(())
    }

    /// Delete a branch.
    ///
    /// The caller is responsible for refusing to delete the active branch;
    /// see [`RefStore::delete_inactive_branch`].
    fn delete_branch(&self, branch: &BranchName) -> StorageResult<()> {
        match fs::remove_file(self.branch_path(branch)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::BranchNotFound(branch.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Delete a branch unless it is the active one.
    ///
    /// Returns `Ok(false)` without touching anything when `branch` is active.
    pub fn delete_inactive_branch(&self, branch: &BranchName) -> StorageResult<bool> {
        if &self.active_branch()? == branch {
            return Ok(false);
        }
        self.delete_branch(branch)?;
        debug!(branch = %branch, "deleted branch");
        Ok(true)
    }

    /// List all branches, sorted by name.
    pub fn list_branches(&self) -> StorageResult<Vec<BranchName>> {
        let mut result = Vec::new();
        for entry in fs::read_dir(&self.branches_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            // skips the active entry and in-flight temp files
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(branch) = BranchName::new(name) {
                    result.push(branch);
                }
            }
        }

        result.sort();
        Ok(result)
    }

    // ==================== HEAD & active branch ====================

    /// Get the commit HEAD points at.
    pub fn head(&self) -> StorageResult<CommitId> {
        Self::read_id(&self.head_file)?
            .ok_or_else(|| StorageError::NotInitialized(self.head_file.clone()))
    }

    /// Point HEAD at a commit.
    pub fn set_head(&self, target: CommitId) -> StorageResult<()> {
        Self::write_id(&self.head_file, target)
    }

    /// Get the name of the checked-out branch.
    pub fn active_branch(&self) -> StorageResult<BranchName> {
        let path = self.branches_dir.join(ACTIVE_ENTRY);
        let name = fsio::read_trimmed(&path)?
            .ok_or_else(|| StorageError::NotInitialized(path.clone()))?;
        BranchName::new(name.clone()).map_err(|_| StorageError::CorruptedData {
            path,
            reason: format!("not a branch name: {:?}", name),
        })
    }

    /// Record which branch is checked out.
    pub fn set_active_branch(&self, branch: &BranchName) -> StorageResult<()> {
        let path = self.branches_dir.join(ACTIVE_ENTRY);
        fsio::write_atomic(&path, format!("{}\n", branch).as_bytes())
    }

    /// Initialize the default branch and make it active.
    ///
    /// This should be called after creating the initial commit.
    pub fn init_default_branch(&self, initial_commit: CommitId) -> StorageResult<BranchName> {
        let branch = BranchName::default_branch();
        self.create_branch(&branch, initial_commit)?;
        self.set_active_branch(&branch)?;
        self.set_head(initial_commit)?;
        Ok(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_commit(seed: &str) -> CommitId {
        CommitId::hash(seed.as_bytes()).unwrap()
    }

    fn setup_refs() -> (TempDir, RefStore, CommitId) {
        let dir = TempDir::new().unwrap();
        let branches = dir.path().join("branches");
        fs::create_dir_all(&branches).unwrap();
        let refs = RefStore::new(branches, dir.path().join("HEAD"));

        let initial = fake_commit("initial");
        refs.init_default_branch(initial).unwrap();
        (dir, refs, initial)
    }

    #[test]
    fn test_init_default_branch() {
        let (_dir, refs, initial) = setup_refs();

        assert_eq!(refs.head().unwrap(), initial);
        assert_eq!(refs.active_branch().unwrap().as_str(), "master");
        assert_eq!(refs.resolve_branch(&BranchName::default_branch()).unwrap(), initial);
    }

    #[test]
    fn test_branch_lifecycle() {
        let (_dir, refs, base) = setup_refs();
        let branch = BranchName::new("feature").unwrap();

        // Create
        assert!(!refs.branch_exists(&branch));
        refs.create_branch(&branch, base).unwrap();
        assert!(refs.branch_exists(&branch));

        // Update
        let next = fake_commit("next");
        refs.update_branch(&branch, next).unwrap();
        assert_eq!(refs.resolve_branch(&branch).unwrap(), next);

        // Delete
        assert!(refs.delete_inactive_branch(&branch).unwrap());
        assert!(!refs.branch_exists(&branch));
    }

    #[test]
    fn test_duplicate_branch_error() {
        let (_dir, refs, base) = setup_refs();
        let branch = BranchName::new("feature").unwrap();

        refs.create_branch(&branch, base).unwrap();
        let result = refs.create_branch(&branch, base);

        assert!(matches!(result, Err(StorageError::BranchAlreadyExists(_))));
    }

    #[test]
    fn test_delete_active_branch_refused() {
        let (_dir, refs, _) = setup_refs();
        let master = BranchName::default_branch();

        assert!(!refs.delete_inactive_branch(&master).unwrap());
        assert!(refs.branch_exists(&master));
    }

    #[test]
    fn test_delete_missing_branch() {
        let (_dir, refs, _) = setup_refs();
        let ghost = BranchName::new("ghost").unwrap();

        let result = refs.delete_inactive_branch(&ghost);
        assert!(matches!(result, Err(StorageError::BranchNotFound(_))));
    }

    #[test]
    fn test_list_branches_skips_active_entry() {
        let (_dir, refs, base) = setup_refs();
        refs.create_branch(&BranchName::new("zeta").unwrap(), base).unwrap();
        refs.create_branch(&BranchName::new("alpha").unwrap(), base).unwrap();

        let names: Vec<_> = refs
            .list_branches()
            .unwrap()
            .into_iter()
            .map(|b| b.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "master", "zeta"]);
    }

    #[test]
    fn test_head_moves_without_touching_branch() {
        let (_dir, refs, initial) = setup_refs();
        let elsewhere = fake_commit("elsewhere");

        refs.set_head(elsewhere).unwrap();

        assert_eq!(refs.head().unwrap(), elsewhere);
        assert_eq!(refs.resolve_branch(&BranchName::default_branch()).unwrap(), initial);
    }
}
