//! Repository error types.
//!
//! Every user-facing failure of a command is one variant here, carrying
//! the message the front-end shows. Storage failures that are not part of
//! the command vocabulary pass through as [`RepoError::Storage`].

use thiserror::Error;

use crate::storage::{BlobId, InvalidNameError, StorageError};

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Broad classes of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// the repository is not in a state that allows the command
    RepositoryState,
    /// a commit, branch or file could not be resolved
    Lookup,
    /// persisted data is missing or inconsistent; never recovered
    Integrity,
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    // ==================== Repository state ====================
    #[error("A version-control system already exists in the current directory.")]
    AlreadyInitialized,

    #[error("Not in an initialized repository directory.")]
    NotInitialized,

    #[error("Please enter a commit message.")]
    EmptyCommitMessage,

    #[error("No changes added to the commit.")]
    NothingToCommit,

    #[error("No reason to remove the file.")]
    NothingToRemove,

    #[error("A branch with that name already exists.")]
    BranchAlreadyExists,

    #[error("Cannot remove the current branch.")]
    CannotRemoveCurrentBranch,

    #[error("Cannot merge a branch with itself.")]
    CannotMergeWithSelf,

    #[error("You have uncommitted changes.")]
    UncommittedChanges,

    #[error("There is an untracked file in the way; delete it, or add and commit it first.")]
    UntrackedFileInWay { path: String },

    #[error("Given branch is an ancestor of the current branch.")]
    NothingToMerge,

    #[error("No need to checkout the current branch.")]
    NoOpCheckout,

    #[error("Invalid name: {0}.")]
    InvalidName(#[from] InvalidNameError),

    // ==================== Lookup ====================
    #[error("No commit with that id exists.")]
    CommitNotFound,

    #[error("Commit id is ambiguous.")]
    AmbiguousCommitId,

    #[error("Commit id is too short.")]
    CommitIdTooShort,

    /// raised by checkout
    #[error("No such branch exists.")]
    NoSuchBranch,

    /// raised by rm-branch and merge
    #[error("A branch with that name does not exist.")]
    BranchDoesNotExist,

    #[error("File does not exist.")]
    FileNotFound { path: String },

    #[error("File does not exist in that commit.")]
    FileNotInCommit { path: String },

    #[error("Found no commit with that message.")]
    NoCommitWithMessage,

    // ==================== Integrity ====================
    #[error("Object store is missing blob {0}.")]
    MissingBlob(BlobId),

    #[error("{0}")]
    Storage(#[from] StorageError),
}

impl RepoError {
    /// classify the error
    pub fn kind(&self) -> ErrorKind {
        use RepoError::*;
        match self {
            AlreadyInitialized
            | NotInitialized
            | EmptyCommitMessage
            | NothingToCommit
            | NothingToRemove
            | BranchAlreadyExists
            | CannotRemoveCurrentBranch
            | CannotMergeWithSelf
            | UncommittedChanges
            | UntrackedFileInWay { .. }
            | NothingToMerge
            | NoOpCheckout
            | InvalidName(_) => ErrorKind::RepositoryState,

            CommitNotFound
            | AmbiguousCommitId
            | CommitIdTooShort
            | NoSuchBranch
            | BranchDoesNotExist
            | FileNotFound { .. }
            | FileNotInCommit { .. }
            | NoCommitWithMessage => ErrorKind::Lookup,

            // a file table naming a blob the store lacks
            Storage(StorageError::BlobNotFound(_)) => ErrorKind::Integrity,
            Storage(StorageError::InvalidName(_)) => ErrorKind::RepositoryState,
            Storage(e) if e.is_lookup() => ErrorKind::Lookup,
            MissingBlob(_) | Storage(_) => ErrorKind::Integrity,
        }
    }

    /// no-op conditions that are reported but are not failures
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            RepoError::NothingToCommit | RepoError::NoOpCheckout | RepoError::NothingToMerge
        )
    }

    /// map commit lookup failures onto the command vocabulary
    pub(crate) fn from_commit_lookup(err: StorageError) -> Self {
        match err {
            StorageError::CommitNotFound(_) => RepoError::CommitNotFound,
            StorageError::AmbiguousId { .. } => RepoError::AmbiguousCommitId,
            StorageError::IdTooShort(_) => RepoError::CommitIdTooShort,
            other => RepoError::Storage(other),
        }
    }
}
