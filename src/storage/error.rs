//! Storage layer error types
//!
//! All errors that can occur while reading or writing the repository
//! directory are defined here. We use `thiserror` for ergonomic error
//! definition and better error messages

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::types::{BlobId, BranchName, InvalidNameError};

/// the main error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// error from the hashing backend
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// an atomic replace could not move the temp file into place
    #[error("could not persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// invalid branch name, path or id
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// the requested blob is not in the content store
    #[error("blob not found: {0}")]
    BlobNotFound(BlobId),

    /// no commit matches the id or prefix
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// a short prefix matches more than one commit
    #[error("ambiguous commit id {prefix}: {candidates} candidates")]
    AmbiguousId { prefix: String, candidates: usize },

    /// a prefix below the minimum lookup length
    #[error("commit id too short: {0}")]
    IdTooShort(String),

    /// the branch does not exist
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// branch already exists
    #[error("branch already exists: {0}")]
    BranchAlreadyExists(BranchName),

    /// data integrity check failed
    #[error("corrupted data at {path}: {reason}")]
    CorruptedData { path: PathBuf, reason: String },

    /// repo is not initialized
    #[error("repository not initialized: {0}")]
    NotInitialized(PathBuf),

    /// a repository already exists here
    #[error("repository already exists: {0}")]
    AlreadyInitialized(PathBuf),
}

impl StorageError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::BlobNotFound(_)
                | StorageError::CommitNotFound(_)
                | StorageError::BranchNotFound(_)
        )
    }

    /// check if this error comes from resolving an id or prefix
    pub fn is_lookup(&self) -> bool {
        self.is_not_found()
            || matches!(
                self,
                StorageError::AmbiguousId { .. } | StorageError::IdTooShort(_)
            )
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
