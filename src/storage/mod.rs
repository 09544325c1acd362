//! storage layer for sprig
//!
//! this module owns everything that is persisted: blobs, commits, refs
//! and the index. The merge engine and the repository facade use this API
//! and never touch the repository directory directly.
//!
//!  # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Storage                             │
//! │        (layout of .sprig/, hands out the stores below)      │
//! └─────────────────────────────────────────────────────────────┘
//!        │              │              │              │
//!        ▼              ▼              ▼              ▼
//!  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐
//!  │   blob    │  │  commit   │  │   refs    │  │   index   │
//!  │ (content) │  │  (graph)  │  │(branches) │  │ (staging) │
//!  └───────────┘  └───────────┘  └───────────┘  └───────────┘
//!                                                      │
//!                                 worktree ◄───────────┘
//!                            (user's files)
//!  ```
//!
//! # Usage
//!
//! ```ignore
//! use sprig::storage::{Storage, Signature, CommitBuilder};
//!
//! let (storage, root) = Storage::init("./project", &Signature::sprig())?;
//! let blob = storage.blobs.put(b"hello")?;
//! let mut files = root.files.clone();
//! files.insert("a.txt".to_string(), blob);
//! let commit = CommitBuilder::new(&storage.commits)
//!     .message("add a.txt")
//!     .parent(root.id)
//!     .files(files)
//!     .commit()?;
//! ```

mod blob;
mod commit;
mod error;
mod fsio;
mod index;
mod refs;
mod repository;
mod types;
mod worktree;

// Re-export public API
pub use blob::ContentStore;
pub use commit::{
    create_initial_commit, Commit, CommitBuilder, CommitGraph, CommitMessage, FileTable, History,
    MIN_PREFIX_LEN,
};
pub use error::{StorageError, StorageResult};
pub use index::{IndexEntry, StagingArea};
pub use refs::RefStore;
pub use repository::{Storage, REPO_DIR};
pub use types::{BlobId, BranchName, CommitId, InvalidNameError, Signature, HEX_LEN};
pub use worktree::WorkTree;
