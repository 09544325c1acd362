//! sprig - a small local version-control engine
//!
//! Snapshots of a flat working directory are stored as commits in a
//! content-addressed store under `.sprig/`. Branches are named pointers
//! into the commit graph, and branches are combined by a three-way merge
//! against their split point.
//!
//! # Example
//!
//! ```no_run
//! use sprig::repo::{Repository, RepositoryConfig};
//!
//! let repo = Repository::open(RepositoryConfig::new("./project"))?;
//! repo.branch("feature")?;
//! println!("{}", repo.status()?);
//! # Ok::<(), sprig::repo::RepoError>(())
//! ```
//!
//! The crate is layered: [`storage`] persists blobs, commits, refs and the
//! index, [`merge`] holds split-point selection and reconciliation, and
//! [`repo`] implements the user commands.

pub mod merge;
pub mod repo;
pub mod storage;
