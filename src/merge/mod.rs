//! merge engine
//!
//! merging works over three commits: Active (the current branch tip),
//! Given (the tip being merged in) and Split (their chosen common
//! ancestor, see [`split`]). Each path is classified by [`reconcile`]
//! and the resulting actions are applied to the working tree and the
//! staging area here. Committing the result is left to the caller.

mod reconcile;
mod split;

pub use reconcile::{classify, conflict_content, plan, MergeAction};
pub use split::{find_split_point, AncestorSet, AncestryCache};

use tracing::{debug, warn};

use crate::storage::{Commit, IndexEntry, StagingArea, Storage, StorageResult};

/// what reconciliation did, path lists in path order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// paths checked out from Given
    pub taken: Vec<String>,
    /// paths staged for removal
    pub removed: Vec<String>,
    /// paths written with conflict markers
    pub conflicted: Vec<String>,
}

impl Reconciliation {
    /// check if any path ended in conflict
    pub fn has_conflict(&self) -> bool {
        !self.conflicted.is_empty()
    }
}

/// apply the three-way reconciliation of `active`, `given` and `split`
///
/// writes the working tree and fills `index`; the caller persists the
/// index and creates the merge commit.
pub fn reconcile(
    storage: &Storage,
    index: &mut StagingArea,
    active: &Commit,
    given: &Commit,
    split: &Commit,
) -> StorageResult<Reconciliation> {
    let mut outcome = Reconciliation::default();

    for (path, action) in plan(&active.files, &given.files, &split.files) {
        match action {
            MergeAction::TakeGiven(blob) => {
                let bytes = storage.blobs.get(blob)?;
                storage.worktree.write(&path, &bytes)?;
                index.put(path.clone(), IndexEntry::Staged(blob));
                debug!(path = %path, "taking given version");
                outcome.taken.push(path);
            }
            MergeAction::Remove => {
                index.put(path.clone(), IndexEntry::Removed);
                storage.worktree.delete(&path)?;
                debug!(path = %path, "removing");
                outcome.removed.push(path);
            }
            MergeAction::Conflict => {
                let ours = active.blob(&path).map(|id| storage.blobs.get(id)).transpose()?;
                let theirs = given.blob(&path).map(|id| storage.blobs.get(id)).transpose()?;
                let content = conflict_content(ours.as_deref(), theirs.as_deref());

                storage.worktree.write(&path, &content)?;
                let blob = storage.blobs.put(&content)?;
                index.put(path.clone(), IndexEntry::Staged(blob));
                warn!(path = %path, "merge conflict");
                outcome.conflicted.push(path);
            }
            MergeAction::Keep => {}
        }
    }

    Ok(outcome)
}
