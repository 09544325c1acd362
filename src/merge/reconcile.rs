//! Three-way per-file reconciliation.
//!
//! for each path the blob ids at Active (`a`), Given (`g`) and Split
//! (`s`) decide what the merge does with it. The decision is a pure
//! function so it can be tested without a repository.

use std::collections::{BTreeMap, BTreeSet};

use crate::storage::{BlobId, FileTable};

/// what the merge does with one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// nothing to do, the active version stands
    Keep,
    /// check out and stage the given version
    TakeGiven(BlobId),
    /// stage removal and delete from the working tree
    Remove,
    /// both sides changed the path differently
    Conflict,
}

/// classify one path from its three optional blob ids
pub fn classify(a: Option<BlobId>, g: Option<BlobId>, s: Option<BlobId>) -> MergeAction {
    match (a, g, s) {
        // changed only on the given side
        (_, Some(given), _) if g != s && a == s => MergeAction::TakeGiven(given),
        // added only on the given side
        (None, Some(given), None) => MergeAction::TakeGiven(given),
        // unchanged here, removed there
        (Some(_), None, _) if a == s => MergeAction::Remove,
        // modified in different ways
        (Some(_), Some(_), _) if a != g && g != s => MergeAction::Conflict,
        (None, Some(_), Some(_)) if g != s => MergeAction::Conflict,
        (Some(_), None, Some(_)) if a != s => MergeAction::Conflict,
        _ => MergeAction::Keep,
    }
}

/// every path that needs an action, in path order
pub fn plan(active: &FileTable, given: &FileTable, split: &FileTable) -> BTreeMap<String, MergeAction> {
    let paths: BTreeSet<&String> = active.keys().chain(given.keys()).chain(split.keys()).collect();

    paths
        .into_iter()
        .filter_map(|path| {
            let action = classify(
                active.get(path).copied(),
                given.get(path).copied(),
                split.get(path).copied(),
            );
            (action != MergeAction::Keep).then(|| (path.clone(), action))
        })
        .collect()
}

/// build the content written for a conflicted path
///
/// an absent side contributes nothing between its markers.
pub fn conflict_content(active: Option<&[u8]>, given: Option<&[u8]>) -> Vec<u8> {
    let active = active.unwrap_or_default();
    let given = given.unwrap_or_default();

    let mut out = Vec::with_capacity(active.len() + given.len() + 32);
    out.extend_from_slice(b"<<<<<<< HEAD\n");
    out.extend_from_slice(active);
    out.extend_from_slice(b"=======\n");
    out.extend_from_slice(given);
    out.extend_from_slice(b">>>>>>>\n");
    out
}
