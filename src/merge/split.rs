//! Split-point (merge base) selection.
//!
//! both tips' ancestor sets are collected by an explicit worklist walk
//! over primary and merge parents. The common ancestors are reduced to
//! the best ones (those that are not a proper ancestor of another common
//! ancestor); if several remain, the most recent wins and equal
//! timestamps fall back to the smallest id.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::storage::{Commit, CommitGraph, CommitId, StorageError, StorageResult};

/// ancestor id to commit timestamp
pub type AncestorSet = HashMap<CommitId, DateTime<Utc>>;

/// memoizing commit loader for graph walks
///
/// each commit is read from disk at most once per cache, however many
/// walks pass through it.
pub struct AncestryCache<'g> {
    graph: &'g CommitGraph,
    commits: HashMap<CommitId, Commit>,
}

impl<'g> AncestryCache<'g> {
    pub fn new(graph: &'g CommitGraph) -> Self {
        Self {
            graph,
            commits: HashMap::new(),
        }
    }

    /// number of distinct commits loaded so far
    pub fn loaded(&self) -> usize {
        self.commits.len()
    }

    /// load a commit through the cache
    pub fn commit(&mut self, id: CommitId) -> StorageResult<&Commit> {
        match self.commits.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let commit = self.graph.get(id)?;
                Ok(entry.insert(commit))
            }
        }
    }

    /// every commit reachable from `start` (inclusive) over both parent links
    pub fn ancestors(&mut self, start: CommitId) -> StorageResult<AncestorSet> {
        let mut seen = AncestorSet::new();
        let mut worklist = vec![start];

        while let Some(id) = worklist.pop() {
            if seen.contains_key(&id) {
                continue;
            }
            let commit = self.commit(id)?;
            seen.insert(id, commit.timestamp);
            worklist.extend(commit.parents().filter(|p| !seen.contains_key(p)));
        }

        Ok(seen)
    }
}

/// choose the split point of `active` and `given`
pub fn find_split_point(
    cache: &mut AncestryCache<'_>,
    active: CommitId,
    given: CommitId,
) -> StorageResult<CommitId> {
    let active_ancestors = cache.ancestors(active)?;
    let given_ancestors = cache.ancestors(given)?;

    let mut common: Vec<(CommitId, DateTime<Utc>)> = active_ancestors
        .into_iter()
        .filter(|(id, _)| given_ancestors.contains_key(id))
        .collect();

    // newest first, so a dominating candidate usually hides the rest early
    common.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut dominated = HashSet::new();
    for &(candidate, _) in &common {
        if dominated.contains(&candidate) {
            continue;
        }
        for ancestor in cache.ancestors(candidate)?.into_keys() {
            if ancestor != candidate {
                dominated.insert(ancestor);
            }
        }
    }

    let split = common
        .into_iter()
        .find(|(id, _)| !dominated.contains(id))
        .map(|(id, _)| id)
        .ok_or_else(|| StorageError::CorruptedData {
            path: format!("{}..{}", active, given).into(),
            reason: "commits share no common ancestor".to_string(),
        })?;

    debug!(active = %active.short(), given = %given.short(), split = %split.short(), "found split point");
    Ok(split)
}
