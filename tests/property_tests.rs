//! Property-based tests for the store, the index and merge classification.
//!
//! These tests use proptest to check invariants across randomly generated
//! inputs.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tempfile::TempDir;

use sprig::merge::{classify, conflict_content, MergeAction};
use sprig::storage::{BlobId, BranchName, ContentStore, FileTable, IndexEntry, StagingArea};

/// Strategy for an optional blob id drawn from a small pool, so that
/// equal ids come up often.
fn maybe_blob() -> impl Strategy<Value = Option<BlobId>> {
    prop::option::of((0u8..4).prop_map(|n| BlobId::of(&[n]).unwrap()))
}

/// Strategy for flat file names.
fn file_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}\\.txt"
}

fn file_table() -> impl Strategy<Value = FileTable> {
    prop::collection::btree_map(file_name(), (0u8..8).prop_map(|n| BlobId::of(&[n]).unwrap()), 0..8)
}

proptest! {
    #[test]
    fn put_is_idempotent(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());

        let first = store.put(&bytes).unwrap();
        let second = store.put(&bytes).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(store.get(first).unwrap(), bytes);
        prop_assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn same_change_on_both_sides_is_kept(a in maybe_blob(), s in maybe_blob()) {
        prop_assert_eq!(classify(a, a, s), MergeAction::Keep);
    }

    #[test]
    fn untouched_given_side_is_kept(a in maybe_blob(), s in maybe_blob()) {
        prop_assert_eq!(classify(a, s, s), MergeAction::Keep);
    }

    #[test]
    fn untouched_active_side_follows_given(g in maybe_blob(), s in maybe_blob()) {
        let expected = match g {
            _ if g == s => MergeAction::Keep,
            Some(id) => MergeAction::TakeGiven(id),
            None => MergeAction::Remove,
        };
        prop_assert_eq!(classify(s, g, s), expected);
    }

    #[test]
    fn conflict_puts_active_first(
        active in "[a-z\\n]{0,16}",
        given in "[a-z\\n]{0,16}",
    ) {
        let content = conflict_content(Some(active.as_bytes()), Some(given.as_bytes()));
        let text = String::from_utf8(content).unwrap();

        prop_assert!(text.starts_with("<<<<<<< HEAD\n"));
        prop_assert!(text.ends_with(">>>>>>>\n"));
        let body = &text["<<<<<<< HEAD\n".len()..];
        prop_assert!(body.starts_with(&active));
    }

    #[test]
    fn apply_to_folds_entries(
        parent in file_table(),
        staged in prop::collection::btree_map(file_name(), (8u8..12).prop_map(|n| BlobId::of(&[n]).unwrap()), 0..4),
        removed in prop::collection::btree_set(file_name(), 0..4),
    ) {
        let mut index = StagingArea::new();
        for (path, id) in &staged {
            index.put(path.clone(), IndexEntry::Staged(*id));
        }
        for path in &removed {
            index.put(path.clone(), IndexEntry::Removed);
        }

        let mut expected: BTreeMap<String, BlobId> = parent.clone();
        for path in &removed {
            expected.remove(path);
        }
        for (path, id) in &staged {
            if !removed.contains(path) {
                expected.insert(path.clone(), *id);
            }
        }

        prop_assert_eq!(index.apply_to(&parent), expected);
    }

    #[test]
    fn plain_branch_names_are_accepted(name in "[a-zA-Z0-9][a-zA-Z0-9._-]{0,30}") {
        let branch = BranchName::new(name.clone()).unwrap();
        prop_assert_eq!(branch.as_str(), name.as_str());
    }
}
