//! Flattening trees into path sets and comparing trees and commits.

use std::collections::HashSet;

use arbor_store::{EntryKind, ObjectStore};
use arbor_types::ObjectId;
use tracing::debug;

use crate::change_set::{ChangeSet, PathEntry};
use crate::error::{DiffError, DiffResult};

/// Every blob reachable from `tree_id`, keyed by its `/`-joined path.
pub fn flatten_tree(store: &dyn ObjectStore, tree_id: &ObjectId) -> DiffResult<HashSet<PathEntry>> {
    let mut out = HashSet::new();
    flatten_into(store, tree_id, "", &mut out)?;
    Ok(out)
}

fn flatten_into(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
    prefix: &str,
    out: &mut HashSet<PathEntry>,
) -> DiffResult<()> {
    let tree = store
        .read_tree(tree_id)?
        .ok_or(DiffError::ObjectNotFound(*tree_id))?;

    for entry in tree.entries() {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        match entry.object_type {
            EntryKind::Blob => {
                out.insert(PathEntry::new(path, entry.object_id));
            }
            EntryKind::Tree => flatten_into(store, &entry.object_id, &path, out)?,
        }
    }
    Ok(())
}

/// Compare two trees. `None` for `old` compares against an empty tree.
pub fn diff_trees(
    store: &dyn ObjectStore,
    old: Option<&ObjectId>,
    new: &ObjectId,
) -> DiffResult<ChangeSet> {
    let old_paths = match old {
        Some(id) => flatten_tree(store, id)?,
        None => HashSet::new(),
    };
    let new_paths = flatten_tree(store, new)?;
    Ok(ChangeSet::between(&old_paths, &new_paths))
}

/// Compare the trees of two commits. `None` for `old` treats every file in
/// `new` as added.
pub fn diff_commits(
    store: &dyn ObjectStore,
    old: Option<&ObjectId>,
    new: &ObjectId,
) -> DiffResult<ChangeSet> {
    let tree_of = |id: &ObjectId| -> DiffResult<ObjectId> {
        let commit = store
            .read_commit(id)?
            .ok_or(DiffError::ObjectNotFound(*id))?;
        Ok(commit.tree_id)
    };

    let old_tree = old.map(tree_of).transpose()?;
    let new_tree = tree_of(new)?;
    debug!(?old_tree, %new_tree, "diffing commits");
    diff_trees(store, old_tree.as_ref(), &new_tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::{Author, Blob, Commit, Entry, InMemoryObjectStore, Object, Tree};
    use chrono::{TimeZone, Utc};

    use crate::change_set::Change;

    fn blob(store: &InMemoryObjectStore, content: &str) -> ObjectId {
        store
            .write(&Object::Blob(Blob::new(content.as_bytes().to_vec())))
            .unwrap()
    }

    fn tree(store: &InMemoryObjectStore, entries: Vec<Entry>) -> ObjectId {
        store
            .write(&Object::Tree(Tree::new(entries).unwrap()))
            .unwrap()
    }

    fn file(name: &str, id: ObjectId) -> Entry {
        Entry::new(0o644, id, EntryKind::Blob, name)
    }

    fn dir(name: &str, id: ObjectId) -> Entry {
        Entry::new(0o755, id, EntryKind::Tree, name)
    }

    fn commit(store: &InMemoryObjectStore, parent: Option<ObjectId>, tree_id: ObjectId) -> ObjectId {
        let commit = Commit::new(
            parent,
            Author::new("Test", "test@example.com"),
            Utc.timestamp_opt(1_500_000_000, 0).unwrap(),
            tree_id,
            "msg",
        );
        store.write(&Object::Commit(commit)).unwrap()
    }

    #[test]
    fn flatten_joins_nested_paths() {
        let store = InMemoryObjectStore::new();
        let a = blob(&store, "a");
        let b = blob(&store, "b");
        let inner = tree(&store, vec![file("b.txt", b)]);
        let root = tree(&store, vec![file("a.txt", a), dir("src", inner)]);

        let paths = flatten_tree(&store, &root).unwrap();
        let expected: HashSet<PathEntry> =
            [PathEntry::new("a.txt", a), PathEntry::new("src/b.txt", b)].into();
        assert_eq!(paths, expected);
    }

    #[test]
    fn flatten_missing_tree_is_an_error() {
        let store = InMemoryObjectStore::new();
        let missing = ObjectId::from_hash([4; 20]);
        let err = flatten_tree(&store, &missing).unwrap_err();
        assert!(matches!(err, DiffError::ObjectNotFound(id) if id == missing));
    }

    #[test]
    fn diff_trees_from_none_is_all_added() {
        let store = InMemoryObjectStore::new();
        let a = blob(&store, "a");
        let root = tree(&store, vec![file("a.txt", a)]);

        let cs = diff_trees(&store, None, &root).unwrap();
        assert_eq!(
            cs.changes(),
            vec![Change::Added {
                path: "a.txt".into(),
                id: a
            }]
        );
    }

    #[test]
    fn diff_commits_sees_nested_move() {
        let store = InMemoryObjectStore::new();
        let a = blob(&store, "same content");
        let first_tree = tree(&store, vec![file("a.txt", a)]);
        let sub = tree(&store, vec![file("a.txt", a)]);
        let second_tree = tree(&store, vec![dir("docs", sub)]);

        let first = commit(&store, None, first_tree);
        let second = commit(&store, Some(first), second_tree);

        let cs = diff_commits(&store, Some(&first), &second).unwrap();
        assert_eq!(
            cs.changes(),
            vec![Change::Renamed {
                from: "a.txt".into(),
                to: "docs/a.txt".into(),
                id: a,
            }]
        );
    }

    #[test]
    fn diff_commits_requires_commits() {
        let store = InMemoryObjectStore::new();
        let a = blob(&store, "not a commit");
        let root = tree(&store, vec![file("a.txt", a)]);
        let c = commit(&store, None, root);

        let err = diff_commits(&store, Some(&a), &c).unwrap_err();
        assert!(matches!(err, DiffError::ObjectNotFound(id) if id == a));
    }
}
