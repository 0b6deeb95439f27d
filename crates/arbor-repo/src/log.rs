//! Walking history along parent links.

use arbor_store::{Commit, ObjectStore};
use arbor_types::ObjectId;

use crate::error::{RepoError, RepoResult};

/// Lazy iterator over a commit and its ancestors, newest first.
///
/// Yields an error and stops if a commit in the chain is missing. To walk
/// again, ask the repository for a new log.
pub struct CommitLog<'r> {
    objects: &'r dyn ObjectStore,
    next: Option<ObjectId>,
}

impl<'r> CommitLog<'r> {
    /// A log starting at `start`; `None` yields nothing.
    pub fn new(objects: &'r dyn ObjectStore, start: Option<ObjectId>) -> Self {
        Self {
            objects,
            next: start,
        }
    }
}

impl Iterator for CommitLog<'_> {
    type Item = RepoResult<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        match self.objects.read_commit(&id) {
            Ok(Some(commit)) => {
                self.next = commit.parent_id;
                Some(Ok(commit))
            }
            Ok(None) => Some(Err(RepoError::MissingObject { kind: "commit", id })),
            Err(e) => Some(Err(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::{Author, InMemoryObjectStore, Object, Tree};
    use chrono::{TimeZone, Utc};

    fn commit(store: &InMemoryObjectStore, parent: Option<ObjectId>, message: &str) -> ObjectId {
        let commit = Commit::new(
            parent,
            Author::new("Test", "test@example.com"),
            Utc.timestamp_opt(1_500_000_000, 0).unwrap(),
            Tree::empty().id(),
            message,
        );
        store.write(&Object::Commit(commit)).unwrap()
    }

    #[test]
    fn walks_parents_newest_first() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, None, "a");
        let b = commit(&store, Some(a), "b");
        let c = commit(&store, Some(b), "c");

        let messages: Vec<String> = CommitLog::new(&store, Some(c))
            .map(|r| r.unwrap().message)
            .collect();
        assert_eq!(messages, ["c", "b", "a"]);
    }

    #[test]
    fn empty_log() {
        let store = InMemoryObjectStore::new();
        assert_eq!(CommitLog::new(&store, None).count(), 0);
    }

    #[test]
    fn missing_parent_is_reported_once() {
        let store = InMemoryObjectStore::new();
        let ghost = ObjectId::from_hash([6; 20]);
        let child = commit(&store, Some(ghost), "orphan");

        let mut log = CommitLog::new(&store, Some(child));
        assert_eq!(log.next().unwrap().unwrap().message, "orphan");
        assert!(matches!(
            log.next(),
            Some(Err(RepoError::MissingObject { id, .. })) if id == ghost
        ));
        assert!(log.next().is_none());
    }
}
