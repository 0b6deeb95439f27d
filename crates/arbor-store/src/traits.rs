use arbor_types::ObjectId;
use tracing::debug;

use crate::error::StoreResult;
use crate::object::{Blob, Commit, Object, Tree};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same object always produces
///   the same id, so writing it again is a no-op.
/// - Nothing is ever rewritten or deleted.
/// - Missing objects are `Ok(None)`, not errors.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Write an object and return its id.
    fn write(&self, object: &Object) -> StoreResult<ObjectId>;

    /// Read an object by id.
    ///
    /// Returns `Ok(None)` if the object does not exist and `Err` on I/O
    /// failure or when the stored bytes are corrupt.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<Object>>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// All stored ids whose hex form starts with `prefix`, sorted.
    ///
    /// Prefixes shorter than two hex digits match nothing.
    fn ids_with_prefix(&self, prefix: &str) -> StoreResult<Vec<ObjectId>>;

    /// Read a blob. `Ok(None)` if missing or not a blob.
    fn read_blob(&self, id: &ObjectId) -> StoreResult<Option<Blob>> {
        Ok(match self.read(id)? {
            Some(Object::Blob(blob)) => Some(blob),
            other => unexpected(id, "blob", other),
        })
    }

    /// Read a tree. `Ok(None)` if missing or not a tree.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Option<Tree>> {
        Ok(match self.read(id)? {
            Some(Object::Tree(tree)) => Some(tree),
            other => unexpected(id, "tree", other),
        })
    }

    /// Read a commit. `Ok(None)` if missing or not a commit.
    fn read_commit(&self, id: &ObjectId) -> StoreResult<Option<Commit>> {
        Ok(match self.read(id)? {
            Some(Object::Commit(commit)) => Some(commit),
            other => unexpected(id, "commit", other),
        })
    }
}

fn unexpected<T>(id: &ObjectId, wanted: &str, found: Option<Object>) -> Option<T> {
    if let Some(object) = found {
        debug!(%id, wanted, found = %object.kind(), "object has a different type");
    }
    None
}
