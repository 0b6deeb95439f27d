//! The [`RefStore`] trait defining the reference storage interface.

use arbor_types::ObjectId;

use crate::error::RefResult;
use crate::types::{Head, RefKind};

/// Storage backend for HEAD and named references.
///
/// The namespace mirrors git's layout:
///
/// - `HEAD` holds `refs/heads/<branch>` or a bare commit id
/// - `refs/heads/*` for branches
/// - `refs/tags/*` for tags
///
/// A ref with no value yet (a fresh repository's `master`) exists but
/// reads back as the empty string.
pub trait RefStore: Send + Sync {
    /// Raw HEAD contents, trimmed. `Ok(None)` if HEAD has never been written.
    fn read_head(&self) -> RefResult<Option<String>>;

    /// Replace HEAD.
    fn write_head(&self, head: &Head) -> RefResult<()>;

    /// Parsed HEAD. `Ok(None)` if it is missing or holds neither a branch
    /// nor a full commit id.
    fn head(&self) -> RefResult<Option<Head>> {
        Ok(self.read_head()?.as_deref().and_then(Head::parse))
    }

    /// Trimmed contents of a ref, `Ok(None)` if it does not exist.
    fn read_ref(&self, kind: RefKind, name: &str) -> RefResult<Option<String>>;

    fn has_ref(&self, kind: RefKind, name: &str) -> RefResult<bool> {
        Ok(self.read_ref(kind, name)?.is_some())
    }

    /// Create or move a ref. `None` creates it with no commit yet.
    fn write_ref(&self, kind: RefKind, name: &str, target: Option<&ObjectId>) -> RefResult<()>;

    /// Names of all refs of `kind`, sorted.
    fn list_refs(&self, kind: RefKind) -> RefResult<Vec<String>>;

    fn branches(&self) -> RefResult<Vec<String>> {
        self.list_refs(RefKind::Branch)
    }

    fn tags(&self) -> RefResult<Vec<String>> {
        self.list_refs(RefKind::Tag)
    }
}
