//! Deciding which working-tree paths a snapshot skips.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::{RepoError, RepoResult};

/// File at the repository root holding extra ignore patterns.
pub const IGNORE_FILE: &str = ".arborignore";

/// Path filter consulted by the snapshot walk.
pub trait IgnoreMatcher: Send + Sync {
    /// `true` if `path` (absolute, inside the repository) should be skipped.
    fn is_ignored(&self, path: &Path, is_dir: bool) -> bool;
}

/// Matches nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIgnore;

impl IgnoreMatcher for NoIgnore {
    fn is_ignored(&self, _path: &Path, _is_dir: bool) -> bool {
        false
    }
}

/// Gitignore-syntax patterns rooted at the repository root.
///
/// Patterns come from the configured list and from an `.arborignore` file
/// at the root, if one exists. Later patterns win, so `!keep.tmp` can
/// re-include a file an earlier `*.tmp` excluded.
#[derive(Debug)]
pub struct GitignoreMatcher {
    inner: Gitignore,
}

impl GitignoreMatcher {
    pub fn new(root: &Path, patterns: &[String]) -> RepoResult<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| RepoError::Ignore(e.to_string()))?;
        }
        let file = root.join(IGNORE_FILE);
        if file.is_file() {
            if let Some(e) = builder.add(&file) {
                return Err(RepoError::Ignore(e.to_string()));
            }
        }
        let inner = builder
            .build()
            .map_err(|e| RepoError::Ignore(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl IgnoreMatcher for GitignoreMatcher {
    fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched(path, is_dir).is_ignore()
    }
}
