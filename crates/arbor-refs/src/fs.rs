//! File-backed reference store.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use arbor_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::RefResult;
use crate::names::{validate_branch_name, validate_tag_name};
use crate::traits::RefStore;
use crate::types::{Head, RefKind};

/// References stored as small text files under a metadata directory:
///
/// ```text
/// <root>/HEAD
/// <root>/refs/heads/<branch>
/// <root>/refs/tags/<tag>
/// ```
///
/// Every write goes to a temporary file next to its target and is renamed
/// into place. Concurrent writers are not coordinated; the last rename wins.
#[derive(Debug, Clone)]
pub struct FsRefStore {
    root: PathBuf,
}

impl FsRefStore {
    /// A store over an existing metadata directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the `refs/heads` and `refs/tags` directories and return the
    /// store.
    pub fn create(root: impl Into<PathBuf>) -> RefResult<Self> {
        let store = Self::new(root);
        for kind in [RefKind::Branch, RefKind::Tag] {
            fs::create_dir_all(store.kind_dir(kind))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    pub fn ref_path(&self, kind: RefKind, name: &str) -> PathBuf {
        self.kind_dir(kind).join(name)
    }

    fn kind_dir(&self, kind: RefKind) -> PathBuf {
        self.root.join("refs").join(kind.dir())
    }

    fn read_trimmed(path: &Path) -> RefResult<Option<String>> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace `path` with `contents` via a sibling temp file.
    fn replace(path: &Path, contents: &str) -> RefResult<()> {
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "ref path has no parent"))?;
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl RefStore for FsRefStore {
    fn read_head(&self) -> RefResult<Option<String>> {
        Self::read_trimmed(&self.head_path())
    }

    fn write_head(&self, head: &Head) -> RefResult<()> {
        if let Head::Symbolic(branch) = head {
            validate_branch_name(branch)?;
        }
        let contents = head.contents();
        Self::replace(&self.head_path(), &contents)?;
        info!(head = %contents, "HEAD updated");
        Ok(())
    }

    fn read_ref(&self, kind: RefKind, name: &str) -> RefResult<Option<String>> {
        // Names that could escape the refs directory never exist.
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return Ok(None);
        }
        Self::read_trimmed(&self.ref_path(kind, name))
    }

    fn write_ref(&self, kind: RefKind, name: &str, target: Option<&ObjectId>) -> RefResult<()> {
        match kind {
            RefKind::Branch => validate_branch_name(name)?,
            RefKind::Tag => validate_tag_name(name)?,
        }
        let contents = target.map(ObjectId::to_hex).unwrap_or_default();
        Self::replace(&self.ref_path(kind, name), &contents)?;
        info!(%kind, name, target = %contents, "ref updated");
        Ok(())
    }

    fn list_refs(&self, kind: RefKind) -> RefResult<Vec<String>> {
        let dir = self.kind_dir(kind);
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in listing {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                // Hidden names include in-flight temp files.
                Ok(name) if !name.starts_with('.') => names.push(name),
                Ok(_) => {}
                Err(raw) => debug!(?raw, %kind, "skipping non-UTF-8 ref name"),
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_hash([byte; 20])
    }

    fn store() -> (TempDir, FsRefStore) {
        let dir = TempDir::new().unwrap();
        let store = FsRefStore::create(dir.path().join(".store")).unwrap();
        (dir, store)
    }

    #[test]
    fn create_makes_ref_dirs() {
        let (_dir, store) = store();
        assert!(store.root().join("refs/heads").is_dir());
        assert!(store.root().join("refs/tags").is_dir());
        assert!(store.branches().unwrap().is_empty());
    }

    #[test]
    fn head_round_trip_on_disk() {
        let (_dir, store) = store();
        assert_eq!(store.read_head().unwrap(), None);

        store.write_head(&Head::Symbolic("master".into())).unwrap();
        assert_eq!(
            fs::read_to_string(store.head_path()).unwrap(),
            "refs/heads/master"
        );
        assert_eq!(store.head().unwrap(), Some(Head::Symbolic("master".into())));

        store.write_head(&Head::Detached(id(4))).unwrap();
        assert_eq!(store.head().unwrap(), Some(Head::Detached(id(4))));
    }

    #[test]
    fn head_contents_are_trimmed() {
        let (_dir, store) = store();
        fs::write(store.head_path(), "refs/heads/master\n").unwrap();
        assert_eq!(store.read_head().unwrap().as_deref(), Some("refs/heads/master"));
    }

    #[test]
    fn write_and_read_refs() {
        let (_dir, store) = store();
        store.write_ref(RefKind::Branch, "master", None).unwrap();
        assert_eq!(
            store.read_ref(RefKind::Branch, "master").unwrap(),
            Some(String::new())
        );

        store.write_ref(RefKind::Branch, "master", Some(&id(1))).unwrap();
        store.write_ref(RefKind::Tag, "v1", Some(&id(2))).unwrap();
        assert_eq!(
            fs::read_to_string(store.ref_path(RefKind::Branch, "master")).unwrap(),
            id(1).to_hex()
        );
        assert_eq!(
            store.read_ref(RefKind::Tag, "v1").unwrap(),
            Some(id(2).to_hex())
        );
        assert_eq!(store.read_ref(RefKind::Tag, "master").unwrap(), None);
    }

    #[test]
    fn list_skips_hidden_and_directories() {
        let (_dir, store) = store();
        store.write_ref(RefKind::Branch, "b", Some(&id(1))).unwrap();
        store.write_ref(RefKind::Branch, "a", Some(&id(1))).unwrap();
        fs::write(store.root().join("refs/heads/.tmpXYZ"), "").unwrap();
        fs::create_dir(store.root().join("refs/heads/nested")).unwrap();

        assert_eq!(store.branches().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn list_without_refs_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FsRefStore::new(dir.path());
        assert!(store.tags().unwrap().is_empty());
    }

    #[test]
    fn path_like_names_never_resolve() {
        let (_dir, store) = store();
        fs::write(store.root().join("refs/secret"), id(1).to_hex()).unwrap();
        assert_eq!(store.read_ref(RefKind::Branch, "../secret").unwrap(), None);
        assert!(store
            .write_ref(RefKind::Branch, "../secret", Some(&id(2)))
            .is_err());
    }
}
