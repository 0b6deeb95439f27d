use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use arbor_diff::{diff_commits, ChangeSet};
use arbor_refs::{
    validate_branch_name, validate_tag_name, FsRefStore, Head, RefKind, RefStore, Reference,
    Resolution, Resolver,
};
use arbor_store::{
    compressor_for_level, Blob, Commit, Entry, EntryKind, FsObjectStore, Object, ObjectStore, Tree,
};
use arbor_types::ObjectId;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::RepoConfig;
use crate::error::{RepoError, RepoResult};
use crate::log::CommitLog;
use crate::matcher::{GitignoreMatcher, IgnoreMatcher};

/// Name of the metadata directory at the repository root.
pub const STORE_DIR: &str = ".store";

/// Config file inside [`STORE_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Branch HEAD names in a new repository.
pub const DEFAULT_BRANCH: &str = "master";

/// What a snapshot produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotOutcome {
    pub commit_id: ObjectId,
    pub tree_id: ObjectId,
    pub parent_id: Option<ObjectId>,
}

/// A working tree plus its `.store` metadata directory.
///
/// ```text
/// <root>/.store/HEAD
/// <root>/.store/config.toml
/// <root>/.store/objects/<2 hex>/<38 hex>
/// <root>/.store/refs/heads/<branch>
/// <root>/.store/refs/tags/<tag>
/// ```
pub struct Repository {
    root: PathBuf,
    store_dir: PathBuf,
    objects: FsObjectStore,
    refs: FsRefStore,
    config: RepoConfig,
    ignore: Box<dyn IgnoreMatcher>,
}

impl Repository {
    // ---- Lifecycle ----

    /// Create a repository at `path`: HEAD names `master`, which exists with
    /// no commits, and the default config is written out.
    pub fn init(path: impl AsRef<Path>) -> RepoResult<Self> {
        let root = path.as_ref();
        let store_dir = root.join(STORE_DIR);
        if store_dir.exists() {
            return Err(RepoError::AlreadyInitialized(root.to_path_buf()));
        }

        fs::create_dir_all(root)?;
        fs::create_dir(&store_dir)?;
        fs::create_dir(store_dir.join("objects"))?;

        let refs = FsRefStore::create(&store_dir)?;
        refs.write_ref(RefKind::Branch, DEFAULT_BRANCH, None)?;
        refs.write_head(&Head::Symbolic(DEFAULT_BRANCH.into()))?;
        RepoConfig::default().save(&store_dir.join(CONFIG_FILE))?;

        info!(root = %root.display(), "initialized empty repository");
        Self::open(root)
    }

    /// Open the repository whose root is `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let root =
            fs::canonicalize(path).map_err(|_| RepoError::NotARepository(path.to_path_buf()))?;
        let store_dir = root.join(STORE_DIR);
        if !store_dir.is_dir() {
            return Err(RepoError::NotARepository(root));
        }
        let config = RepoConfig::load(&store_dir.join(CONFIG_FILE))?.with_env_overrides();
        Self::assemble(root, store_dir, config)
    }

    /// Open the repository containing `start`, searching upwards.
    pub fn discover(start: impl AsRef<Path>) -> RepoResult<Self> {
        let start = fs::canonicalize(start.as_ref())?;
        match start.ancestors().find(|dir| dir.join(STORE_DIR).is_dir()) {
            Some(root) => Self::open(root),
            None => Err(RepoError::NotARepository(start)),
        }
    }

    fn assemble(root: PathBuf, store_dir: PathBuf, config: RepoConfig) -> RepoResult<Self> {
        let mut objects = FsObjectStore::new(store_dir.join("objects"))
            .with_compressor(compressor_for_level(config.store.compression_level));
        if let Some(signing) = config.signing_context(&store_dir)? {
            objects = objects.with_signing(signing);
        }
        let refs = FsRefStore::new(&store_dir);
        let ignore = Box::new(GitignoreMatcher::new(&root, &config.ignore)?);

        debug!(root = %root.display(), "repository opened");
        Ok(Self {
            root,
            store_dir,
            objects,
            refs,
            config,
            ignore,
        })
    }

    /// Replace the ignore matcher built from the config.
    pub fn with_ignore(mut self, ignore: Box<dyn IgnoreMatcher>) -> Self {
        self.ignore = ignore;
        self
    }

    // ---- Accessors ----

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.store_dir.join(CONFIG_FILE)
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn objects(&self) -> &FsObjectStore {
        &self.objects
    }

    pub fn refs(&self) -> &FsRefStore {
        &self.refs
    }

    // ---- Resolution ----

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.refs, &self.objects)
    }

    /// Resolve a reference as far as it goes.
    pub fn resolve(&self, reference: Reference) -> RepoResult<Resolution> {
        Ok(self.resolver().resolve(reference)?)
    }

    /// Resolve a reference to a commit id, failing with
    /// [`RepoError::Unresolved`] if it names nothing.
    pub fn resolve_commit(&self, reference: &Reference) -> RepoResult<ObjectId> {
        self.resolve(reference.clone())?
            .commit_id()
            .ok_or_else(|| RepoError::Unresolved(reference.to_string()))
    }

    /// The commit HEAD resolves to, `None` before the first snapshot.
    pub fn head_commit(&self) -> RepoResult<Option<ObjectId>> {
        Ok(self.resolve(Reference::Head)?.commit_id())
    }

    pub fn head(&self) -> RepoResult<Option<Head>> {
        Ok(self.refs.head()?)
    }

    /// The checked-out branch, `None` when HEAD is detached.
    ///
    /// Besides `refs/heads/<name>`, HEAD may hold any text that classifies
    /// as an existing branch (`master`, `heads/master`).
    pub fn current_branch(&self) -> RepoResult<Option<String>> {
        let Some(contents) = self.refs.read_head()? else {
            return Ok(None);
        };
        if let Some(Head::Symbolic(name)) = Head::parse(&contents) {
            return Ok(Some(name));
        }
        match self.resolver().classify(&contents)? {
            Some(Reference::Branch(name)) => Ok(Some(name)),
            _ => Ok(None),
        }
    }

    // ---- Objects ----

    pub fn read_object(&self, id: &ObjectId) -> RepoResult<Option<Object>> {
        Ok(self.objects.read(id)?)
    }

    /// Look up any object by reference or (partial) id.
    pub fn find_object(&self, text: &str) -> RepoResult<(Object, Resolution)> {
        let resolution = self.resolve(Reference::unknown(text))?;
        let id = resolution
            .commit_id()
            .ok_or_else(|| RepoError::Unresolved(text.to_string()))?;
        let object = self
            .read_object(&id)?
            .ok_or_else(|| RepoError::Unresolved(text.to_string()))?;
        Ok((object, resolution))
    }

    fn load_commit(&self, id: &ObjectId) -> RepoResult<Commit> {
        self.objects
            .read_commit(id)?
            .ok_or(RepoError::MissingObject { kind: "commit", id: *id })
    }

    fn load_tree(&self, id: &ObjectId) -> RepoResult<Tree> {
        self.objects
            .read_tree(id)?
            .ok_or(RepoError::MissingObject { kind: "tree", id: *id })
    }

    /// Store a file as a blob, or a directory as a tree.
    pub fn hash_file(&self, path: impl AsRef<Path>) -> RepoResult<Object> {
        let path = fs::canonicalize(path.as_ref())?;
        if path.is_dir() {
            let tree = write_tree(&self.objects, &self.root, &path, self.ignore.as_ref())?;
            return Ok(Object::Tree(tree));
        }
        let object = Object::Blob(Blob::new(fs::read(&path)?));
        self.objects.write(&object)?;
        Ok(object)
    }

    // ---- Snapshot / checkout ----

    /// Record the working tree as a new commit on top of HEAD.
    ///
    /// If HEAD names a branch the branch advances; otherwise HEAD itself is
    /// pointed at the new commit.
    pub fn snapshot(&self, message: &str) -> RepoResult<SnapshotOutcome> {
        let tree = write_tree(&self.objects, &self.root, &self.root, self.ignore.as_ref())?;
        let tree_id = tree.id();
        let parent_id = self.head_commit()?;

        let commit = Commit::new(parent_id, self.config.author(), Utc::now(), tree_id, message);
        let commit_id = self.objects.write(&Object::Commit(commit))?;

        match self.current_branch()? {
            Some(branch) => {
                self.refs.write_ref(RefKind::Branch, &branch, Some(&commit_id))?;
            }
            None => self.refs.write_head(&Head::Detached(commit_id))?,
        }

        info!(commit = %commit_id, tree = %tree_id, "snapshot recorded");
        Ok(SnapshotOutcome {
            commit_id,
            tree_id,
            parent_id,
        })
    }

    /// Replace the working tree with the tree of the commit `reference`
    /// resolves to, then move HEAD.
    ///
    /// When the two trees differ, every file of the current tree is removed
    /// and every file of the target tree written, with permissions restored.
    /// Files the current tree does not know about are left alone. HEAD
    /// becomes symbolic for a branch, detached for a tag or commit id, and
    /// stays put for `HEAD`.
    pub fn checkout(&self, reference: &Reference) -> RepoResult<ObjectId> {
        let target = self.resolve_commit(reference)?;
        let commit = self.load_commit(&target)?;
        let new_tree = self.load_tree(&commit.tree_id)?;

        let current_tree = match self.head_commit()? {
            Some(id) => Some(self.load_tree(&self.load_commit(&id)?.tree_id)?),
            None => None,
        };

        match &current_tree {
            Some(old) if old.id() == new_tree.id() => {
                debug!(tree = %new_tree.id(), "working tree already matches");
            }
            _ => {
                if let Some(old) = &current_tree {
                    remove_tree(&self.objects, old, &self.root)?;
                }
                restore_tree(&self.objects, &new_tree, &self.root)?;
            }
        }

        let classified = match reference {
            Reference::Unknown(text) => self.resolver().classify(text)?,
            other => Some(other.clone()),
        };
        match classified {
            Some(Reference::Branch(name)) => self.refs.write_head(&Head::Symbolic(name))?,
            Some(Reference::Tag(_)) | Some(Reference::Commit(_)) => {
                self.refs.write_head(&Head::Detached(target))?
            }
            _ => {}
        }

        info!(%reference, commit = %target, "checked out");
        Ok(target)
    }

    // ---- Branches and tags ----

    /// Create a branch at `from` (HEAD by default).
    ///
    /// Branching before the first snapshot creates a branch with no
    /// commits. An explicit `from` must resolve.
    pub fn create_branch(&self, name: &str, from: Option<&Reference>) -> RepoResult<Option<ObjectId>> {
        validate_branch_name(name)?;
        if self.refs.has_ref(RefKind::Branch, name)? {
            return Err(RepoError::AlreadyExists {
                kind: "branch",
                name: name.to_string(),
            });
        }
        let target = match from {
            Some(reference) => Some(self.resolve_commit(reference)?),
            None => self.head_commit()?,
        };
        self.refs.write_ref(RefKind::Branch, name, target.as_ref())?;
        Ok(target)
    }

    /// Create a tag at `from` (HEAD by default), which must resolve.
    pub fn create_tag(&self, name: &str, from: Option<&Reference>) -> RepoResult<ObjectId> {
        validate_tag_name(name)?;
        if self.refs.has_ref(RefKind::Tag, name)? {
            return Err(RepoError::AlreadyExists {
                kind: "tag",
                name: name.to_string(),
            });
        }
        let reference = from.cloned().unwrap_or(Reference::Head);
        let target = self.resolve_commit(&reference)?;
        self.refs.write_ref(RefKind::Tag, name, Some(&target))?;
        Ok(target)
    }

    pub fn branches(&self) -> RepoResult<Vec<String>> {
        Ok(self.refs.branches()?)
    }

    pub fn tags(&self) -> RepoResult<Vec<String>> {
        Ok(self.refs.tags()?)
    }

    // ---- History ----

    /// Commits reachable from HEAD, newest first.
    pub fn commits(&self) -> RepoResult<CommitLog<'_>> {
        Ok(CommitLog::new(&self.objects, self.head_commit()?))
    }

    /// Compare the trees of two commits; `new` defaults to HEAD.
    pub fn diff(&self, old: &Reference, new: Option<&Reference>) -> RepoResult<ChangeSet> {
        let old_id = self.resolve_commit(old)?;
        let new_id = self.resolve_commit(new.unwrap_or(&Reference::Head))?;
        Ok(diff_commits(&self.objects, Some(&old_id), &new_id)?)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---- Working tree walks ----

/// Store every file under `dir` and return the tree describing it.
fn write_tree(
    objects: &dyn ObjectStore,
    root: &Path,
    dir: &Path,
    ignore: &dyn IgnoreMatcher,
) -> RepoResult<Tree> {
    let store_dir = root.join(STORE_DIR);
    let mut listing = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    listing.sort_by_key(|item| item.file_name());

    let mut entries = Vec::with_capacity(listing.len());
    for item in listing {
        let path = item.path();
        if path == store_dir {
            continue;
        }
        let Ok(name) = item.file_name().into_string() else {
            warn!(path = %path.display(), "skipping non-UTF-8 file name");
            continue;
        };

        let meta = fs::symlink_metadata(&path)?;
        let file_type = meta.file_type();
        if !file_type.is_file() && !file_type.is_dir() {
            debug!(path = %path.display(), "skipping special file");
            continue;
        }
        if ignore.is_ignored(&path, file_type.is_dir()) {
            debug!(path = %path.display(), "ignored");
            continue;
        }

        let permissions = permissions_of(&meta);
        if file_type.is_dir() {
            let subtree = write_tree(objects, root, &path, ignore)?;
            entries.push(Entry::new(permissions, subtree.id(), EntryKind::Tree, name));
        } else {
            let id = objects.write(&Object::Blob(Blob::new(fs::read(&path)?)))?;
            entries.push(Entry::new(permissions, id, EntryKind::Blob, name));
        }
    }

    let tree = Tree::new(entries)?;
    objects.write(&Object::Tree(tree.clone()))?;
    Ok(tree)
}

/// Delete every file and directory `tree` describes under `dir`.
fn remove_tree(objects: &dyn ObjectStore, tree: &Tree, dir: &Path) -> RepoResult<()> {
    for entry in tree.entries() {
        let path = dir.join(&entry.name);
        match entry.object_type {
            EntryKind::Blob => match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
            EntryKind::Tree => {
                let subtree = objects.read_tree(&entry.object_id)?.ok_or(
                    RepoError::MissingObject {
                        kind: "tree",
                        id: entry.object_id,
                    },
                )?;
                remove_tree(objects, &subtree, &path)?;
                // Untracked files keep the directory alive.
                if let Err(e) = fs::remove_dir(&path) {
                    debug!(path = %path.display(), error = %e, "directory kept");
                }
            }
        }
    }
    Ok(())
}

/// Write every file and directory `tree` describes under `dir`.
fn restore_tree(objects: &dyn ObjectStore, tree: &Tree, dir: &Path) -> RepoResult<()> {
    for entry in tree.entries() {
        let path = dir.join(&entry.name);
        match entry.object_type {
            EntryKind::Blob => {
                let blob = objects.read_blob(&entry.object_id)?.ok_or(
                    RepoError::MissingObject {
                        kind: "blob",
                        id: entry.object_id,
                    },
                )?;
                fs::write(&path, &blob.content)?;
                set_permissions(&path, entry.permissions)?;
            }
            EntryKind::Tree => {
                let subtree = objects.read_tree(&entry.object_id)?.ok_or(
                    RepoError::MissingObject {
                        kind: "tree",
                        id: entry.object_id,
                    },
                )?;
                fs::create_dir_all(&path)?;
                restore_tree(objects, &subtree, &path)?;
                set_permissions(&path, entry.permissions)?;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn permissions_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permissions_of(meta: &fs::Metadata) -> u32 {
    if meta.is_dir() {
        0o755
    } else if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::NoIgnore;
    use arbor_crypto::ContentHasher;
    use tempfile::TempDir;

    fn repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    // ---- Lifecycle ----

    #[test]
    fn init_creates_layout() {
        let (dir, repo) = repo();
        let store = dir.path().join(STORE_DIR);
        assert_eq!(fs::read_to_string(store.join("HEAD")).unwrap(), "refs/heads/master");
        assert_eq!(fs::read_to_string(store.join("refs/heads/master")).unwrap(), "");
        assert!(store.join("refs/tags").is_dir());
        assert!(store.join("objects").is_dir());
        assert!(store.join(CONFIG_FILE).is_file());

        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("master"));
        assert_eq!(repo.head_commit().unwrap(), None);
        assert_eq!(repo.branches().unwrap(), vec!["master"]);
        assert_eq!(repo.commits().unwrap().count(), 0);
    }

    #[test]
    fn init_twice_fails() {
        let (dir, _repo) = repo();
        assert!(matches!(
            Repository::init(dir.path()).unwrap_err(),
            RepoError::AlreadyInitialized(_)
        ));
    }

    #[test]
    fn open_requires_store_dir() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Repository::open(dir.path()).unwrap_err(),
            RepoError::NotARepository(_)
        ));
    }

    #[test]
    fn discover_walks_up() {
        let (dir, repo) = repo();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let found = Repository::discover(&nested).unwrap();
        assert_eq!(found.root(), repo.root());
    }

    // ---- Objects ----

    #[test]
    fn hash_file_stores_blob() {
        let (dir, repo) = repo();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hi").unwrap();

        let object = repo.hash_file(&file).unwrap();
        assert_eq!(object.id(), ContentHasher::BLOB.hash(b"hi"));
        assert!(repo.objects().exists(&object.id()).unwrap());
    }

    #[test]
    fn hash_directory_stores_tree() {
        let (dir, repo) = repo();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("x"), "x").unwrap();

        let object = repo.hash_file(&sub).unwrap();
        let Object::Tree(tree) = &object else {
            panic!("expected a tree, got {object:?}");
        };
        assert_eq!(tree.len(), 1);
        assert!(repo.read_object(&tree.id()).unwrap().is_some());
    }

    #[test]
    fn find_object_by_prefix_and_ref() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("f"), "content").unwrap();
        let outcome = repo.snapshot("one").unwrap();

        let (object, _) = repo.find_object(&outcome.tree_id.to_hex()[..8]).unwrap();
        assert_eq!(object.id(), outcome.tree_id);
        let (object, _) = repo.find_object("master").unwrap();
        assert_eq!(object.id(), outcome.commit_id);
        assert!(matches!(
            repo.find_object("nope").unwrap_err(),
            RepoError::Unresolved(_)
        ));
    }

    // ---- Snapshot ----

    #[test]
    fn snapshot_skips_store_and_ignored_paths() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("keep.txt"), "keep").unwrap();
        fs::write(dir.path().join("drop.tmp"), "drop").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/out"), "bin").unwrap();

        let patterns = vec!["*.tmp".to_string(), "target/".to_string()];
        let repo = repo.with_ignore(Box::new(GitignoreMatcher::new(dir.path(), &patterns).unwrap()));
        let outcome = repo.snapshot("ignore").unwrap();

        let tree = repo.load_tree(&outcome.tree_id).unwrap();
        let names: Vec<&str> = tree.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["keep.txt"]);
    }

    #[test]
    fn snapshot_advances_branch_and_links_parent() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("f"), "1").unwrap();
        let first = repo.snapshot("first").unwrap();
        assert_eq!(first.parent_id, None);

        fs::write(dir.path().join("f"), "2").unwrap();
        let second = repo.snapshot("second").unwrap();
        assert_eq!(second.parent_id, Some(first.commit_id));

        assert_eq!(repo.head_commit().unwrap(), Some(second.commit_id));
        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("master"));
        let commit = repo.load_commit(&second.commit_id).unwrap();
        assert_eq!(commit.author, repo.config().author());
    }

    #[test]
    fn snapshot_advances_branch_named_by_bare_head() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("a.txt"), "1").unwrap();
        let first = repo.snapshot("one").unwrap();

        fs::write(dir.path().join(STORE_DIR).join("HEAD"), "master").unwrap();
        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("master"));

        fs::write(dir.path().join("a.txt"), "2").unwrap();
        let second = repo.snapshot("two").unwrap();
        assert_eq!(second.parent_id, Some(first.commit_id));

        let master = repo.refs().read_ref(RefKind::Branch, "master").unwrap();
        assert_eq!(master, Some(second.commit_id.to_hex()));
        assert_eq!(
            fs::read_to_string(dir.path().join(STORE_DIR).join("HEAD")).unwrap(),
            "master"
        );
    }

    #[test]
    fn qualified_head_text_names_current_branch() {
        let (dir, repo) = repo();
        fs::write(dir.path().join(STORE_DIR).join("HEAD"), "heads/master\n").unwrap();
        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("master"));

        fs::write(dir.path().join(STORE_DIR).join("HEAD"), "nosuchbranch").unwrap();
        assert_eq!(repo.current_branch().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn snapshot_records_and_checkout_restores_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, repo) = repo();
        let script = dir.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let first = repo.snapshot("exec").unwrap();

        let tree = repo.load_tree(&first.tree_id).unwrap();
        assert_eq!(tree.get("run.sh").unwrap().permissions, 0o755);

        fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();
        repo.snapshot("plain").unwrap();
        repo.checkout(&Reference::from(first.commit_id)).unwrap();

        let mode = fs::metadata(&script).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o755);
    }

    // ---- Checkout ----

    #[test]
    fn checkout_commit_detaches_head() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("f"), "1").unwrap();
        let first = repo.snapshot("first").unwrap();
        fs::write(dir.path().join("f"), "2").unwrap();
        repo.snapshot("second").unwrap();

        let short = first.commit_id.to_hex()[..7].to_string();
        repo.checkout(&Reference::unknown(short)).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("f")).unwrap(), "1");
        assert_eq!(repo.head().unwrap(), Some(Head::Detached(first.commit_id)));
        assert_eq!(repo.current_branch().unwrap(), None);

        // Snapshots on a detached HEAD move HEAD itself.
        fs::write(dir.path().join("f"), "3").unwrap();
        let third = repo.snapshot("third").unwrap();
        assert_eq!(third.parent_id, Some(first.commit_id));
        assert_eq!(repo.head().unwrap(), Some(Head::Detached(third.commit_id)));
    }

    #[test]
    fn checkout_removes_files_of_old_tree_only() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("a"), "a").unwrap();
        let first = repo.snapshot("a only").unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        fs::write(dir.path().join("d/b"), "b").unwrap();
        repo.snapshot("a and d/b").unwrap();
        fs::write(dir.path().join("d/untracked"), "u").unwrap();

        repo.checkout(&Reference::from(first.commit_id)).unwrap();

        assert!(dir.path().join("a").is_file());
        assert!(!dir.path().join("d/b").exists());
        assert!(dir.path().join("d/untracked").is_file());
    }

    #[test]
    fn checkout_tag_detaches_and_head_is_noop() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("f"), "1").unwrap();
        let first = repo.snapshot("first").unwrap();
        repo.create_tag("v1", None).unwrap();

        repo.checkout(&Reference::Head).unwrap();
        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("master"));

        repo.checkout(&Reference::unknown("v1")).unwrap();
        assert_eq!(repo.head().unwrap(), Some(Head::Detached(first.commit_id)));
    }

    #[test]
    fn checkout_unresolvable_fails() {
        let (_dir, repo) = repo();
        assert!(matches!(
            repo.checkout(&Reference::unknown("master")).unwrap_err(),
            RepoError::Unresolved(_)
        ));
    }

    // ---- Branches and tags ----

    #[test]
    fn branch_before_first_snapshot_has_no_commit() {
        let (_dir, repo) = repo();
        assert_eq!(repo.create_branch("early", None).unwrap(), None);
        assert_eq!(repo.branches().unwrap(), vec!["early", "master"]);
    }

    #[test]
    fn duplicate_branch_and_tag_are_rejected() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("f"), "1").unwrap();
        repo.snapshot("first").unwrap();

        assert!(matches!(
            repo.create_branch("master", None).unwrap_err(),
            RepoError::AlreadyExists { kind: "branch", .. }
        ));
        repo.create_tag("v1", None).unwrap();
        assert!(matches!(
            repo.create_tag("v1", None).unwrap_err(),
            RepoError::AlreadyExists { kind: "tag", .. }
        ));
        assert_eq!(repo.tags().unwrap(), vec!["v1"]);
    }

    #[test]
    fn tag_requires_a_commit() {
        let (_dir, repo) = repo();
        assert!(matches!(
            repo.create_tag("v0", None).unwrap_err(),
            RepoError::Unresolved(_)
        ));
        assert!(matches!(
            repo.create_branch("bad name", None).unwrap_err(),
            RepoError::Ref(_)
        ));
    }

    #[test]
    fn branch_from_explicit_reference() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("f"), "1").unwrap();
        let first = repo.snapshot("first").unwrap();
        fs::write(dir.path().join("f"), "2").unwrap();
        repo.snapshot("second").unwrap();

        let target = repo
            .create_branch("old", Some(&Reference::from(first.commit_id)))
            .unwrap();
        assert_eq!(target, Some(first.commit_id));
        assert_eq!(
            repo.resolve_commit(&Reference::unknown("old")).unwrap(),
            first.commit_id
        );
    }

    // ---- Diff ----

    #[test]
    fn diff_against_head() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("a"), "a").unwrap();
        let first = repo.snapshot("first").unwrap();
        fs::write(dir.path().join("b"), "b").unwrap();
        repo.snapshot("second").unwrap();

        let changes = repo
            .diff(&Reference::from(first.commit_id), None)
            .unwrap()
            .changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), "b");
        assert_eq!(changes[0].status(), 'A');
    }

    #[test]
    fn custom_ignore_matcher_is_used() {
        let (dir, repo) = repo();
        fs::write(dir.path().join("x.tmp"), "x").unwrap();
        let repo = repo.with_ignore(Box::new(NoIgnore));
        let outcome = repo.snapshot("all").unwrap();
        assert_eq!(repo.load_tree(&outcome.tree_id).unwrap().len(), 1);
    }
}
