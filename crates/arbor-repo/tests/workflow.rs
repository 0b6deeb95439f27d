//! End-to-end scenarios against a repository on disk.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use arbor_crypto::{ContentHasher, SigningKey};
use arbor_repo::{
    EntryKind, Object, ObjectId, RepoConfig, RepoError, Reference, Repository, ResolveWarning,
    SigningConfig, CONFIG_FILE, IGNORE_FILE,
};
use arbor_store::{Blob, ObjectStore, StoreError};
use arbor_types::MIN_PREFIX_LEN;
use tempfile::TempDir;

fn init() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    (dir, repo)
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

// ---- Snapshots ----

#[test]
fn first_snapshot_records_single_blob() {
    let (dir, repo) = init();
    write(dir.path(), "a.txt", "hi");
    let outcome = repo.snapshot("first").unwrap();

    let log: Vec<_> = repo.commits().unwrap().map(Result::unwrap).collect();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].message, "first");
    assert_eq!(log[0].parent_id, None);
    assert_eq!(log[0].id(), outcome.commit_id);

    let Some(Object::Tree(tree)) = repo.read_object(&log[0].tree_id).unwrap() else {
        panic!("commit tree missing");
    };
    assert_eq!(tree.len(), 1);
    let entry = tree.get("a.txt").unwrap();
    assert_eq!(entry.object_type, EntryKind::Blob);
    assert_eq!(
        entry.object_id.to_hex(),
        "0661f10e3d4f1b872d39c2fa68e35619b1d49792"
    );
}

#[test]
fn unchanged_snapshots_share_tree_but_not_commit() {
    let (dir, repo) = init();
    write(dir.path(), "a.txt", "same");
    let first = repo.snapshot("one").unwrap();
    let second = repo.snapshot("two").unwrap();

    assert_ne!(first.commit_id, second.commit_id);
    assert_eq!(first.tree_id, second.tree_id);
    assert_eq!(second.parent_id, Some(first.commit_id));
    assert_eq!(repo.commits().unwrap().count(), 2);
}

#[test]
fn empty_working_tree_snapshots_empty_tree() {
    let (_dir, repo) = init();
    let outcome = repo.snapshot("nothing").unwrap();
    let Some(Object::Tree(tree)) = repo.read_object(&outcome.tree_id).unwrap() else {
        panic!("tree missing");
    };
    assert!(tree.is_empty());
}

// ---- Branching and checkout ----

#[test]
fn checkout_master_restores_state_before_feature_work() {
    let (dir, repo) = init();
    write(dir.path(), "README", "v1");
    write(dir.path(), "src/lib.rs", "fn a() {}");
    let base = repo.snapshot("base").unwrap();

    repo.create_branch("feature", None).unwrap();
    repo.checkout(&Reference::unknown("feature")).unwrap();
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("feature"));

    write(dir.path(), "README", "v2");
    write(dir.path(), "src/new.rs", "fn b() {}");
    let feature = repo.snapshot("feature work").unwrap();
    assert_eq!(feature.parent_id, Some(base.commit_id));

    repo.checkout(&Reference::unknown("master")).unwrap();
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("master"));
    assert_eq!(read(dir.path(), "README"), "v1");
    assert_eq!(read(dir.path(), "src/lib.rs"), "fn a() {}");
    assert!(!dir.path().join("src/new.rs").exists());
    assert_eq!(repo.head_commit().unwrap(), Some(base.commit_id));

    repo.checkout(&Reference::unknown("feature")).unwrap();
    assert_eq!(read(dir.path(), "README"), "v2");
    assert_eq!(read(dir.path(), "src/new.rs"), "fn b() {}");
}

#[test]
fn qualified_names_pick_branch_or_tag() {
    let (dir, repo) = init();
    write(dir.path(), "f", "1");
    let first = repo.snapshot("first").unwrap();
    repo.create_tag("release", None).unwrap();
    write(dir.path(), "f", "2");
    let second = repo.snapshot("second").unwrap();
    repo.create_branch("release", None).unwrap();

    let tag = repo.resolve_commit(&Reference::unknown("tags/release")).unwrap();
    let branch = repo.resolve_commit(&Reference::unknown("heads/release")).unwrap();
    let bare = repo.resolve_commit(&Reference::unknown("release")).unwrap();
    assert_eq!(tag, first.commit_id);
    assert_eq!(branch, second.commit_id);
    assert_eq!(bare, second.commit_id);
}

#[test]
fn diff_reports_changes_between_refs() {
    let (dir, repo) = init();
    write(dir.path(), "keep", "k");
    write(dir.path(), "edit", "before");
    write(dir.path(), "gone", "g");
    write(dir.path(), "old/name", "moved content");
    repo.snapshot("before").unwrap();
    repo.create_tag("before", None).unwrap();

    write(dir.path(), "edit", "after");
    fs::remove_file(dir.path().join("gone")).unwrap();
    fs::remove_dir_all(dir.path().join("old")).unwrap();
    write(dir.path(), "new/name", "moved content");
    write(dir.path(), "fresh", "f");
    repo.snapshot("after").unwrap();

    let lines: Vec<String> = repo
        .diff(&Reference::unknown("before"), None)
        .unwrap()
        .changes()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        lines,
        [
            "M\tedit",
            "A\tfresh",
            "D\tgone",
            "R\told/name -> new/name",
        ]
    );
}

// ---- Partial ids ----

#[test]
fn partial_commit_id_expands() {
    let (dir, repo) = init();
    write(dir.path(), "f", "x");
    let outcome = repo.snapshot("partial").unwrap();

    let hex = outcome.commit_id.to_hex();
    let resolution = repo.resolve(Reference::unknown(&hex[..MIN_PREFIX_LEN])).unwrap();
    assert_eq!(resolution.commit_id(), Some(outcome.commit_id));
    assert!(!resolution.is_ambiguous());

    let short = repo.resolve(Reference::unknown(&hex[..5])).unwrap();
    assert_eq!(short.commit_id(), None);
}

#[test]
fn ambiguous_prefix_warns_and_picks_smallest() {
    let (_dir, repo) = init();

    // Find two contents whose blob ids share a prefix, then store both.
    let mut seen: HashMap<String, u32> = HashMap::new();
    let (prefix, a, b) = (0u32..)
        .find_map(|i| {
            let id = ContentHasher::BLOB.hash(&i.to_le_bytes());
            let prefix = id.to_hex()[..MIN_PREFIX_LEN].to_string();
            seen.insert(prefix.clone(), i).map(|j| (prefix, i, j))
        })
        .unwrap();
    let ids: Vec<ObjectId> = [a, b]
        .iter()
        .map(|i| {
            repo.objects()
                .write(&Object::Blob(Blob::new(i.to_le_bytes().to_vec())))
                .unwrap()
        })
        .collect();
    let smallest = *ids.iter().min().unwrap();

    let resolution = repo.resolve(Reference::unknown(prefix.clone())).unwrap();
    assert_eq!(resolution.commit_id(), Some(smallest));
    assert!(resolution.is_ambiguous());
    let ResolveWarning::Ambiguous { candidates, .. } = &resolution.warnings[0];
    assert_eq!(candidates.len(), 2);
    assert!(resolution.warnings[0].to_string().contains("ambiguous ref"));

    let (object, _) = repo.find_object(&prefix).unwrap();
    assert_eq!(object.id(), smallest);
}

// ---- Signing ----

fn enable_signing(dir: &Path, repo: &Repository) -> Repository {
    let key = SigningKey::generate();
    let key_hex: String = key.as_bytes().iter().map(|b| format!("{b:02x}")).collect();
    fs::write(repo.store_dir().join("signing.key"), key_hex).unwrap();

    let mut config = repo.config().clone();
    config.store.compression_level = 0;
    config.signing = Some(SigningConfig {
        key_file: "signing.key".into(),
        key_hint: None,
    });
    config.save(&repo.config_path()).unwrap();
    Repository::open(dir).unwrap()
}

#[test]
fn signed_commits_verify_on_read() {
    let (dir, repo) = init();
    let repo = enable_signing(dir.path(), &repo);
    write(dir.path(), "f", "signed");
    let outcome = repo.snapshot("signed commit").unwrap();

    let commit = repo.objects().read_commit(&outcome.commit_id).unwrap().unwrap();
    assert!(commit.signature.is_some());
}

#[test]
fn tampered_commit_is_rejected() {
    let (dir, repo) = init();
    let repo = enable_signing(dir.path(), &repo);
    write(dir.path(), "f", "content");
    let outcome = repo.snapshot("original-message-xyz").unwrap();

    let path = repo.objects().path_for(&outcome.commit_id);
    let mut bytes = fs::read(&path).unwrap();
    let at = bytes
        .windows(20)
        .position(|w| w == b"original-message-xyz")
        .unwrap();
    bytes[at..at + 20].copy_from_slice(b"tampered-message-xyz");
    fs::write(&path, bytes).unwrap();

    match repo.read_object(&outcome.commit_id) {
        Err(RepoError::Store(StoreError::CorruptObject { reason, .. })) => {
            assert!(reason.contains("tampering suspected"), "{reason}");
        }
        other => panic!("expected CorruptObject, got {other:?}"),
    }
}

#[test]
fn missing_key_file_fails_to_open() {
    let (dir, repo) = init();
    let mut config = repo.config().clone();
    config.signing = Some(SigningConfig {
        key_file: "absent.key".into(),
        key_hint: None,
    });
    config.save(&repo.config_path()).unwrap();

    assert!(matches!(
        Repository::open(dir.path()).unwrap_err(),
        RepoError::Config(_)
    ));
}

// ---- Configuration and ignore rules ----

#[test]
fn config_patterns_and_ignore_file_exclude_paths() {
    let (dir, repo) = init();
    let config = RepoConfig {
        ignore: vec!["*.log".into()],
        ..repo.config().clone()
    };
    config.save(&dir.path().join(".store").join(CONFIG_FILE)).unwrap();
    write(dir.path(), IGNORE_FILE, "build/\n");
    write(dir.path(), "main.c", "int main;");
    write(dir.path(), "debug.log", "noise");
    write(dir.path(), "build/main.o", "obj");

    let repo = Repository::open(dir.path()).unwrap();
    let outcome = repo.snapshot("ignored").unwrap();
    let Some(Object::Tree(tree)) = repo.read_object(&outcome.tree_id).unwrap() else {
        panic!("tree missing");
    };
    let names: Vec<&str> = tree.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, [IGNORE_FILE, "main.c"]);
}

#[test]
fn configured_author_is_recorded() {
    let (dir, repo) = init();
    let mut config = repo.config().clone();
    config.author.name = "Ada Lovelace".into();
    config.author.email = "ada@example.com".into();
    config.save(&repo.config_path()).unwrap();

    let repo = Repository::open(dir.path()).unwrap();
    let outcome = repo.snapshot("authored").unwrap();
    let commit = repo.objects().read_commit(&outcome.commit_id).unwrap().unwrap();
    assert_eq!(commit.author, repo.config().author());
}
