//! High-level repository API for Arbor.
//!
//! A [`Repository`] ties the object store, the refs and the working tree
//! together: snapshots record the working tree as commits, checkout
//! restores one, and branches, tags and partial ids name commits. This is
//! the entry point the `arbor` CLI is built on.

pub mod config;
pub mod error;
pub mod log;
pub mod matcher;
pub mod repository;

pub use config::{AuthorConfig, RepoConfig, SigningConfig, StoreConfig};
pub use error::{RepoError, RepoResult};
pub use log::CommitLog;
pub use matcher::{GitignoreMatcher, IgnoreMatcher, NoIgnore, IGNORE_FILE};
pub use repository::{Repository, SnapshotOutcome, CONFIG_FILE, DEFAULT_BRANCH, STORE_DIR};

// Re-export key types
pub use arbor_diff::{Change, ChangeSet};
pub use arbor_refs::{Head, Reference, Resolution, ResolveWarning};
pub use arbor_store::{Blob, Commit, Entry, EntryKind, Object, ObjectKind, Tree};
pub use arbor_types::ObjectId;
