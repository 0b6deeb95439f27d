use std::path::PathBuf;

use arbor_types::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not an arbor repository (or any parent): {0}")]
    NotARepository(PathBuf),

    #[error("directory already contains a repository: {0}")]
    AlreadyInitialized(PathBuf),

    /// A reference did not resolve to a commit.
    #[error("could not resolve {0}")]
    Unresolved(String),

    /// An object the history points at is missing or has the wrong type.
    #[error("repository is probably corrupted: {kind} {id} does not exist")]
    MissingObject { kind: &'static str, id: ObjectId },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("ignore pattern error: {0}")]
    Ignore(String),

    #[error("signing key error: {0}")]
    Signing(#[from] arbor_crypto::SignatureError),

    #[error("store error: {0}")]
    Store(#[from] arbor_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] arbor_refs::RefError),

    #[error("resolve error: {0}")]
    Resolve(#[from] arbor_refs::ResolveError),

    #[error("diff error: {0}")]
    Diff(#[from] arbor_diff::DiffError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
