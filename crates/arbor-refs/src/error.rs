//! Error types for reference operations.

use arbor_store::StoreError;
use thiserror::Error;

/// Errors that can occur while reading or writing references.
#[derive(Debug, Error)]
pub enum RefError {
    /// The branch name is invalid.
    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// The tag name is invalid.
    #[error("invalid tag name: {name}: {reason}")]
    InvalidTagName { name: String, reason: String },

    /// A lock guarding an in-memory store was poisoned.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type RefResult<T> = std::result::Result<T, RefError>;

/// Errors that can occur while resolving a reference to a commit.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Resolution did not reach a terminal state within the step limit.
    #[error("resolving {start} did not terminate after {steps} steps")]
    TooManySteps { start: String, steps: usize },

    /// Reading a ref failed.
    #[error(transparent)]
    Ref(#[from] RefError),

    /// Listing candidate objects for a partial id failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for resolution.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
