//! Change-set engine for Arbor.
//!
//! Compares two sets of `(path, content id)` pairs and classifies every
//! difference as added, removed, modified or renamed. Trees are flattened
//! into such sets first, so any two trees or commits can be compared.
//!
//! # Key Types
//!
//! - [`PathEntry`] -- one blob at one path
//! - [`ChangeSet`] -- the classified difference between two sets
//! - [`Change`] -- one line of a rendered diff

pub mod change_set;
pub mod error;
pub mod tree;

pub use change_set::{Change, ChangeSet, PathEntry};
pub use error::{DiffError, DiffResult};
pub use tree::{diff_commits, diff_trees, flatten_tree};
