//! Reference management for Arbor.
//!
//! References are the human-readable entry points into history: `HEAD`,
//! branches and tags, each ultimately naming a commit.
//!
//! # Architecture
//!
//! - **Branches** are mutable pointers that advance with every snapshot
//!   taken while they are checked out. A new repository has a `master`
//!   branch with no commits.
//! - **Tags** point at a fixed commit.
//! - **HEAD** names the current branch, or holds a commit id directly when
//!   detached.
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations and resolution
//! - [`types`] -- [`Reference`], [`Head`], [`RefKind`]
//! - [`traits`] -- The [`RefStore`] trait defining the storage interface
//! - [`names`] -- Branch/tag name validation
//! - [`fs`] -- File-backed [`FsRefStore`]
//! - [`memory`] -- In-memory [`InMemoryRefStore`] for tests
//! - [`resolver`] -- [`Resolver`], turning any reference into a commit id

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod resolver;
pub mod traits;
pub mod types;

pub use error::{RefError, RefResult, ResolveError, ResolveResult};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::{validate_branch_name, validate_tag_name};
pub use resolver::{Resolution, ResolveWarning, Resolver, MAX_STEPS};
pub use traits::RefStore;
pub use types::{Head, RefKind, Reference, HEADS_PREFIX, TAGS_PREFIX};
