//! Object model and content-addressed object storage for Arbor.
//!
//! Every piece of history is an immutable object identified by the SHA-1 of
//! its canonical preimage, much like git's `.git/objects/` directory.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- directory listing of named [`Entry`]s
//! - [`Commit`] -- a root tree plus author, time, message and parent
//!
//! Objects are serialized with `arbor-codec` inside a `{type, object}`
//! wrapper, so a read can tell the kind before decoding the body.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`FsObjectStore`] -- sharded directory of compressed files
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding

pub mod compress;
pub mod error;
pub mod fs;
pub mod memory;
pub mod object;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use compress::{compressor_for_level, Compressor, NoCompression, ZstdCompressor};
pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{Author, Blob, Commit, Entry, EntryKind, Object, ObjectKind, Tree};
pub use traits::ObjectStore;
