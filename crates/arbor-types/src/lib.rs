//! Foundation types for Arbor.
//!
//! Every other Arbor crate depends on `arbor-types`. It deliberately carries
//! no hashing code: an [`ObjectId`] is just 20 bytes, and the function that
//! produces those bytes lives in `arbor-crypto`.
//!
//! # Key Types
//!
//! - [`ObjectId`]: content-addressed identifier (SHA-1 sized, 20 bytes)
//! - [`TypeError`]: parse failures for identifiers

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{is_hex_prefix, ObjectId, ID_HEX_LEN, ID_LEN, MIN_PREFIX_LEN};
