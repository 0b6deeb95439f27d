//! Cryptographic primitives for Arbor.
//!
//! Provides the SHA-1 content hasher used to derive object ids (with the
//! `"blob"`, `"tree"` and `"commit"` preimage prefixes), and the pluggable
//! [`Signer`] capability used to sign and verify commits.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::{ContentHasher, Hasher, Preimage, Sha1Hasher};
pub use signer::{
    Ed25519Signer, SignatureError, Signer, SigningContext, SigningKey, VerifyingKey,
};
