use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length of an object id in bytes.
pub const ID_LEN: usize = 20;

/// Length of a fully spelled-out object id in hex characters.
pub const ID_HEX_LEN: usize = ID_LEN * 2;

/// Shortest hex prefix accepted as a partial object id.
pub const MIN_PREFIX_LEN: usize = 6;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the SHA-1 digest of an object's canonical preimage.
/// Identical content always produces the same `ObjectId`, which makes objects
/// deduplicatable and lets the id double as a filesystem path: the first
/// byte names a shard directory and the remaining 19 bytes name the file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; ID_LEN]);

impl ObjectId {
    /// Create an `ObjectId` from a pre-computed digest.
    pub const fn from_hash(hash: [u8; ID_LEN]) -> Self {
        Self(hash)
    }

    /// Create an `ObjectId` from a byte slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; ID_LEN] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: ID_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Hex-encoded string representation (40 lowercase characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 7 characters), as printed by `log`.
    pub fn short_hex(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(7);
        s
    }

    /// Parse from a full 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Split into the shard directory name and the file name.
    ///
    /// `("ab", "cdef…")` for an id whose hex form is `abcdef…`.
    pub fn shard(&self) -> (String, String) {
        (hex::encode(&self.0[..1]), hex::encode(&self.0[1..]))
    }

    /// Returns `true` if this id's hex form starts with `prefix`
    /// (case-insensitive).
    pub fn starts_with_hex(&self, prefix: &str) -> bool {
        self.to_hex().starts_with(&prefix.to_ascii_lowercase())
    }
}

/// Returns `true` if `s` looks like a full or partial object id:
/// 6 to 40 hex digits.
pub fn is_hex_prefix(s: &str) -> bool {
    (MIN_PREFIX_LEN..=ID_HEX_LEN).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; ID_LEN]> for ObjectId {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; ID_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::from_hash([0xab; ID_LEN]);
        let hex = id.to_hex();
        assert_eq!(hex.len(), ID_HEX_LEN);
        let parsed = ObjectId::from_hex(&hex).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: ID_LEN,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let err = ObjectId::from_hex(&"zz".repeat(ID_LEN)).unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn short_hex_is_7_chars() {
        let id = ObjectId::from_hash([7; ID_LEN]);
        assert_eq!(id.short_hex(), "0707070");
    }

    #[test]
    fn shard_splits_first_byte() {
        let mut bytes = [0u8; ID_LEN];
        bytes[0] = 0x3f;
        bytes[1] = 0xa0;
        let (dir, file) = ObjectId::from_hash(bytes).shard();
        assert_eq!(dir, "3f");
        assert_eq!(file.len(), ID_HEX_LEN - 2);
        assert!(file.starts_with("a0"));
    }

    #[test]
    fn display_is_full_hex() {
        let id = ObjectId::from_hash([1; ID_LEN]);
        assert_eq!(format!("{id}"), id.to_hex());
    }

    #[test]
    fn prefix_detection() {
        assert!(is_hex_prefix("abcdef"));
        assert!(is_hex_prefix("ABCDEF0123"));
        assert!(!is_hex_prefix("abcde"));
        assert!(!is_hex_prefix("master"));
        assert!(!is_hex_prefix(&"a".repeat(41)));
    }

    #[test]
    fn starts_with_hex_ignores_case() {
        let id = ObjectId::from_hash([0xab; ID_LEN]);
        assert!(id.starts_with_hex("ABAB"));
        assert!(!id.starts_with_hex("abac"));
    }

    #[test]
    fn serde_roundtrip() {
        let id = ObjectId::from_hash([9; ID_LEN]);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    proptest! {
        #[test]
        fn any_id_survives_hex(bytes in any::<[u8; ID_LEN]>()) {
            let id = ObjectId::from_hash(bytes);
            prop_assert_eq!(ObjectId::from_hex(&id.to_hex()).unwrap(), id);
            let (dir, file) = id.shard();
            prop_assert_eq!(format!("{dir}{file}"), id.to_hex());
        }
    }
}
