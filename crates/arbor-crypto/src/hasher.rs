use arbor_types::{ObjectId, ID_LEN};
use sha1::{Digest, Sha1};

/// A hash function producing object ids.
pub trait Hasher: Send + Sync {
    /// Digest `data` into an object id.
    fn hash(&self, data: &[u8]) -> ObjectId;
}

/// SHA-1, the hash every stored object id is derived with.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha1Hasher;

impl Hasher for Sha1Hasher {
    fn hash(&self, data: &[u8]) -> ObjectId {
        let digest = Sha1::digest(data);
        let mut bytes = [0u8; ID_LEN];
        bytes.copy_from_slice(&digest);
        ObjectId::from_hash(bytes)
    }
}

/// Domain-prefixed content hasher.
///
/// Each hasher carries a type tag (`"blob"`, `"tree"`, `"commit"`) that is
/// written at the front of every preimage, so a blob and a tree with
/// identical bytes never share an id. The tag is followed directly by the
/// content, with no separator.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for blob objects.
    pub const BLOB: Self = Self { domain: "blob" };
    /// Hasher for tree objects.
    pub const TREE: Self = Self { domain: "tree" };
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self { domain: "commit" };

    /// Hash `data` as the whole body of the preimage.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut preimage = self.preimage();
        preimage.push(data);
        preimage.finish()
    }

    /// Start a preimage that is assembled piece by piece.
    pub fn preimage(&self) -> Preimage {
        Preimage {
            buf: self.domain.as_bytes().to_vec(),
        }
    }

    /// Verify that data produces the expected object id.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }

    /// The type tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// An object preimage under construction.
#[derive(Debug, Clone)]
pub struct Preimage {
    buf: Vec<u8>,
}

impl Preimage {
    /// Append raw bytes.
    pub fn push(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a signed integer as 8 little-endian bytes.
    pub fn push_i64(&mut self, value: i64) -> &mut Self {
        self.push(&value.to_le_bytes())
    }

    /// The bytes accumulated so far, including the type tag.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Digest with SHA-1.
    pub fn finish(&self) -> ObjectId {
        self.finish_with(&Sha1Hasher)
    }

    /// Digest with an arbitrary [`Hasher`].
    pub fn finish_with(&self, hasher: &dyn Hasher) -> ObjectId {
        hasher.hash(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::BLOB.hash(data), ContentHasher::BLOB.hash(data));
    }

    #[test]
    fn blob_preimage_is_tag_then_content() {
        let id = ContentHasher::BLOB.hash(b"hi");
        assert_eq!(id, Sha1Hasher.hash(b"blobhi"));
        assert_eq!(id.to_hex(), "0661f10e3d4f1b872d39c2fa68e35619b1d49792");
    }

    #[test]
    fn sha1_known_vector() {
        let id = Sha1Hasher.hash(b"abc");
        assert_eq!(id.to_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let blob = ContentHasher::BLOB.hash(data);
        let tree = ContentHasher::TREE.hash(data);
        let commit = ContentHasher::COMMIT.hash(data);
        assert_ne!(blob, tree);
        assert_ne!(blob, commit);
        assert_ne!(tree, commit);
    }

    #[test]
    fn piecewise_preimage_matches_concatenation() {
        let mut preimage = ContentHasher::TREE.preimage();
        preimage.push(b"a.txt").push_i64(0o644);
        let mut expected = b"treea.txt".to_vec();
        expected.extend_from_slice(&0o644i64.to_le_bytes());
        assert_eq!(preimage.as_bytes(), expected.as_slice());
        assert_eq!(preimage.finish(), Sha1Hasher.hash(&expected));
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::BLOB.hash(b"original");
        assert!(ContentHasher::BLOB.verify(b"original", &id));
        assert!(!ContentHasher::BLOB.verify(b"tampered", &id));
    }

    proptest! {
        #[test]
        fn tag_is_a_plain_prefix(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let mut full = b"commit".to_vec();
            full.extend_from_slice(&data);
            prop_assert_eq!(ContentHasher::COMMIT.hash(&data), Sha1Hasher.hash(&full));
        }
    }
}
