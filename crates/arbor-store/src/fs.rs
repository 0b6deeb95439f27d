use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use arbor_codec::UserInfo;
use arbor_crypto::SigningContext;
use arbor_types::{ObjectId, ID_HEX_LEN};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::compress::{Compressor, ZstdCompressor};
use crate::error::{StoreError, StoreResult};
use crate::object::Object;
use crate::traits::ObjectStore;

/// Object store on the local filesystem.
///
/// Objects live at `<root>/<2 hex>/<38 hex>`: the first id byte names a
/// shard directory, the rest names the file. Each file holds the encoded
/// object, passed through the configured [`Compressor`]. Files are written
/// to a temporary name in the shard directory and renamed into place, so a
/// reader never sees a partial object.
pub struct FsObjectStore {
    root: PathBuf,
    compressor: Box<dyn Compressor>,
    user_info: UserInfo,
}

impl FsObjectStore {
    /// Open a store rooted at `root` with zstd compression.
    ///
    /// The directory is created lazily by the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compressor: Box::new(ZstdCompressor::default()),
            user_info: UserInfo::default(),
        }
    }

    pub fn with_compressor(mut self, compressor: Box<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Sign commits on write and verify their signatures on read.
    pub fn with_signing(mut self, signing: SigningContext) -> Self {
        self.user_info.insert(signing);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the object with `id` is (or would be) stored.
    pub fn path_for(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.shard();
        self.root.join(dir).join(file)
    }

    fn corrupt(id: &ObjectId, reason: impl ToString) -> StoreError {
        StoreError::CorruptObject {
            id: *id,
            reason: reason.to_string(),
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn write(&self, object: &Object) -> StoreResult<ObjectId> {
        let id = object.id();
        let path = self.path_for(&id);
        if path.exists() {
            debug!(%id, kind = %object.kind(), "object already stored");
            return Ok(id);
        }

        let shard = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "object path has no parent"))?;
        fs::create_dir_all(shard)?;

        let encoded = arbor_codec::to_vec_with(object, &self.user_info)?;
        let packed = self.compressor.compress(&encoded)?;

        let mut tmp = NamedTempFile::new_in(shard)?;
        tmp.write_all(&packed)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(
            %id,
            kind = %object.kind(),
            bytes = packed.len(),
            compressor = self.compressor.name(),
            "object written"
        );
        Ok(id)
    }

    fn read(&self, id: &ObjectId) -> StoreResult<Option<Object>> {
        let path = self.path_for(id);
        let packed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let encoded = self
            .compressor
            .decompress(&packed)
            .map_err(|e| Self::corrupt(id, e))?;
        let object: Object = arbor_codec::from_slice_with(&encoded, &self.user_info)
            .map_err(|e| Self::corrupt(id, e))?;
        let actual = object.id();
        if actual != *id {
            return Err(Self::corrupt(id, format!("content hashes to {actual}")));
        }
        Ok(Some(object))
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.path_for(id).is_file())
    }

    fn ids_with_prefix(&self, prefix: &str) -> StoreResult<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        if prefix.len() < 2
            || prefix.len() > ID_HEX_LEN
            || !prefix.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Ok(Vec::new());
        }
        let (dir, rest) = prefix.split_at(2);
        let shard = self.root.join(dir);
        let listing = match fs::read_dir(&shard) {
            Ok(listing) => listing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in listing {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(rest) {
                continue;
            }
            // Skips leftover temp files and anything else that is not an id.
            if let Ok(id) = ObjectId::from_hex(&format!("{dir}{name}")) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl std::fmt::Debug for FsObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsObjectStore")
            .field("root", &self.root)
            .field("compressor", &self.compressor.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::compress::NoCompression;
    use crate::object::{Author, Blob, Commit, Entry, EntryKind, Tree};
    use arbor_crypto::{Ed25519Signer, SigningKey};
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn store() -> (TempDir, FsObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path().join("objects"));
        (dir, store)
    }

    fn blob(content: &[u8]) -> Object {
        Object::from(Blob::new(content.to_vec()))
    }

    fn commit(message: &str) -> Commit {
        Commit::new(
            None,
            Author::new("a", "a@b"),
            DateTime::<Utc>::from_timestamp(1_000, 0).unwrap(),
            Tree::empty().id(),
            message,
        )
    }

    #[test]
    fn write_places_object_in_shard() {
        let (_dir, store) = store();
        let id = store.write(&blob(b"hi")).unwrap();
        let (shard, file) = id.shard();
        let path = store.root().join(&shard).join(&file);
        assert!(path.is_file());
        assert_eq!(shard.len(), 2);
        assert_eq!(file.len(), 38);
    }

    #[test]
    fn write_then_read() {
        let (_dir, store) = store();
        let empty = Blob::new(vec![]).id();
        let tree = Tree::new(vec![Entry::new(0o644, empty, EntryKind::Blob, "e")]).unwrap();
        let id = store.write(&Object::from(tree.clone())).unwrap();
        assert_eq!(store.read_tree(&id).unwrap(), Some(tree));
    }

    #[test]
    fn write_is_idempotent() {
        let (_dir, store) = store();
        let first = store.write(&blob(b"same")).unwrap();
        let modified = fs::metadata(store.path_for(&first)).unwrap().modified().unwrap();
        let second = store.write(&blob(b"same")).unwrap();
        assert_eq!(first, second);
        let again = fs::metadata(store.path_for(&first)).unwrap().modified().unwrap();
        assert_eq!(modified, again);
    }

    #[test]
    fn missing_object_is_none() {
        let (_dir, store) = store();
        let id = Blob::new(b"never".to_vec()).id();
        assert!(store.read(&id).unwrap().is_none());
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn wrong_type_is_none() {
        let (_dir, store) = store();
        let id = store.write(&blob(b"data")).unwrap();
        assert!(store.read_commit(&id).unwrap().is_none());
        assert!(store.read_tree(&id).unwrap().is_none());
        assert!(store.read_blob(&id).unwrap().is_some());
    }

    #[test]
    fn garbage_on_disk_is_corrupt() {
        let (_dir, store) = store();
        let id = store.write(&blob(b"ok")).unwrap();
        fs::write(store.path_for(&id), b"\xc1garbage").unwrap();
        assert!(matches!(
            store.read(&id),
            Err(StoreError::CorruptObject { id: bad, .. }) if bad == id
        ));
    }

    #[test]
    fn content_under_wrong_name_is_corrupt() {
        let (_dir, store) = store();
        let real = store.write(&blob(b"one")).unwrap();
        let other = Blob::new(b"two".to_vec()).id();
        let target = store.path_for(&other);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::copy(store.path_for(&real), &target).unwrap();
        assert!(matches!(
            store.read(&other),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn uncompressed_store_reads_compressed_objects() {
        let dir = TempDir::new().unwrap();
        let zstd = FsObjectStore::new(dir.path());
        let id = zstd.write(&blob(b"shared")).unwrap();
        let plain = FsObjectStore::new(dir.path()).with_compressor(Box::new(NoCompression));
        assert!(plain.read_blob(&id).unwrap().is_some());
    }

    #[test]
    fn prefix_lookup() {
        let (_dir, store) = store();
        let id = store.write(&blob(b"prefix")).unwrap();
        let hex = id.to_hex();
        assert_eq!(store.ids_with_prefix(&hex[..6]).unwrap(), vec![id]);
        assert_eq!(store.ids_with_prefix(&hex[..6].to_uppercase()).unwrap(), vec![id]);
        assert_eq!(store.ids_with_prefix(&hex).unwrap(), vec![id]);
        assert!(store.ids_with_prefix("x").unwrap().is_empty());
        let other = if hex.starts_with("ff") { "00" } else { "ff" };
        assert!(store.ids_with_prefix(other).unwrap().is_empty());
    }

    #[test]
    fn signing_store_signs_and_verifies() {
        let dir = TempDir::new().unwrap();
        let key = SigningKey::generate();
        let secret = *key.as_bytes();
        let signing = SigningContext::new(Arc::new(Ed25519Signer::new(key)), None);
        let store = FsObjectStore::new(dir.path()).with_signing(signing);
        let id = store.write(&Object::from(commit("signed"))).unwrap();
        let read = store.read_commit(&id).unwrap().unwrap();
        assert!(read.signature.is_some());

        let wrong = SigningContext::new(Arc::new(Ed25519Signer::new(SigningKey::generate())), None);
        let other = FsObjectStore::new(dir.path()).with_signing(wrong);
        match other.read(&id) {
            Err(StoreError::CorruptObject { reason, .. }) => {
                assert!(reason.contains("tampering suspected"))
            }
            other => panic!("expected CorruptObject, got {other:?}"),
        }

        let same = SigningContext::new(
            Arc::new(Ed25519Signer::new(SigningKey::from_bytes(secret))),
            None,
        );
        let again = FsObjectStore::new(dir.path()).with_signing(same);
        assert!(again.read(&id).unwrap().is_some());
    }
}
