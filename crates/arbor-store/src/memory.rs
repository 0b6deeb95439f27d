use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard};

use arbor_codec::UserInfo;
use arbor_crypto::SigningContext;
use arbor_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::Object;
use crate::traits::ObjectStore;

/// Object store backed by a map of encoded objects.
///
/// Objects are kept encoded but uncompressed, so reads exercise the same
/// decode and signature checks as [`FsObjectStore`](crate::FsObjectStore).
pub struct InMemoryObjectStore {
    encoded: RwLock<HashMap<ObjectId, Vec<u8>>>,
    user_info: UserInfo,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            encoded: RwLock::new(HashMap::new()),
            user_info: UserInfo::default(),
        }
    }

    /// Sign commits on write and verify their signatures on read.
    pub fn with_signing(mut self, signing: SigningContext) -> Self {
        self.user_info.insert(signing);
        self
    }

    fn entries(&self) -> RwLockReadGuard<'_, HashMap<ObjectId, Vec<u8>>> {
        self.encoded.read().expect("lock poisoned")
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Every stored id, in ascending order.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.entries().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Overwrite the stored bytes of `id`, bypassing encoding.
    #[cfg(test)]
    pub(crate) fn put_raw(&self, id: ObjectId, bytes: Vec<u8>) {
        self.encoded.write().expect("lock poisoned").insert(id, bytes);
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn write(&self, object: &Object) -> StoreResult<ObjectId> {
        let id = object.id();
        if self.entries().contains_key(&id) {
            return Ok(id);
        }
        let bytes = arbor_codec::to_vec_with(object, &self.user_info)?;
        self.encoded
            .write()
            .expect("lock poisoned")
            .entry(id)
            .or_insert(bytes);
        Ok(id)
    }

    fn read(&self, id: &ObjectId) -> StoreResult<Option<Object>> {
        let entries = self.entries();
        let Some(bytes) = entries.get(id) else {
            return Ok(None);
        };
        let object: Object = arbor_codec::from_slice_with(bytes, &self.user_info).map_err(|e| {
            StoreError::CorruptObject {
                id: *id,
                reason: e.to_string(),
            }
        })?;
        Ok(Some(object))
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.entries().contains_key(id))
    }

    fn ids_with_prefix(&self, prefix: &str) -> StoreResult<Vec<ObjectId>> {
        if prefix.len() < 2 {
            return Ok(Vec::new());
        }
        let mut ids: Vec<ObjectId> = self
            .entries()
            .keys()
            .filter(|id| id.starts_with_hex(prefix))
            .copied()
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &self.len())
            .finish()
    }
}
