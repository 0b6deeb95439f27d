use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Typed side-channel passed through a whole encode or decode.
///
/// Holds at most one value per type. Domain types look up the
/// collaborators they need (a signing context, say) without the codec
/// knowing what those are.
#[derive(Clone, Default)]
pub struct UserInfo {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl UserInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing any previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInfo")
            .field("entries", &self.entries.len())
            .finish()
    }
}
