//! Encoding side of the codec.
//!
//! An [`Encoder`] owns an arena of nodes. Each value being encoded is
//! pointed at one node (its target) and fills it by requesting exactly one
//! container shape. Containers hand out child nodes for their keys or
//! positions and recurse into [`Encode::encode`] with the target moved to
//! the child. Once the root value has been encoded,
//! [`Encoder::into_value`] folds the arena into a [`Value`] tree.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{render_path, CodecError, CodecResult, PathKey};
use crate::user_info::UserInfo;
use crate::value::Value;

/// A value that knows how to describe itself to an [`Encoder`].
pub trait Encode {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()>;
}

type NodeId = usize;

#[derive(Debug)]
enum Node {
    /// Nothing requested yet. Folds to an empty map.
    Empty,
    Value(Value),
    Map(Vec<(String, NodeId)>),
    Array(Vec<NodeId>),
    /// Slot held for a [`ReferencingEncoder`]; carries the rendered path.
    Reserved(String),
}

impl Node {
    fn shape(&self) -> &'static str {
        match self {
            Node::Empty => "nothing",
            Node::Value(_) => "single value",
            Node::Map(_) => "keyed container",
            Node::Array(_) => "unkeyed container",
            Node::Reserved(_) => "deferred slot",
        }
    }
}

#[derive(Clone, Copy)]
enum Shape {
    Keyed,
    Unkeyed,
}

static NEXT_ENCODER_ID: AtomicU64 = AtomicU64::new(0);

/// Builds a [`Value`] tree from values implementing [`Encode`].
pub struct Encoder {
    id: u64,
    nodes: Vec<Node>,
    target: NodeId,
    path: Vec<PathKey>,
    user_info: UserInfo,
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_user_info(UserInfo::default())
    }

    pub fn with_user_info(user_info: UserInfo) -> Self {
        Self::at_path(user_info, Vec::new())
    }

    fn at_path(user_info: UserInfo, path: Vec<PathKey>) -> Self {
        Self {
            id: NEXT_ENCODER_ID.fetch_add(1, Ordering::Relaxed),
            nodes: vec![Node::Empty],
            target: 0,
            path,
            user_info,
        }
    }

    /// Path of the value currently being encoded.
    pub fn coding_path(&self) -> &[PathKey] {
        &self.path
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    /// Encode the current value as a map.
    ///
    /// # Panics
    ///
    /// If the current value already holds something other than a map.
    pub fn keyed_container(&mut self) -> KeyedEncodingContainer<'_> {
        let node = self.target;
        let path = self.path.clone();
        self.claim(node, Shape::Keyed, &path);
        KeyedEncodingContainer {
            encoder: self,
            node,
            path,
        }
    }

    /// Encode the current value as an array.
    ///
    /// # Panics
    ///
    /// If the current value already holds something other than an array.
    pub fn unkeyed_container(&mut self) -> UnkeyedEncodingContainer<'_> {
        let node = self.target;
        let path = self.path.clone();
        self.claim(node, Shape::Unkeyed, &path);
        UnkeyedEncodingContainer {
            encoder: self,
            node,
            path,
        }
    }

    /// Encode the current value as one primitive.
    pub fn single_value_container(&mut self) -> SingleValueEncodingContainer<'_> {
        let node = self.target;
        SingleValueEncodingContainer {
            encoder: self,
            node,
        }
    }

    /// Build an `InvalidValue` error at the current path.
    pub fn invalid_value(&self, reason: impl Into<String>) -> CodecError {
        CodecError::InvalidValue {
            path: render_path(&self.path),
            reason: reason.into(),
        }
    }

    /// Fold the arena into a value tree.
    ///
    /// Fails with [`CodecError::UnresolvedReference`] if a deferred slot
    /// was never finished.
    pub fn into_value(mut self) -> CodecResult<Value> {
        self.fold(0)
    }

    fn fold(&mut self, id: NodeId) -> CodecResult<Value> {
        match std::mem::replace(&mut self.nodes[id], Node::Empty) {
            Node::Empty => Ok(Value::Map(Vec::new())),
            Node::Value(v) => Ok(v),
            Node::Map(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, child) in entries {
                    out.push((Value::String(key), self.fold(child)?));
                }
                Ok(Value::Map(out))
            }
            Node::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for child in items {
                    out.push(self.fold(child)?);
                }
                Ok(Value::Array(out))
            }
            Node::Reserved(path) => Err(CodecError::UnresolvedReference { path }),
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn claim(&mut self, id: NodeId, shape: Shape, path: &[PathKey]) {
        let replacement = match (&self.nodes[id], shape) {
            (Node::Empty, Shape::Keyed) => Node::Map(Vec::new()),
            (Node::Empty, Shape::Unkeyed) => Node::Array(Vec::new()),
            (Node::Map(_), Shape::Keyed) | (Node::Array(_), Shape::Unkeyed) => return,
            (existing, shape) => panic!(
                "cannot request a {} at {}: a {} is already encoded there",
                match shape {
                    Shape::Keyed => "keyed container",
                    Shape::Unkeyed => "unkeyed container",
                },
                render_path(path),
                existing.shape()
            ),
        };
        self.nodes[id] = replacement;
    }

    fn encode_child<T: Encode + ?Sized>(
        &mut self,
        child: NodeId,
        path: Vec<PathKey>,
        value: &T,
    ) -> CodecResult<()> {
        let saved_target = std::mem::replace(&mut self.target, child);
        let saved_path = std::mem::replace(&mut self.path, path);
        let result = value.encode(self);
        self.target = saved_target;
        self.path = saved_path;
        result
    }

    fn reserve(&mut self, id: NodeId, path: Vec<PathKey>) -> ReferencingEncoder {
        self.nodes[id] = Node::Reserved(render_path(&path));
        ReferencingEncoder {
            inner: Encoder::at_path(self.user_info.clone(), path),
            parent: self.id,
            slot: id,
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("path", &render_path(&self.path))
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

fn with_key(path: &[PathKey], key: PathKey) -> Vec<PathKey> {
    let mut out = Vec::with_capacity(path.len() + 1);
    out.extend_from_slice(path);
    out.push(key);
    out
}

/// Ordered `(key, value)` pairs. Encoding an existing key replaces it in
/// place.
pub struct KeyedEncodingContainer<'a> {
    encoder: &'a mut Encoder,
    node: NodeId,
    path: Vec<PathKey>,
}

impl KeyedEncodingContainer<'_> {
    pub fn coding_path(&self) -> &[PathKey] {
        &self.path
    }

    fn slot(&mut self, key: &str) -> NodeId {
        if let Node::Map(entries) = &self.encoder.nodes[self.node] {
            if let Some((_, id)) = entries.iter().find(|(k, _)| k == key) {
                return *id;
            }
        }
        let id = self.encoder.alloc(Node::Empty);
        if let Node::Map(entries) = &mut self.encoder.nodes[self.node] {
            entries.push((key.to_string(), id));
        }
        id
    }

    fn put(&mut self, key: &str, value: Value) {
        let id = self.slot(key);
        self.encoder.nodes[id] = Node::Value(value);
    }

    pub fn encode_nil(&mut self, key: &str) {
        self.put(key, Value::Nil);
    }

    pub fn encode_bool(&mut self, key: &str, value: bool) {
        self.put(key, Value::Bool(value));
    }

    pub fn encode_i64(&mut self, key: &str, value: i64) {
        self.put(key, Value::Int(value));
    }

    pub fn encode_u64(&mut self, key: &str, value: u64) {
        self.put(key, Value::UInt(value));
    }

    pub fn encode_f32(&mut self, key: &str, value: f32) {
        self.put(key, Value::Float(value));
    }

    pub fn encode_f64(&mut self, key: &str, value: f64) {
        self.put(key, Value::Double(value));
    }

    pub fn encode_str(&mut self, key: &str, value: &str) {
        self.put(key, Value::String(value.to_string()));
    }

    pub fn encode_bytes(&mut self, key: &str, value: &[u8]) {
        self.put(key, Value::Binary(value.to_vec()));
    }

    /// Encode any [`Encode`] value under `key`.
    pub fn encode<T: Encode + ?Sized>(&mut self, key: &str, value: &T) -> CodecResult<()> {
        let id = self.slot(key);
        self.encoder.nodes[id] = Node::Empty;
        let path = with_key(&self.path, PathKey::Key(key.to_string()));
        self.encoder.encode_child(id, path, value)
    }

    /// Encode `value` under `key` if present; omit the key otherwise.
    pub fn encode_if_present<T: Encode + ?Sized>(
        &mut self,
        key: &str,
        value: Option<&T>,
    ) -> CodecResult<()> {
        match value {
            Some(v) => self.encode(key, v),
            None => Ok(()),
        }
    }

    /// A map nested under `key`.
    ///
    /// # Panics
    ///
    /// If `key` already holds something other than a map.
    pub fn nested_keyed_container(&mut self, key: &str) -> KeyedEncodingContainer<'_> {
        let id = self.slot(key);
        let path = with_key(&self.path, PathKey::Key(key.to_string()));
        self.encoder.claim(id, Shape::Keyed, &path);
        KeyedEncodingContainer {
            encoder: &mut *self.encoder,
            node: id,
            path,
        }
    }

    /// An array nested under `key`.
    ///
    /// # Panics
    ///
    /// If `key` already holds something other than an array.
    pub fn nested_unkeyed_container(&mut self, key: &str) -> UnkeyedEncodingContainer<'_> {
        let id = self.slot(key);
        let path = with_key(&self.path, PathKey::Key(key.to_string()));
        self.encoder.claim(id, Shape::Unkeyed, &path);
        UnkeyedEncodingContainer {
            encoder: &mut *self.encoder,
            node: id,
            path,
        }
    }

    /// Reserve `key` now and fill it later through the returned encoder.
    pub fn defer(&mut self, key: &str) -> ReferencingEncoder {
        let id = self.slot(key);
        let path = with_key(&self.path, PathKey::Key(key.to_string()));
        self.encoder.reserve(id, path)
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.encoder.user_info
    }
}

/// Positional values.
pub struct UnkeyedEncodingContainer<'a> {
    encoder: &'a mut Encoder,
    node: NodeId,
    path: Vec<PathKey>,
}

impl UnkeyedEncodingContainer<'_> {
    pub fn coding_path(&self) -> &[PathKey] {
        &self.path
    }

    /// Number of values encoded so far.
    pub fn count(&self) -> usize {
        match &self.encoder.nodes[self.node] {
            Node::Array(items) => items.len(),
            _ => 0,
        }
    }

    fn next_slot(&mut self, node: Node) -> (NodeId, Vec<PathKey>) {
        let path = with_key(&self.path, PathKey::Index(self.count()));
        let id = self.encoder.alloc(node);
        if let Node::Array(items) = &mut self.encoder.nodes[self.node] {
            items.push(id);
        }
        (id, path)
    }

    fn push(&mut self, value: Value) {
        self.next_slot(Node::Value(value));
    }

    pub fn encode_nil(&mut self) {
        self.push(Value::Nil);
    }

    pub fn encode_bool(&mut self, value: bool) {
        self.push(Value::Bool(value));
    }

    pub fn encode_i64(&mut self, value: i64) {
        self.push(Value::Int(value));
    }

    pub fn encode_u64(&mut self, value: u64) {
        self.push(Value::UInt(value));
    }

    pub fn encode_f32(&mut self, value: f32) {
        self.push(Value::Float(value));
    }

    pub fn encode_f64(&mut self, value: f64) {
        self.push(Value::Double(value));
    }

    pub fn encode_str(&mut self, value: &str) {
        self.push(Value::String(value.to_string()));
    }

    pub fn encode_bytes(&mut self, value: &[u8]) {
        self.push(Value::Binary(value.to_vec()));
    }

    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        let (id, path) = self.next_slot(Node::Empty);
        self.encoder.encode_child(id, path, value)
    }

    pub fn nested_keyed_container(&mut self) -> KeyedEncodingContainer<'_> {
        let (id, path) = self.next_slot(Node::Map(Vec::new()));
        KeyedEncodingContainer {
            encoder: &mut *self.encoder,
            node: id,
            path,
        }
    }

    pub fn nested_unkeyed_container(&mut self) -> UnkeyedEncodingContainer<'_> {
        let (id, path) = self.next_slot(Node::Array(Vec::new()));
        UnkeyedEncodingContainer {
            encoder: &mut *self.encoder,
            node: id,
            path,
        }
    }

    /// Reserve the next position now and fill it later.
    pub fn defer(&mut self) -> ReferencingEncoder {
        let (id, path) = self.next_slot(Node::Empty);
        self.encoder.reserve(id, path)
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.encoder.user_info
    }
}

/// Exactly one primitive, or a delegation to another [`Encode`] impl.
pub struct SingleValueEncodingContainer<'a> {
    encoder: &'a mut Encoder,
    node: NodeId,
}

impl SingleValueEncodingContainer<'_> {
    fn assert_can_encode(&self) {
        let node = &self.encoder.nodes[self.node];
        if !matches!(node, Node::Empty) {
            panic!(
                "cannot encode a single value at {}: a {} is already encoded there",
                render_path(&self.encoder.path),
                node.shape()
            );
        }
    }

    fn set(&mut self, value: Value) {
        self.assert_can_encode();
        self.encoder.nodes[self.node] = Node::Value(value);
    }

    pub fn encode_nil(&mut self) {
        self.set(Value::Nil);
    }

    pub fn encode_bool(&mut self, value: bool) {
        self.set(Value::Bool(value));
    }

    pub fn encode_i64(&mut self, value: i64) {
        self.set(Value::Int(value));
    }

    pub fn encode_u64(&mut self, value: u64) {
        self.set(Value::UInt(value));
    }

    pub fn encode_f32(&mut self, value: f32) {
        self.set(Value::Float(value));
    }

    pub fn encode_f64(&mut self, value: f64) {
        self.set(Value::Double(value));
    }

    pub fn encode_str(&mut self, value: &str) {
        self.set(Value::String(value.to_string()));
    }

    pub fn encode_bytes(&mut self, value: &[u8]) {
        self.set(Value::Binary(value.to_vec()));
    }

    /// Store an already-built value tree as is.
    pub fn encode_value(&mut self, value: Value) {
        self.set(value);
    }

    /// Let `value` encode itself at this position.
    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        self.assert_can_encode();
        value.encode(self.encoder)
    }
}

/// Encoder for a deferred slot.
///
/// Owns its own arena and coding path (starting at the reserved slot's
/// path) and dereferences to an [`Encoder`], so the usual container
/// requests work on it. [`finish`](Self::finish) splices the result back
/// into the encoder the slot was reserved in.
pub struct ReferencingEncoder {
    inner: Encoder,
    parent: u64,
    slot: NodeId,
}

impl ReferencingEncoder {
    /// Splice the produced value into the reserved slot.
    ///
    /// Nothing encoded leaves an empty map in the slot.
    ///
    /// # Panics
    ///
    /// If `parent` is not the encoder the slot was reserved in, or if the
    /// slot was overwritten after it was reserved.
    pub fn finish(self, parent: &mut Encoder) -> CodecResult<()> {
        assert_eq!(
            parent.id, self.parent,
            "referencing encoder finished against a different encoder"
        );
        if !matches!(parent.nodes[self.slot], Node::Reserved(_)) {
            panic!(
                "deferred slot at {} was overwritten before finish",
                render_path(self.inner.coding_path())
            );
        }
        let value = self.inner.into_value()?;
        parent.nodes[self.slot] = Node::Value(value);
        Ok(())
    }
}

impl Deref for ReferencingEncoder {
    type Target = Encoder;

    fn deref(&self) -> &Encoder {
        &self.inner
    }
}

impl DerefMut for ReferencingEncoder {
    fn deref_mut(&mut self) -> &mut Encoder {
        &mut self.inner
    }
}
