//! Decoding side of the codec.
//!
//! A [`Decoder`] walks a borrowed [`Value`] tree. It keeps a stack of the
//! values currently being decoded: decoding a nested field pushes that
//! field, runs its [`Decode`] impl and pops it again.

use std::fmt;

use crate::error::{render_path, CodecError, CodecResult, PathKey};
use crate::user_info::UserInfo;
use crate::value::Value;

/// A value that can rebuild itself from a [`Decoder`].
pub trait Decode: Sized {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self>;
}

/// Fixed-width integers that stored numbers can be narrowed into.
///
/// Narrowing is range-checked; a stored number that does not fit fails
/// with [`CodecError::NumberOutOfRange`] instead of truncating.
pub trait FixedInt: Copy + TryFrom<i64> + TryFrom<u64> {
    const NAME: &'static str;
}

macro_rules! fixed_int {
    ($($t:ty),*) => {
        $(impl FixedInt for $t {
            const NAME: &'static str = stringify!($t);
        })*
    };
}

fixed_int!(i8, i16, i32, i64, u8, u16, u32, u64);

fn mismatch(path: &[PathKey], expected: &'static str, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        path: render_path(path),
        expected,
        found: found.kind_name(),
    }
}

fn read_bool(value: &Value, path: &[PathKey]) -> CodecResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(mismatch(path, "bool", other)),
    }
}

fn read_int<T: FixedInt>(value: &Value, path: &[PathKey]) -> CodecResult<T> {
    let narrowed = match value {
        Value::Int(i) => T::try_from(*i).ok(),
        Value::UInt(u) => T::try_from(*u).ok(),
        other => return Err(mismatch(path, "integer", other)),
    };
    narrowed.ok_or_else(|| CodecError::NumberOutOfRange {
        path: render_path(path),
        target: T::NAME,
    })
}

fn read_f32(value: &Value, path: &[PathKey]) -> CodecResult<f32> {
    match value {
        Value::Float(f) => Ok(*f),
        other => Err(mismatch(path, "float32", other)),
    }
}

fn read_f64(value: &Value, path: &[PathKey]) -> CodecResult<f64> {
    match value {
        Value::Float(f) => Ok(f64::from(*f)),
        Value::Double(f) => Ok(*f),
        other => Err(mismatch(path, "float64", other)),
    }
}

fn read_str<'v>(value: &'v Value, path: &[PathKey]) -> CodecResult<&'v str> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(mismatch(path, "string", other)),
    }
}

fn read_bytes<'v>(value: &'v Value, path: &[PathKey]) -> CodecResult<&'v [u8]> {
    match value {
        Value::Binary(b) => Ok(b),
        other => Err(mismatch(path, "binary", other)),
    }
}

fn with_key(path: &[PathKey], key: PathKey) -> Vec<PathKey> {
    let mut out = Vec::with_capacity(path.len() + 1);
    out.extend_from_slice(path);
    out.push(key);
    out
}

/// Rebuilds [`Decode`] values from a [`Value`] tree.
pub struct Decoder<'v> {
    stack: Vec<&'v Value>,
    path: Vec<PathKey>,
    user_info: &'v UserInfo,
}

impl<'v> Decoder<'v> {
    pub fn new(value: &'v Value, user_info: &'v UserInfo) -> Self {
        Self {
            stack: vec![value],
            path: Vec::new(),
            user_info,
        }
    }

    /// Path of the value currently being decoded.
    pub fn coding_path(&self) -> &[PathKey] {
        &self.path
    }

    pub fn user_info(&self) -> &'v UserInfo {
        self.user_info
    }

    /// Build a `DataCorrupted` error at the current path.
    pub fn corrupted(&self, reason: impl Into<String>) -> CodecError {
        CodecError::DataCorrupted {
            path: render_path(&self.path),
            reason: reason.into(),
        }
    }

    fn current(&self) -> &'v Value {
        self.stack[self.stack.len() - 1]
    }

    /// Read the current value as a map.
    pub fn keyed_container(&mut self) -> CodecResult<KeyedDecodingContainer<'_, 'v>> {
        match self.current() {
            Value::Map(entries) => {
                let path = self.path.clone();
                Ok(KeyedDecodingContainer {
                    decoder: self,
                    entries,
                    path,
                })
            }
            other => Err(mismatch(&self.path, "map", other)),
        }
    }

    /// Read the current value as an array.
    pub fn unkeyed_container(&mut self) -> CodecResult<UnkeyedDecodingContainer<'_, 'v>> {
        match self.current() {
            Value::Array(items) => {
                let path = self.path.clone();
                Ok(UnkeyedDecodingContainer {
                    decoder: self,
                    items,
                    index: 0,
                    path,
                })
            }
            other => Err(mismatch(&self.path, "array", other)),
        }
    }

    /// Read the current value as one primitive.
    pub fn single_value_container(&mut self) -> SingleValueDecodingContainer<'_, 'v> {
        let value = self.current();
        SingleValueDecodingContainer {
            decoder: self,
            value,
        }
    }

    fn decode_child<T: Decode>(&mut self, value: &'v Value, path: Vec<PathKey>) -> CodecResult<T> {
        self.stack.push(value);
        let saved = std::mem::replace(&mut self.path, path);
        let result = T::decode(self);
        self.path = saved;
        self.stack.pop();
        result
    }
}

impl fmt::Debug for Decoder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("path", &render_path(&self.path))
            .field("depth", &self.stack.len())
            .finish()
    }
}

/// Reads fields of a map by key.
pub struct KeyedDecodingContainer<'a, 'v> {
    decoder: &'a mut Decoder<'v>,
    entries: &'v [(Value, Value)],
    path: Vec<PathKey>,
}

impl<'a, 'v> KeyedDecodingContainer<'a, 'v> {
    pub fn coding_path(&self) -> &[PathKey] {
        &self.path
    }

    pub fn user_info(&self) -> &'v UserInfo {
        self.decoder.user_info
    }

    /// String keys present in the map, in stored order.
    pub fn keys(&self) -> impl Iterator<Item = &'v str> + 'v {
        self.entries.iter().filter_map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Build a `DataCorrupted` error at this container's path.
    pub fn corrupted(&self, reason: impl Into<String>) -> CodecError {
        CodecError::DataCorrupted {
            path: render_path(&self.path),
            reason: reason.into(),
        }
    }

    fn lookup(&self, key: &str) -> Option<&'v Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    fn require(&self, key: &str) -> CodecResult<&'v Value> {
        self.lookup(key).ok_or_else(|| CodecError::KeyNotFound {
            path: render_path(&self.path),
            key: key.to_string(),
        })
    }

    fn child_path(&self, key: &str) -> Vec<PathKey> {
        with_key(&self.path, PathKey::Key(key.to_string()))
    }

    /// `true` if `key` holds nil. Missing keys are an error.
    pub fn decode_nil(&self, key: &str) -> CodecResult<bool> {
        Ok(self.require(key)?.is_nil())
    }

    pub fn decode_bool(&self, key: &str) -> CodecResult<bool> {
        read_bool(self.require(key)?, &self.child_path(key))
    }

    pub fn decode_int<T: FixedInt>(&self, key: &str) -> CodecResult<T> {
        read_int(self.require(key)?, &self.child_path(key))
    }

    pub fn decode_i64(&self, key: &str) -> CodecResult<i64> {
        self.decode_int(key)
    }

    pub fn decode_u64(&self, key: &str) -> CodecResult<u64> {
        self.decode_int(key)
    }

    pub fn decode_f32(&self, key: &str) -> CodecResult<f32> {
        read_f32(self.require(key)?, &self.child_path(key))
    }

    pub fn decode_f64(&self, key: &str) -> CodecResult<f64> {
        read_f64(self.require(key)?, &self.child_path(key))
    }

    pub fn decode_str(&self, key: &str) -> CodecResult<String> {
        read_str(self.require(key)?, &self.child_path(key)).map(str::to_string)
    }

    pub fn decode_bytes(&self, key: &str) -> CodecResult<Vec<u8>> {
        read_bytes(self.require(key)?, &self.child_path(key)).map(<[u8]>::to_vec)
    }

    pub fn decode<T: Decode>(&mut self, key: &str) -> CodecResult<T> {
        let value = self.require(key)?;
        let path = self.child_path(key);
        self.decoder.decode_child(value, path)
    }

    /// `None` when `key` is missing or nil.
    pub fn decode_if_present<T: Decode>(&mut self, key: &str) -> CodecResult<Option<T>> {
        match self.lookup(key) {
            None | Some(Value::Nil) => Ok(None),
            Some(value) => {
                let path = self.child_path(key);
                self.decoder.decode_child(value, path).map(Some)
            }
        }
    }

    pub fn nested_keyed_container(
        &mut self,
        key: &str,
    ) -> CodecResult<KeyedDecodingContainer<'_, 'v>> {
        let path = self.child_path(key);
        match self.require(key)? {
            Value::Map(entries) => Ok(KeyedDecodingContainer {
                decoder: &mut *self.decoder,
                entries,
                path,
            }),
            other => Err(mismatch(&path, "map", other)),
        }
    }

    pub fn nested_unkeyed_container(
        &mut self,
        key: &str,
    ) -> CodecResult<UnkeyedDecodingContainer<'_, 'v>> {
        let path = self.child_path(key);
        match self.require(key)? {
            Value::Array(items) => Ok(UnkeyedDecodingContainer {
                decoder: &mut *self.decoder,
                items,
                index: 0,
                path,
            }),
            other => Err(mismatch(&path, "array", other)),
        }
    }
}

/// Reads the values of an array in order.
pub struct UnkeyedDecodingContainer<'a, 'v> {
    decoder: &'a mut Decoder<'v>,
    items: &'v [Value],
    index: usize,
    path: Vec<PathKey>,
}

impl<'a, 'v> UnkeyedDecodingContainer<'a, 'v> {
    pub fn coding_path(&self) -> &[PathKey] {
        &self.path
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Index of the next value to be read.
    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn is_at_end(&self) -> bool {
        self.index >= self.items.len()
    }

    fn peek(&self) -> CodecResult<(&'v Value, Vec<PathKey>)> {
        let path = with_key(&self.path, PathKey::Index(self.index));
        match self.items.get(self.index) {
            Some(value) => Ok((value, path)),
            None => Err(CodecError::ValueNotFound {
                path: render_path(&path),
                reason: format!("unkeyed container holds only {} values", self.items.len()),
            }),
        }
    }

    fn next(&mut self) -> CodecResult<(&'v Value, Vec<PathKey>)> {
        let next = self.peek()?;
        self.index += 1;
        Ok(next)
    }

    /// Consume the next value if it is nil.
    pub fn decode_nil(&mut self) -> CodecResult<bool> {
        let (value, _) = self.peek()?;
        if value.is_nil() {
            self.index += 1;
        }
        Ok(value.is_nil())
    }

    pub fn decode_bool(&mut self) -> CodecResult<bool> {
        let (value, path) = self.next()?;
        read_bool(value, &path)
    }

    pub fn decode_int<T: FixedInt>(&mut self) -> CodecResult<T> {
        let (value, path) = self.next()?;
        read_int(value, &path)
    }

    pub fn decode_i64(&mut self) -> CodecResult<i64> {
        self.decode_int()
    }

    pub fn decode_u64(&mut self) -> CodecResult<u64> {
        self.decode_int()
    }

    pub fn decode_f32(&mut self) -> CodecResult<f32> {
        let (value, path) = self.next()?;
        read_f32(value, &path)
    }

    pub fn decode_f64(&mut self) -> CodecResult<f64> {
        let (value, path) = self.next()?;
        read_f64(value, &path)
    }

    pub fn decode_str(&mut self) -> CodecResult<String> {
        let (value, path) = self.next()?;
        read_str(value, &path).map(str::to_string)
    }

    pub fn decode_bytes(&mut self) -> CodecResult<Vec<u8>> {
        let (value, path) = self.next()?;
        read_bytes(value, &path).map(<[u8]>::to_vec)
    }

    pub fn decode<T: Decode>(&mut self) -> CodecResult<T> {
        let (value, path) = self.next()?;
        self.decoder.decode_child(value, path)
    }

    pub fn nested_keyed_container(&mut self) -> CodecResult<KeyedDecodingContainer<'_, 'v>> {
        let (value, path) = self.next()?;
        match value {
            Value::Map(entries) => Ok(KeyedDecodingContainer {
                decoder: &mut *self.decoder,
                entries,
                path,
            }),
            other => Err(mismatch(&path, "map", other)),
        }
    }

    pub fn nested_unkeyed_container(&mut self) -> CodecResult<UnkeyedDecodingContainer<'_, 'v>> {
        let (value, path) = self.next()?;
        match value {
            Value::Array(items) => Ok(UnkeyedDecodingContainer {
                decoder: &mut *self.decoder,
                items,
                index: 0,
                path,
            }),
            other => Err(mismatch(&path, "array", other)),
        }
    }
}

/// Reads the current value as one primitive.
pub struct SingleValueDecodingContainer<'a, 'v> {
    decoder: &'a mut Decoder<'v>,
    value: &'v Value,
}

impl<'a, 'v> SingleValueDecodingContainer<'a, 'v> {
    fn path(&self) -> &[PathKey] {
        &self.decoder.path
    }

    pub fn decode_nil(&self) -> bool {
        self.value.is_nil()
    }

    pub fn decode_bool(&self) -> CodecResult<bool> {
        read_bool(self.value, self.path())
    }

    pub fn decode_int<T: FixedInt>(&self) -> CodecResult<T> {
        read_int(self.value, self.path())
    }

    pub fn decode_i64(&self) -> CodecResult<i64> {
        self.decode_int()
    }

    pub fn decode_u64(&self) -> CodecResult<u64> {
        self.decode_int()
    }

    pub fn decode_f32(&self) -> CodecResult<f32> {
        read_f32(self.value, self.path())
    }

    pub fn decode_f64(&self) -> CodecResult<f64> {
        read_f64(self.value, self.path())
    }

    pub fn decode_str(&self) -> CodecResult<String> {
        read_str(self.value, self.path()).map(str::to_string)
    }

    pub fn decode_bytes(&self) -> CodecResult<Vec<u8>> {
        read_bytes(self.value, self.path()).map(<[u8]>::to_vec)
    }

    /// The raw value tree at this position.
    pub fn decode_value(&self) -> Value {
        self.value.clone()
    }

    /// Let `T` decode itself from this position.
    pub fn decode<T: Decode>(&mut self) -> CodecResult<T> {
        T::decode(self.decoder)
    }
}
