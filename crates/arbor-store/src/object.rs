use std::fmt;
use std::hash::{Hash, Hasher};

use arbor_codec::{
    Bytes, CodecResult, Decode, Decoder, Encode, Encoder, KeyedDecodingContainer,
};
use arbor_crypto::{ContentHasher, SigningContext};
use arbor_types::ObjectId;
use chrono::{DateTime, Timelike, Utc};

use crate::error::{StoreError, StoreResult};

/// The kind of a stored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Directory listing.
    Tree,
    /// Point in history: a tree plus authorship and an optional parent.
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode_id(c: &KeyedDecodingContainer<'_, '_>, key: &str, raw: &[u8]) -> CodecResult<ObjectId> {
    ObjectId::from_slice(raw).map_err(|e| c.corrupted(format!("{key}: {e}")))
}

fn decode_hex_id(c: &KeyedDecodingContainer<'_, '_>, key: &str, hex: &str) -> CodecResult<ObjectId> {
    ObjectId::from_hex(hex).map_err(|e| c.corrupted(format!("{key}: {e}")))
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object (analogous to git blob).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub content: Vec<u8>,
}

impl Blob {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    /// `H("blob" || content)`.
    pub fn id(&self) -> ObjectId {
        ContentHasher::BLOB.hash(&self.content)
    }

    pub fn kind(&self) -> ObjectKind {
        ObjectKind::Blob
    }

    /// The content as (lossy) UTF-8, or `(empty)`.
    pub fn description(&self, _verbose: bool) -> String {
        if self.content.is_empty() {
            "(empty)".to_string()
        } else {
            String::from_utf8_lossy(&self.content).into_owned()
        }
    }
}

impl Encode for Blob {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        encoder.keyed_container().encode_bytes("content", &self.content);
        Ok(())
    }
}

impl Decode for Blob {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        let c = decoder.keyed_container()?;
        Ok(Self::new(c.decode_bytes("content")?))
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// What a tree entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Blob,
    Tree,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named entry in a tree.
///
/// Equality and hashing ignore `object_type`: two entries with the same
/// permissions, id and name are the same entry.
#[derive(Clone, Debug)]
pub struct Entry {
    /// POSIX permission bits (`mode & 0o7777`).
    pub permissions: u32,
    pub object_id: ObjectId,
    pub object_type: EntryKind,
    /// File or directory name (a single path component).
    pub name: String,
}

impl Entry {
    pub fn new(
        permissions: u32,
        object_id: ObjectId,
        object_type: EntryKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            permissions,
            object_id,
            object_type,
            name: name.into(),
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.permissions == other.permissions
            && self.object_id == other.object_id
            && self.name == other.name
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.permissions.hash(state);
        self.object_id.hash(state);
        self.name.hash(state);
    }
}

impl Encode for Entry {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        let mut c = encoder.keyed_container();
        c.encode_u64("permissions", u64::from(self.permissions));
        c.encode_bytes("objectId", self.object_id.as_bytes());
        c.encode_str("objectType", self.object_type.as_str());
        c.encode_str("name", &self.name);
        Ok(())
    }
}

impl Decode for Entry {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        let c = decoder.keyed_container()?;
        let permissions = c.decode_int::<u32>("permissions")?;
        let object_id = decode_id(&c, "objectId", &c.decode_bytes("objectId")?)?;
        let type_name = c.decode_str("objectType")?;
        let object_type = EntryKind::parse(&type_name)
            .ok_or_else(|| c.corrupted(format!("unknown object type {type_name:?}")))?;
        let name = c.decode_str("name")?;
        Ok(Self {
            permissions,
            object_id,
            object_type,
            name,
        })
    }
}

/// Directory listing object (analogous to git tree).
///
/// Entries are unique by name and kept sorted by name (bytewise), which is
/// the order they are hashed and encoded in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<Entry>,
}

impl Tree {
    /// Build a tree, sorting entries by name.
    ///
    /// Fails with [`StoreError::DuplicateEntry`] if two entries share a name.
    pub fn new(mut entries: Vec<Entry>) -> StoreResult<Self> {
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        if let Some(pair) = entries.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(StoreError::DuplicateEntry(pair[0].name.clone()));
        }
        Ok(Self { entries })
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries
            .binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `H("tree" || Σ name || id || type || permissions as i64 LE)`.
    pub fn id(&self) -> ObjectId {
        let mut preimage = ContentHasher::TREE.preimage();
        for entry in &self.entries {
            preimage
                .push(entry.name.as_bytes())
                .push(entry.object_id.as_bytes())
                .push(entry.object_type.as_str().as_bytes())
                .push_i64(i64::from(entry.permissions));
        }
        preimage.finish()
    }

    pub fn kind(&self) -> ObjectKind {
        ObjectKind::Tree
    }

    /// One `perm\ttype\tid\tname` line per entry.
    pub fn description(&self, _verbose: bool) -> String {
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "{:o}\t{}\t{}\t{}\n",
                    e.permissions, e.object_type, e.object_id, e.name
                )
            })
            .collect()
    }
}

impl Encode for Tree {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        encoder.keyed_container().encode("entries", &self.entries)
    }
}

impl Decode for Tree {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut c = decoder.keyed_container()?;
        let entries: Vec<Entry> = c.decode("entries")?;
        Tree::new(entries).map_err(|e| c.corrupted(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Who made a commit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

impl Encode for Author {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        let mut c = encoder.keyed_container();
        c.encode_str("name", &self.name);
        c.encode_str("email", &self.email);
        Ok(())
    }
}

impl Decode for Author {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        let c = decoder.keyed_container()?;
        Ok(Self {
            name: c.decode_str("name")?,
            email: c.decode_str("email")?,
        })
    }
}

/// A snapshot of the working tree with authorship and history.
///
/// When a [`SigningContext`] is present in the codec's user info, encoding
/// signs the commit id and decoding verifies any stored signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub parent_id: Option<ObjectId>,
    pub author: Author,
    /// Creation time, whole seconds.
    pub created_at: DateTime<Utc>,
    pub tree_id: ObjectId,
    pub message: String,
    /// Detached signature over the 20 id bytes. Not part of the id.
    pub signature: Option<Vec<u8>>,
}

impl Commit {
    /// Build an unsigned commit. `created_at` is truncated to seconds.
    pub fn new(
        parent_id: Option<ObjectId>,
        author: Author,
        created_at: DateTime<Utc>,
        tree_id: ObjectId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            parent_id,
            author,
            created_at: created_at.with_nanosecond(0).unwrap_or(created_at),
            tree_id,
            message: message.into(),
            signature: None,
        }
    }

    /// `H("commit" || parent? || name || email || created_at || tree || message)`.
    pub fn id(&self) -> ObjectId {
        let mut preimage = ContentHasher::COMMIT.preimage();
        if let Some(parent) = &self.parent_id {
            preimage.push(parent.as_bytes());
        }
        preimage
            .push(self.author.name.as_bytes())
            .push(self.author.email.as_bytes())
            .push_i64(self.created_at.timestamp())
            .push(self.tree_id.as_bytes())
            .push(self.message.as_bytes());
        preimage.finish()
    }

    pub fn kind(&self) -> ObjectKind {
        ObjectKind::Commit
    }

    pub fn description(&self, verbose: bool) -> String {
        let mut out = format!("commit: {}\n", self.id());
        if verbose {
            out.push_str(&format!("Tree: {}\n", self.tree_id));
            match &self.parent_id {
                Some(parent) => out.push_str(&format!("Parent: {parent}\n")),
                None => out.push_str("Parent: (no parent)\n"),
            }
        }
        out.push_str(&format!("Author: {}\n", self.author));
        out.push_str(&format!(
            "Date: {}\n\n",
            self.created_at.format("%a %b %e %H:%M:%S %Y %z")
        ));
        for line in self.message.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl Encode for Commit {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        let signing = encoder.user_info().get::<SigningContext>().cloned();
        let slot = {
            let mut c = encoder.keyed_container();
            if let Some(parent) = &self.parent_id {
                c.encode_str("parentId", &parent.to_hex());
            }
            c.encode("author", &self.author)?;
            c.encode_i64("createdAt", self.created_at.timestamp());
            c.encode_str("treeId", &self.tree_id.to_hex());
            c.encode_str("message", &self.message);
            match (&signing, &self.signature) {
                (Some(_), _) => Some(c.defer("signature")),
                (None, Some(signature)) => {
                    c.encode_bytes("signature", signature);
                    None
                }
                (None, None) => None,
            }
        };
        if let (Some(mut slot), Some(ctx)) = (slot, signing) {
            let id = self.id();
            let signature = ctx
                .sign(id.as_bytes())
                .map_err(|e| encoder.invalid_value(format!("signing commit {id}: {e}")))?;
            slot.single_value_container().encode_bytes(&signature);
            slot.finish(encoder)?;
        }
        Ok(())
    }
}

impl Decode for Commit {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut c = decoder.keyed_container()?;
        let parent_id = match c.decode_if_present::<String>("parentId")? {
            Some(hex) => Some(decode_hex_id(&c, "parentId", &hex)?),
            None => None,
        };
        let author = c.decode("author")?;
        let seconds = c.decode_i64("createdAt")?;
        let created_at = DateTime::<Utc>::from_timestamp(seconds, 0)
            .ok_or_else(|| c.corrupted(format!("createdAt {seconds} is out of range")))?;
        let tree_id = decode_hex_id(&c, "treeId", &c.decode_str("treeId")?)?;
        let message = c.decode_str("message")?;
        let signature = c
            .decode_if_present::<Bytes>("signature")?
            .map(Bytes::into_inner);

        let commit = Self {
            parent_id,
            author,
            created_at,
            tree_id,
            message,
            signature,
        };

        if let (Some(ctx), Some(signature)) =
            (c.user_info().get::<SigningContext>(), &commit.signature)
        {
            let id = commit.id();
            let valid = ctx.verify(id.as_bytes(), signature).map_err(|e| {
                c.corrupted(format!(
                    "unreadable signature on commit {id} ({e}), tampering suspected"
                ))
            })?;
            if !valid {
                return Err(c.corrupted(format!(
                    "signature does not match commit {id}, tampering suspected"
                )));
            }
        }
        Ok(commit)
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// Any stored object.
///
/// Encoded as `{ "type": kind, "object": body }` so a reader can tell
/// what it holds before decoding the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            Self::Blob(b) => b.id(),
            Self::Tree(t) => t.id(),
            Self::Commit(c) => c.id(),
        }
    }

    pub fn description(&self, verbose: bool) -> String {
        match self {
            Self::Blob(b) => b.description(verbose),
            Self::Tree(t) => t.description(verbose),
            Self::Commit(c) => c.description(verbose),
        }
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Self::Tree(tree)
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Self::Commit(commit)
    }
}

impl Encode for Object {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        let mut c = encoder.keyed_container();
        c.encode_str("type", self.kind().as_str());
        match self {
            Self::Blob(b) => c.encode("object", b),
            Self::Tree(t) => c.encode("object", t),
            Self::Commit(commit) => c.encode("object", commit),
        }
    }
}

impl Decode for Object {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut c = decoder.keyed_container()?;
        let type_name = c.decode_str("type")?;
        match ObjectKind::parse(&type_name) {
            Some(ObjectKind::Blob) => c.decode("object").map(Self::Blob),
            Some(ObjectKind::Tree) => c.decode("object").map(Self::Tree),
            Some(ObjectKind::Commit) => c.decode("object").map(Self::Commit),
            None => Err(c.corrupted(format!("unknown object type {type_name:?}"))),
        }
    }
}
