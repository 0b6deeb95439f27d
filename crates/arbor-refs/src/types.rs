//! Core reference types.
//!
//! A [`Reference`] is anything a user can name on the command line: `HEAD`,
//! a branch, a tag, a full or partial commit id, or text that has not been
//! classified yet. Resolution turns one into another until a full commit id
//! is reached.

use std::fmt;

use arbor_types::{ObjectId, ID_HEX_LEN};

/// Prefix of every branch ref name.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Prefix of every tag ref name.
pub const TAGS_PREFIX: &str = "refs/tags/";

/// A reference in some stage of resolution.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reference {
    /// Raw text that has not been classified yet.
    Unknown(String),
    /// The `HEAD` pointer.
    Head,
    /// A branch, by short name.
    Branch(String),
    /// A tag, by short name.
    Tag(String),
    /// A full or partial commit id in hex.
    Commit(String),
}

impl Reference {
    /// Wrap raw user input for resolution.
    pub fn unknown(text: impl Into<String>) -> Self {
        Reference::Unknown(text.into())
    }

    /// The fully qualified name: `HEAD`, `refs/heads/x`, `refs/tags/x`, the
    /// commit id, or the raw text.
    pub fn fully_qualified_name(&self) -> String {
        match self {
            Reference::Unknown(text) => text.clone(),
            Reference::Head => "HEAD".to_string(),
            Reference::Branch(name) => format!("{HEADS_PREFIX}{name}"),
            Reference::Tag(name) => format!("{TAGS_PREFIX}{name}"),
            Reference::Commit(id) => id.clone(),
        }
    }

    pub fn is_head(&self) -> bool {
        matches!(self, Reference::Head)
    }

    pub fn branch(&self) -> Option<&str> {
        match self {
            Reference::Branch(name) => Some(name),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Reference::Tag(name) => Some(name),
            _ => None,
        }
    }

    /// The commit id text, full or partial.
    pub fn commit(&self) -> Option<&str> {
        match self {
            Reference::Commit(id) => Some(id),
            _ => None,
        }
    }

    /// The parsed commit id if this is a fully spelled-out commit reference.
    pub fn commit_id(&self) -> Option<ObjectId> {
        self.commit()
            .filter(|id| id.len() == ID_HEX_LEN)
            .and_then(|id| ObjectId::from_hex(id).ok())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fully_qualified_name())
    }
}

impl From<&str> for Reference {
    fn from(text: &str) -> Self {
        Reference::Unknown(text.to_string())
    }
}

impl From<ObjectId> for Reference {
    fn from(id: ObjectId) -> Self {
        Reference::Commit(id.to_hex())
    }
}

/// The two kinds of named ref stored on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefKind {
    Branch,
    Tag,
}

impl RefKind {
    /// Directory under `refs/` holding refs of this kind.
    pub fn dir(self) -> &'static str {
        match self {
            RefKind::Branch => "heads",
            RefKind::Tag => "tags",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            RefKind::Branch => HEADS_PREFIX,
            RefKind::Tag => TAGS_PREFIX,
        }
    }

    /// The [`Reference`] naming the ref `name` of this kind.
    pub fn reference(self, name: &str) -> Reference {
        match self {
            RefKind::Branch => Reference::Branch(name.to_string()),
            RefKind::Tag => Reference::Tag(name.to_string()),
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKind::Branch => write!(f, "branch"),
            RefKind::Tag => write!(f, "tag"),
        }
    }
}

/// The state of `HEAD`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Head {
    /// HEAD names a branch (e.g. `master`).
    Symbolic(String),
    /// HEAD points directly at a commit.
    Detached(ObjectId),
}

impl Head {
    /// Interpret the contents of a HEAD file.
    ///
    /// `refs/heads/<name>` is symbolic, a 40 digit hex id is detached.
    /// Anything else (including an empty file) is `None`.
    pub fn parse(contents: &str) -> Option<Head> {
        let contents = contents.trim();
        if let Some(name) = contents.strip_prefix(HEADS_PREFIX) {
            return (!name.is_empty()).then(|| Head::Symbolic(name.to_string()));
        }
        if contents.len() == ID_HEX_LEN {
            return ObjectId::from_hex(contents).ok().map(Head::Detached);
        }
        None
    }

    /// The text written to the HEAD file.
    pub fn contents(&self) -> String {
        match self {
            Head::Symbolic(branch) => format!("{HEADS_PREFIX}{branch}"),
            Head::Detached(id) => id.to_hex(),
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Head::Detached(_))
    }

    /// Branch name if HEAD is symbolic.
    pub fn branch(&self) -> Option<&str> {
        match self {
            Head::Symbolic(name) => Some(name),
            Head::Detached(_) => None,
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Head::Symbolic(name) => write!(f, "{name}"),
            Head::Detached(id) => write!(f, "detached at {}", id.short_hex()),
        }
    }
}
