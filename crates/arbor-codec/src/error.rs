use std::fmt::Write as _;

/// One step of a coding path: a map key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    Key(String),
    Index(usize),
}

/// Render a coding path as `entries[2].name`, or `<root>` when empty.
pub fn render_path(path: &[PathKey]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    let mut out = String::new();
    for (i, key) in path.iter().enumerate() {
        match key {
            PathKey::Key(k) if i == 0 => out.push_str(k),
            PathKey::Key(k) => {
                out.push('.');
                out.push_str(k);
            }
            PathKey::Index(n) => {
                let _ = write!(out, "[{n}]");
            }
        }
    }
    out
}

/// Errors produced while encoding or decoding.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CodecError {
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("key {key:?} not found at {path}")]
    KeyNotFound { path: String, key: String },

    #[error("no value at {path}: {reason}")]
    ValueNotFound { path: String, reason: String },

    #[error("number at {path} does not fit in {target}")]
    NumberOutOfRange { path: String, target: &'static str },

    #[error("data corrupted at {path}: {reason}")]
    DataCorrupted { path: String, reason: String },

    #[error("cannot encode value at {path}: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("deferred value at {path} was never finished")]
    UnresolvedReference { path: String },

    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("invalid marker 0x{marker:02x} at offset {offset}")]
    InvalidMarker { marker: u8, offset: usize },

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("{count} trailing bytes after the top-level value")]
    TrailingBytes { count: usize },

    #[error("nesting deeper than {max} levels")]
    DepthLimitExceeded { max: usize },

    #[error("{len} elements is too large to encode")]
    TooLarge { len: usize },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
