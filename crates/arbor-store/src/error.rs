use arbor_codec::CodecError;
use arbor_types::ObjectId;

/// Errors from the object model and object store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The stored bytes could not be decompressed, decoded or verified.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A tree was built with two entries of the same name.
    #[error("duplicate tree entry: {0}")]
    DuplicateEntry(String),

    /// Encoding an object failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The compressor rejected its input.
    #[error("compression error: {0}")]
    Compression(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
