use crate::error::{StoreError, StoreResult};

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Byte-level compression applied to encoded objects before they hit disk.
///
/// Every implementation can read what any other wrote: input that starts
/// with the zstd frame magic is inflated, anything else is returned as is.
/// Encoded objects always start with a MessagePack map marker, so the two
/// never collide.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        inflate(data)
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

fn inflate(data: &[u8]) -> StoreResult<Vec<u8>> {
    if data.starts_with(&ZSTD_MAGIC) {
        zstd::stream::decode_all(data).map_err(|e| StoreError::Compression(e.to_string()))
    } else {
        Ok(data.to_vec())
    }
}

/// zstd at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub const DEFAULT_LEVEL: i32 = 3;

    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEVEL)
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        zstd::stream::encode_all(data, self.level).map_err(|e| StoreError::Compression(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "zstd"
    }
}

/// Stores encoded bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl Compressor for NoCompression {
    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Pick a compressor for a configured level; `0` disables compression.
pub fn compressor_for_level(level: i32) -> Box<dyn Compressor> {
    if level == 0 {
        Box::new(NoCompression)
    } else {
        Box::new(ZstdCompressor::new(level))
    }
}
