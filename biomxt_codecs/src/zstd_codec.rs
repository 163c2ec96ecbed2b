use biomxt_core::error::{Error, Result};
use biomxt_core::types::CompressAlgorithm;
use biomxt_core::Codec;

/// Zstandard block codec, the format's primary compressor.
///
/// Each block is compressed independently at the configured level
/// (default 3), so any block can be decompressed without touching its
/// neighbours.
pub struct ZstdCodec {
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        ZstdCodec { level: 3 }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        ZstdCodec { level }
    }
}

impl Codec for ZstdCodec {
    fn algo(&self) -> CompressAlgorithm {
        CompressAlgorithm::Zstd
    }

    fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(raw, self.level).map_err(Error::Io)
    }

    fn decompress_block(&self, compressed: &[u8], raw_size: usize) -> Result<Vec<u8>> {
        // The index entry records the exact decompressed size, so it doubles
        // as the output capacity.
        zstd::bulk::decompress(compressed, raw_size)
            .map_err(|e| Error::Corrupt(format!("zstd decompression failed [{e}]")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_roundtrip() {
        let codec = ZstdCodec::default();
        let raw: Vec<u8> = (0..512u32).flat_map(|v| v.to_le_bytes()).collect();
        let compressed = codec.compress_block(&raw).unwrap();
        let decompressed = codec.decompress_block(&compressed, raw.len()).unwrap();
        assert_eq!(decompressed, raw);
    }

    #[test]
    fn garbage_input_is_corrupt() {
        let codec = ZstdCodec::default();
        let err = codec.decompress_block(b"definitely not zstd", 64).unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }
}
