//! Compression seam between the container format and the codec bindings.
//!
//! The trait lives here so the converter and reader can be written against
//! it; the concrete implementations live in `biomxt_codecs`.

use crate::error::Result;
use crate::types::CompressAlgorithm;

/// A per-block compressor.
///
/// Blocks must compress and decompress independently — no cross-block state.
/// That invariant is what makes single-block random access possible.
pub trait Codec: Send + Sync {
    /// The tag recorded in the file header.
    fn algo(&self) -> CompressAlgorithm;

    /// Display name for logs and CLI output.
    fn name(&self) -> &'static str {
        self.algo().name()
    }

    /// Compress a single independent block.
    fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>>;

    /// Decompress a single independent block. `raw_size` is the exact
    /// decompressed length recorded in the block's index entry; producing a
    /// different length is a corruption error at the call site.
    fn decompress_block(&self, compressed: &[u8], raw_size: usize) -> Result<Vec<u8>>;
}
