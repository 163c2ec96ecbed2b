//! Codec implementations for the BMXt container.
//!
//! Only zstd is implemented; the gzip and lz4 tags are reserved in the
//! format. The two resolvers mirror the two directions a tag is met in:
//! [`reader_codec`] answers "this file's header declares tag X" (a reserved
//! tag means the file cannot be read — corrupt from the reader's point of
//! view), while [`writer_codec`] answers "the caller asked to write with
//! tag X" (a reserved tag is a caller error).

mod zstd_codec;

pub use zstd_codec::ZstdCodec;

use std::sync::Arc;

use biomxt_core::error::{Error, Result};
use biomxt_core::types::CompressAlgorithm;
use biomxt_core::Codec;

/// Resolve the codec for reading a file whose header declares `algo`.
pub fn reader_codec(algo: CompressAlgorithm) -> Result<Arc<dyn Codec>> {
    match algo {
        CompressAlgorithm::Zstd => Ok(Arc::new(ZstdCodec::default())),
        other => Err(Error::Corrupt(format!(
            "compression algorithm [{other}] is reserved and not implemented"
        ))),
    }
}

/// Resolve the codec for writing a new file with `algo`.
pub fn writer_codec(algo: CompressAlgorithm, zstd_level: i32) -> Result<Box<dyn Codec>> {
    match algo {
        CompressAlgorithm::Zstd => Ok(Box::new(ZstdCodec::new(zstd_level))),
        other => Err(Error::BadArgument(format!(
            "compression algorithm [{other}] is not supported for writing"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zstd_resolves_for_both_directions() {
        assert_eq!(
            reader_codec(CompressAlgorithm::Zstd).unwrap().algo(),
            CompressAlgorithm::Zstd
        );
        assert_eq!(
            writer_codec(CompressAlgorithm::Zstd, 3).unwrap().name(),
            "zstd"
        );
    }

    #[test]
    fn reserved_tags_fail_by_direction() {
        for algo in [CompressAlgorithm::Gzip, CompressAlgorithm::Lz4] {
            assert!(matches!(reader_codec(algo), Err(Error::Corrupt(_))));
            assert!(matches!(
                writer_codec(algo, 3),
                Err(Error::BadArgument(_))
            ));
        }
    }
}
