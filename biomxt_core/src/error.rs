//! Error types for BMXt operations.

use std::io;
use thiserror::Error;

/// Errors surfaced by the converter, cache, and reader.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-side misuse: invalid block dimensions, unsupported cell type or
    /// compression tag at dispatch, mismatched codec, empty buffers.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Unknown row or column label.
    #[error("not found: {0}")]
    NotFound(String),

    /// Row, column, or block index beyond its bound.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// The file on disk cannot be a valid BMXt file: bad magic, truncated
    /// regions, table offsets beyond the file end, decompression failures.
    #[error("corrupted file: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed input during conversion. `line` is the 1-based line number
    /// in the source file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("file has been closed")]
    Closed,
}

/// Result type for BMXt operations.
pub type Result<T> = std::result::Result<T, Error>;
