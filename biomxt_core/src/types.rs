//! Cell-type and compression-tag registries.
//!
//! Pure lookup: tag ⇄ name ⇄ byte width, plus the compile-time mapping from
//! a host numeric type to its on-disk tag via the [`Cell`] trait. Nothing in
//! this module allocates.

use std::fmt;
use std::num::IntErrorKind;

use thiserror::Error;

/// Numeric type of every cell in a matrix, recorded in the file header.
///
/// `Unknown` is the sentinel returned by [`DataType::from_name`] for
/// unrecognised names; it is never valid in a file read back from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Unknown = 0,
    Int16 = 1,
    Int32 = 2,
    Int64 = 3,
    Float32 = 4,
    Float64 = 5,
}

impl DataType {
    /// The on-disk header tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Decode a header tag. `None` for tags outside the known range.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DataType::Unknown),
            1 => Some(DataType::Int16),
            2 => Some(DataType::Int32),
            3 => Some(DataType::Int64),
            4 => Some(DataType::Float32),
            5 => Some(DataType::Float64),
            _ => None,
        }
    }

    /// Width of one cell in bytes. Zero for `Unknown`.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::Unknown => 0,
            DataType::Int16 => 2,
            DataType::Int32 => 4,
            DataType::Int64 => 8,
            DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Unknown => "unknown",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    /// Parse a display name. `"float"` and `"double"` are accepted as
    /// aliases; anything unrecognised yields the `Unknown` sentinel.
    pub fn from_name(name: &str) -> Self {
        match name {
            "int16" => DataType::Int16,
            "int32" => DataType::Int32,
            "int64" => DataType::Int64,
            "float32" | "float" => DataType::Float32,
            "float64" | "double" => DataType::Float64,
            _ => DataType::Unknown,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-block compression algorithm, recorded in the file header.
///
/// Only `Zstd` is implemented; the `Gzip` and `Lz4` tags are reserved in the
/// format. Writing with a reserved tag is a `BadArgument`; reading a file
/// that declares one is a `Corrupt` error (see `biomxt_codecs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressAlgorithm {
    Zstd = 0,
    Gzip = 1,
    Lz4 = 2,
}

impl CompressAlgorithm {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CompressAlgorithm::Zstd),
            1 => Some(CompressAlgorithm::Gzip),
            2 => Some(CompressAlgorithm::Lz4),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressAlgorithm::Zstd => "zstd",
            CompressAlgorithm::Gzip => "gzip",
            CompressAlgorithm::Lz4 => "lz4",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "zstd" => Some(CompressAlgorithm::Zstd),
            "gzip" => Some(CompressAlgorithm::Gzip),
            "lz4" => Some(CompressAlgorithm::Lz4),
            _ => None,
        }
    }
}

impl fmt::Display for CompressAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a text field failed to convert to a cell value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CellError {
    #[error("invalid {0} value '{1}'")]
    Invalid(DataType, String),
    #[error("value '{1}' out of range for {0}")]
    OutOfRange(DataType, String),
}

/// A host numeric type usable as a matrix cell.
///
/// Implemented for exactly `i16`, `i32`, `i64`, `f32`, and `f64` — the five
/// types the format supports. Cells are stored little-endian on disk.
pub trait Cell: Copy + Default + PartialEq + Send + Sync + 'static {
    /// The header tag for this type.
    const DATA_TYPE: DataType;

    /// Width of one encoded cell in bytes.
    const SIZE: usize;

    /// Parse a text field. Integer overflow reports `CellError::OutOfRange`
    /// rather than a generic parse failure.
    fn parse(field: &str) -> std::result::Result<Self, CellError>;

    /// Encode into `dst[..Self::SIZE]` (little-endian).
    fn write_le(self, dst: &mut [u8]);

    /// Decode from `src[..Self::SIZE]` (little-endian).
    fn read_le(src: &[u8]) -> Self;
}

macro_rules! int_cell {
    ($ty:ty, $dtype:expr) => {
        impl Cell for $ty {
            const DATA_TYPE: DataType = $dtype;
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn parse(field: &str) -> std::result::Result<Self, CellError> {
                field.parse::<$ty>().map_err(|e| match e.kind() {
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                        CellError::OutOfRange(Self::DATA_TYPE, field.to_string())
                    }
                    _ => CellError::Invalid(Self::DATA_TYPE, field.to_string()),
                })
            }

            fn write_le(self, dst: &mut [u8]) {
                dst[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }

            fn read_le(src: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(&src[..Self::SIZE]);
                Self::from_le_bytes(buf)
            }
        }
    };
}

macro_rules! float_cell {
    ($ty:ty, $dtype:expr) => {
        impl Cell for $ty {
            const DATA_TYPE: DataType = $dtype;
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn parse(field: &str) -> std::result::Result<Self, CellError> {
                field
                    .parse::<$ty>()
                    .map_err(|_| CellError::Invalid(Self::DATA_TYPE, field.to_string()))
            }

            fn write_le(self, dst: &mut [u8]) {
                dst[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }

            fn read_le(src: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(&src[..Self::SIZE]);
                Self::from_le_bytes(buf)
            }
        }
    };
}

int_cell!(i16, DataType::Int16);
int_cell!(i32, DataType::Int32);
int_cell!(i64, DataType::Int64);
float_cell!(f32, DataType::Float32);
float_cell!(f64, DataType::Float64);
