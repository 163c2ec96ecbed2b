//! Core of the BMXt matrix container format.
//!
//! A BMXt file stores a labelled numeric matrix as a grid of fixed-size
//! rectangular tiles ("blocks"), each compressed independently, so both full
//! rows and full columns can be materialised by touching only one stripe of
//! blocks. This crate provides:
//!
//! - the packed little-endian format primitives ([`format`]),
//! - the cell-type and compression-tag registries ([`types`]),
//! - the streaming text-to-BMXt converter ([`convert`]),
//! - the shared bounded-memory LRU block cache ([`cache`]),
//! - the random-access reader ([`reader`]) and typed cell views ([`cells`]).
//!
//! Concrete compression codecs live in `biomxt_codecs`; this crate only
//! defines the [`Codec`] seam.

pub mod cache;
pub mod cells;
pub mod codec;
pub mod convert;
pub mod delim;
pub mod error;
pub mod format;
pub mod reader;
pub mod types;

pub use cache::{BlockCache, BlockKey};
pub use cells::CellSlice;
pub use codec::Codec;
pub use convert::{convert, convert_dynamic, ConvertOptions};
pub use error::{Error, Result};
pub use format::{FileHeader, FileId, IndexEntry, HEADER_SIZE, MAGIC};
pub use reader::MatrixFile;
pub use types::{Cell, CompressAlgorithm, DataType};
