//! On-disk format primitives for BMXt files.
//!
//! The wire format is fixed little-endian. Every structure is packed by
//! explicit byte slicing — no `repr(C)` memcpy — so the layout below is the
//! layout on disk, on every host.
//!
//! File layout:
//!
//! ```text
//! [HEADER: 64 bytes]
//! [BLOCK 0] [BLOCK 1] ... [BLOCK N-1]     ← independently compressed tiles,
//!                                            in block-index order
//! [row label bytes][column label bytes]   ← raw, not length-prefixed
//! [BLOCK TABLE: 16 bytes × N]             @ header.block_table_offset
//! [NAME TABLE: 16 bytes × (nrow + ncol)]  @ header.name_table_offset
//! ```
//!
//! The header is written last, after both table offsets are known.

use std::fmt;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{CompressAlgorithm, DataType};

/// Magic bytes at offset 0 of every BMXt file.
pub const MAGIC: &[u8; 4] = b"BMXt";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Fixed size of the file header in bytes.
///   magic[4] + version:u16 + cell_type:u8 + compression:u8
///   + nrow:u32 + ncol:u32 + block_width:u32 + block_height:u32
///   + block_count:u32 + padding:u32 + block_table_offset:u64
///   + name_table_offset:u64 + uuid[16]
///   = 4 + 2 + 1 + 1 + 4 + 4 + 4 + 4 + 4 + 4 + 8 + 8 + 16 = 64
pub const HEADER_SIZE: u64 = 64;

/// Size of each packed [`IndexEntry`] in bytes.
///   offset:u64 + stored_size:u32 + raw_size:u32 = 16
pub const INDEX_ENTRY_SIZE: u64 = 16;

// ── File identifier ────────────────────────────────────────────────────────

/// Per-file 128-bit identifier (version-4 UUID), generated at conversion
/// time. Its only job is to disambiguate cache keys when one [`BlockCache`]
/// is shared by readers over multiple files.
///
/// [`BlockCache`]: crate::cache::BlockCache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileId([u8; 16]);

impl FileId {
    /// Generate a fresh random identifier (UUID version 4, variant 1).
    pub fn generate() -> Self {
        FileId(*Uuid::new_v4().as_bytes())
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        FileId(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// The identifier as two little-endian 64-bit words (low, high), used by
    /// the block-key hash combine.
    pub fn words(&self) -> (u64, u64) {
        let mut lo = [0u8; 8];
        let mut hi = [0u8; 8];
        lo.copy_from_slice(&self.0[..8]);
        hi.copy_from_slice(&self.0[8..]);
        (u64::from_le_bytes(lo), u64::from_le_bytes(hi))
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            write!(f, "{byte:02x}")?;
            if matches!(i, 3 | 5 | 7 | 9) {
                f.write_str("-")?;
            }
        }
        Ok(())
    }
}

// ── Index entry ────────────────────────────────────────────────────────────

/// Locates one byte run in the file: a compressed block or a label.
///
/// For blocks, `raw_size` is the decompressed length
/// (`actual_width · actual_height · cell size`), which also distinguishes
/// clipped edge tiles from interior tiles. For labels, `stored_size` and
/// `raw_size` are both the label's byte length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: u64,
    pub stored_size: u32,
    pub raw_size: u32,
}

impl IndexEntry {
    /// Serialize to exactly `INDEX_ENTRY_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; INDEX_ENTRY_SIZE as usize] {
        let mut buf = [0u8; INDEX_ENTRY_SIZE as usize];
        buf[0..8].copy_from_slice(&self.offset.to_le_bytes());
        buf[8..12].copy_from_slice(&self.stored_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.raw_size.to_le_bytes());
        buf
    }

    /// Deserialize from `INDEX_ENTRY_SIZE` bytes.
    pub fn from_bytes(buf: &[u8; INDEX_ENTRY_SIZE as usize]) -> Self {
        let mut offset = [0u8; 8];
        let mut stored = [0u8; 4];
        let mut raw = [0u8; 4];
        offset.copy_from_slice(&buf[0..8]);
        stored.copy_from_slice(&buf[8..12]);
        raw.copy_from_slice(&buf[12..16]);
        IndexEntry {
            offset: u64::from_le_bytes(offset),
            stored_size: u32::from_le_bytes(stored),
            raw_size: u32::from_le_bytes(raw),
        }
    }
}

// ── File header ────────────────────────────────────────────────────────────

/// Decoded representation of the 64-byte BMXt file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHeader {
    pub version: u16,
    pub cell_type: DataType,
    pub compression: CompressAlgorithm,
    pub nrow: u32,
    pub ncol: u32,
    pub block_width: u32,
    pub block_height: u32,
    pub block_count: u32,
    pub block_table_offset: u64,
    pub name_table_offset: u64,
    pub uuid: FileId,
}

impl FileHeader {
    /// Serialize to exactly `HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6] = self.cell_type.tag();
        buf[7] = self.compression.tag();
        buf[8..12].copy_from_slice(&self.nrow.to_le_bytes());
        buf[12..16].copy_from_slice(&self.ncol.to_le_bytes());
        buf[16..20].copy_from_slice(&self.block_width.to_le_bytes());
        buf[20..24].copy_from_slice(&self.block_height.to_le_bytes());
        buf[24..28].copy_from_slice(&self.block_count.to_le_bytes());
        // buf[28..32] = padding, stays zero
        buf[32..40].copy_from_slice(&self.block_table_offset.to_le_bytes());
        buf[40..48].copy_from_slice(&self.name_table_offset.to_le_bytes());
        buf[48..64].copy_from_slice(self.uuid.as_bytes());
        buf
    }

    /// Deserialize from `HEADER_SIZE` bytes, validating magic and tags.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE as usize]) -> Result<Self> {
        if &buf[0..4] != MAGIC {
            return Err(Error::Corrupt(format!(
                "bad magic [{}]",
                String::from_utf8_lossy(&buf[0..4])
            )));
        }

        let cell_type = match DataType::from_tag(buf[6]) {
            Some(DataType::Unknown) | None => {
                return Err(Error::Corrupt(format!("unknown cell type tag [{}]", buf[6])));
            }
            Some(dtype) => dtype,
        };
        let compression = CompressAlgorithm::from_tag(buf[7]).ok_or_else(|| {
            Error::Corrupt(format!("unknown compression tag [{}]", buf[7]))
        })?;

        let mut version = [0u8; 2];
        version.copy_from_slice(&buf[4..6]);
        let mut u32_buf = [0u8; 4];
        let mut u64_buf = [0u8; 8];
        let mut read_u32 = |range: std::ops::Range<usize>| {
            u32_buf.copy_from_slice(&buf[range]);
            u32::from_le_bytes(u32_buf)
        };
        let nrow = read_u32(8..12);
        let ncol = read_u32(12..16);
        let block_width = read_u32(16..20);
        let block_height = read_u32(20..24);
        let block_count = read_u32(24..28);
        let mut read_u64 = |range: std::ops::Range<usize>| {
            u64_buf.copy_from_slice(&buf[range]);
            u64::from_le_bytes(u64_buf)
        };
        let block_table_offset = read_u64(32..40);
        let name_table_offset = read_u64(40..48);
        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&buf[48..64]);

        Ok(FileHeader {
            version: u16::from_le_bytes(version),
            cell_type,
            compression,
            nrow,
            ncol,
            block_width,
            block_height,
            block_count,
            block_table_offset,
            name_table_offset,
            uuid: FileId::from_bytes(uuid),
        })
    }

    /// Number of block columns: ⌈ncol / block_width⌉.
    pub fn blocks_per_row(&self) -> u32 {
        self.ncol.div_ceil(self.block_width)
    }

    /// Number of block rows: ⌈nrow / block_height⌉.
    pub fn blocks_per_column(&self) -> u32 {
        self.nrow.div_ceil(self.block_height)
    }

    /// Width in cells of the block in grid column `bx`, clipped at the right
    /// edge of the matrix.
    pub fn actual_block_width(&self, bx: u32) -> u32 {
        self.block_width.min(self.ncol - bx * self.block_width)
    }

    /// Height in cells of the block in grid row `by`, clipped at the bottom
    /// edge of the matrix.
    pub fn actual_block_height(&self, by: u32) -> u32 {
        self.block_height.min(self.nrow - by * self.block_height)
    }

    /// Width of one cell in bytes.
    pub fn cell_size(&self) -> usize {
        self.cell_type.size_in_bytes()
    }
}
