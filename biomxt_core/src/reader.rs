//! Random-access reader for BMXt files.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{BlockCache, BlockKey, ENTRY_OVERHEAD};
use crate::cells::CellSlice;
use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::format::{FileHeader, IndexEntry, FORMAT_VERSION, HEADER_SIZE, INDEX_ENTRY_SIZE};
use crate::types::Cell;

/// An open BMXt file.
///
/// # Open sequence
/// 1. Read and validate the 64-byte header (magic, version, tags, block
///    geometry, table offsets against the file length).
/// 2. Load the block table into memory and scan it for the largest
///    compressed and decompressed block sizes.
/// 3. Load the name table, then materialise both label vectors and build the
///    label → index maps.
///
/// # Access pattern
/// [`read_block`] consults the shared [`BlockCache`] first and only touches
/// the disk on a miss. [`read_row`] walks one horizontal stripe of blocks,
/// copying one contiguous span per tile; [`read_column`] walks one vertical
/// stripe, gathering one cell per tile row.
///
/// The reader never writes. [`close`] (or drop) releases the file handle and
/// all label state; every data operation afterwards fails with
/// [`Error::Closed`].
///
/// [`read_block`]: MatrixFile::read_block
/// [`read_row`]: MatrixFile::read_row
/// [`read_column`]: MatrixFile::read_column
/// [`close`]: MatrixFile::close
pub struct MatrixFile {
    file: Option<File>,
    header: FileHeader,
    block_table: Vec<IndexEntry>,
    row_names: Vec<String>,
    column_names: Vec<String>,
    row_map: HashMap<String, u32>,
    column_map: HashMap<String, u32>,
    max_compressed_block_size: u32,
    max_uncompressed_block_size: u32,
    codec: Arc<dyn Codec>,
    cache: Arc<BlockCache>,
}

impl std::fmt::Debug for MatrixFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixFile")
            .field("header", &self.header)
            .field("block_table_len", &self.block_table.len())
            .field("row_names_len", &self.row_names.len())
            .field("column_names_len", &self.column_names.len())
            .finish()
    }
}

fn read_exact_or_corrupt(file: &mut File, buf: &mut [u8], what: &str) -> Result<()> {
    file.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Corrupt(format!("short read while reading {what}"))
        } else {
            Error::Io(e)
        }
    })
}

impl MatrixFile {
    /// Open `path` with a cache owned by this reader.
    ///
    /// The owned cache's ceiling is sized to hold one row's worth or one
    /// column's worth of decompressed blocks, whichever is larger.
    pub fn open(path: impl AsRef<Path>, codec: Arc<dyn Codec>) -> Result<Self> {
        Self::open_inner(path.as_ref(), codec, None)
    }

    /// Open `path` against an externally supplied cache, so several readers
    /// can share one memory budget.
    pub fn open_with_cache(
        path: impl AsRef<Path>,
        codec: Arc<dyn Codec>,
        cache: Arc<BlockCache>,
    ) -> Result<Self> {
        Self::open_inner(path.as_ref(), codec, Some(cache))
    }

    fn open_inner(
        path: &Path,
        codec: Arc<dyn Codec>,
        cache: Option<Arc<BlockCache>>,
    ) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();

        if file_len < HEADER_SIZE {
            return Err(Error::Corrupt(format!(
                "file is {file_len} bytes, shorter than the {HEADER_SIZE}-byte header"
            )));
        }
        let mut header_buf = [0u8; HEADER_SIZE as usize];
        read_exact_or_corrupt(&mut file, &mut header_buf, "header")?;
        let header = FileHeader::from_bytes(&header_buf)?;

        if header.version != FORMAT_VERSION {
            return Err(Error::Corrupt(format!(
                "unsupported format version [{}]",
                header.version
            )));
        }
        if header.block_width == 0 || header.block_height == 0 {
            return Err(Error::Corrupt(format!(
                "invalid block geometry [{}x{}]",
                header.block_width, header.block_height
            )));
        }
        if header.compression != codec.algo() {
            return Err(Error::BadArgument(format!(
                "codec mismatch: file uses [{}] but the supplied codec is [{}]",
                header.compression,
                codec.name()
            )));
        }
        if header.block_table_offset >= file_len {
            return Err(Error::Corrupt(format!(
                "block table offset [{}] exceeds file size [{file_len}]",
                header.block_table_offset
            )));
        }
        if header.name_table_offset >= file_len {
            return Err(Error::Corrupt(format!(
                "name table offset [{}] exceeds file size [{file_len}]",
                header.name_table_offset
            )));
        }

        // Block table, plus the largest block sizes for buffer pre-sizing
        // and the owned-cache ceiling.
        file.seek(SeekFrom::Start(header.block_table_offset))?;
        let mut entry_buf = [0u8; INDEX_ENTRY_SIZE as usize];
        let mut block_table = Vec::with_capacity(header.block_count as usize);
        let mut max_compressed_block_size = 0u32;
        let mut max_uncompressed_block_size = 0u32;
        for _ in 0..header.block_count {
            read_exact_or_corrupt(&mut file, &mut entry_buf, "block table")?;
            let entry = IndexEntry::from_bytes(&entry_buf);
            max_compressed_block_size = max_compressed_block_size.max(entry.stored_size);
            max_uncompressed_block_size = max_uncompressed_block_size.max(entry.raw_size);
            block_table.push(entry);
        }

        // Name table: nrow row entries, then ncol column entries.
        file.seek(SeekFrom::Start(header.name_table_offset))?;
        let name_count = header.nrow as usize + header.ncol as usize;
        let mut name_table = Vec::with_capacity(name_count);
        for _ in 0..name_count {
            read_exact_or_corrupt(&mut file, &mut entry_buf, "name table")?;
            name_table.push(IndexEntry::from_bytes(&entry_buf));
        }

        let mut row_names = Vec::with_capacity(header.nrow as usize);
        let mut row_map = HashMap::with_capacity(header.nrow as usize);
        for (i, entry) in name_table[..header.nrow as usize].iter().enumerate() {
            let name = read_label(&mut file, entry)?;
            row_map.insert(name.clone(), i as u32);
            row_names.push(name);
        }
        let mut column_names = Vec::with_capacity(header.ncol as usize);
        let mut column_map = HashMap::with_capacity(header.ncol as usize);
        for (i, entry) in name_table[header.nrow as usize..].iter().enumerate() {
            let name = read_label(&mut file, entry)?;
            column_map.insert(name.clone(), i as u32);
            column_names.push(name);
        }

        let cache = match cache {
            Some(cache) => cache,
            None => {
                // One row's or one column's worth of blocks, whichever is
                // larger. Matrices narrower than one block floor to zero;
                // clamp so at least one block stays cacheable.
                let blocks_per_axis = (header.ncol / header.block_width)
                    .max(header.nrow / header.block_height)
                    .max(1) as usize;
                let limit =
                    blocks_per_axis * (max_uncompressed_block_size as usize + ENTRY_OVERHEAD);
                Arc::new(BlockCache::with_memory_limit(limit))
            }
        };

        debug!(
            uuid = %header.uuid,
            nrow = header.nrow,
            ncol = header.ncol,
            blocks = header.block_count,
            codec = codec.name(),
            "opened matrix file"
        );

        Ok(MatrixFile {
            file: Some(file),
            header,
            block_table,
            row_names,
            column_names,
            row_map,
            column_map,
            max_compressed_block_size,
            max_uncompressed_block_size,
            codec,
            cache,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.file.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Decompress block `index` into `buffer`, which is resized to the
    /// block's raw size. Served from the cache when possible; a miss reads
    /// from disk, decompresses, and installs the bytes in the cache.
    pub fn read_block(&mut self, index: u32, buffer: &mut Vec<u8>) -> Result<()> {
        let file = self.file.as_mut().ok_or(Error::Closed)?;
        if index >= self.header.block_count {
            return Err(Error::OutOfRange(format!(
                "block index [{index}] exceeds block count [{}]",
                self.header.block_count
            )));
        }

        let entry = self.block_table[index as usize];
        let raw_size = entry.raw_size as usize;
        buffer.resize(raw_size, 0);

        let key = BlockKey {
            file_id: self.header.uuid,
            block_index: index,
        };
        if self.cache.get_block_data(&key, buffer, 0, raw_size) {
            return Ok(());
        }

        file.seek(SeekFrom::Start(entry.offset))?;
        let mut compressed = vec![0u8; entry.stored_size as usize];
        read_exact_or_corrupt(file, &mut compressed, "block data")?;

        let raw = self.codec.decompress_block(&compressed, raw_size)?;
        if raw.len() != raw_size {
            return Err(Error::Corrupt(format!(
                "block [{index}] decompressed to [{}] bytes, expected [{raw_size}]",
                raw.len()
            )));
        }
        buffer.copy_from_slice(&raw);
        self.cache.insert(key, raw);
        Ok(())
    }

    /// Materialise row `row_index` into `buffer` (`ncol · cell size` bytes).
    pub fn read_row(&mut self, row_index: u32, buffer: &mut Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        if row_index >= self.header.nrow {
            return Err(Error::OutOfRange(format!(
                "row index [{row_index}] exceeds row count [{}]",
                self.header.nrow
            )));
        }

        let cell = self.header.cell_size();
        buffer.resize(self.header.ncol as usize * cell, 0);

        let by = row_index / self.header.block_height;
        let row_in_tile = (row_index % self.header.block_height) as usize;
        let blocks_per_row = self.header.blocks_per_row();

        let mut block_buf = Vec::new();
        for bx in 0..blocks_per_row {
            self.read_block(by * blocks_per_row + bx, &mut block_buf)?;
            let actual_width = self.header.actual_block_width(bx) as usize;

            // One row of a tile is contiguous in the decompressed block.
            let src = row_in_tile * actual_width * cell;
            let dst = bx as usize * self.header.block_width as usize * cell;
            buffer[dst..dst + actual_width * cell]
                .copy_from_slice(&block_buf[src..src + actual_width * cell]);
        }
        Ok(())
    }

    /// Materialise column `column_index` into `buffer` (`nrow · cell size`
    /// bytes).
    pub fn read_column(&mut self, column_index: u32, buffer: &mut Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        if column_index >= self.header.ncol {
            return Err(Error::OutOfRange(format!(
                "column index [{column_index}] exceeds column count [{}]",
                self.header.ncol
            )));
        }

        let cell = self.header.cell_size();
        buffer.resize(self.header.nrow as usize * cell, 0);

        let bx = column_index / self.header.block_width;
        let col_in_tile = (column_index % self.header.block_width) as usize;
        let blocks_per_row = self.header.blocks_per_row();
        let blocks_per_column = self.header.blocks_per_column();

        let mut block_buf = Vec::new();
        for by in 0..blocks_per_column {
            self.read_block(by * blocks_per_row + bx, &mut block_buf)?;
            let actual_width = self.header.actual_block_width(bx) as usize;
            let actual_height = block_buf.len() / cell / actual_width;

            // The target column strides through the tile one row at a time.
            let base = by as usize * self.header.block_height as usize;
            for i in 0..actual_height {
                let src = (i * actual_width + col_in_tile) * cell;
                let dst = (base + i) * cell;
                buffer[dst..dst + cell].copy_from_slice(&block_buf[src..src + cell]);
            }
        }
        Ok(())
    }

    /// [`read_row`](Self::read_row) addressed by label.
    pub fn read_row_by_name(&mut self, name: &str, buffer: &mut Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        let index = *self
            .row_map
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("row label [{name}]")))?;
        self.read_row(index, buffer)
    }

    /// [`read_column`](Self::read_column) addressed by label.
    pub fn read_column_by_name(&mut self, name: &str, buffer: &mut Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        let index = *self
            .column_map
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("column label [{name}]")))?;
        self.read_column(index, buffer)
    }

    fn check_cell_type<T: Cell>(&self) -> Result<()> {
        if self.header.cell_type != T::DATA_TYPE {
            return Err(Error::BadArgument(format!(
                "cell type mismatch: file stores [{}], requested [{}]",
                self.header.cell_type,
                T::DATA_TYPE
            )));
        }
        Ok(())
    }

    /// Typed variant of [`read_block`](Self::read_block): fills `buffer` and
    /// returns a cell view over it. The requested type must match the file's
    /// cell type.
    pub fn read_block_cells<'b, T: Cell>(
        &mut self,
        index: u32,
        buffer: &'b mut Vec<u8>,
    ) -> Result<CellSlice<'b, T>> {
        self.check_cell_type::<T>()?;
        self.read_block(index, buffer)?;
        Ok(CellSlice::new(buffer))
    }

    /// Typed variant of [`read_row`](Self::read_row).
    pub fn read_row_cells<'b, T: Cell>(
        &mut self,
        row_index: u32,
        buffer: &'b mut Vec<u8>,
    ) -> Result<CellSlice<'b, T>> {
        self.check_cell_type::<T>()?;
        self.read_row(row_index, buffer)?;
        Ok(CellSlice::new(buffer))
    }

    /// Typed variant of [`read_column`](Self::read_column).
    pub fn read_column_cells<'b, T: Cell>(
        &mut self,
        column_index: u32,
        buffer: &'b mut Vec<u8>,
    ) -> Result<CellSlice<'b, T>> {
        self.check_cell_type::<T>()?;
        self.read_column(column_index, buffer)?;
        Ok(CellSlice::new(buffer))
    }

    pub fn get_row_names(&self) -> Result<&[String]> {
        self.ensure_open()?;
        Ok(&self.row_names)
    }

    pub fn get_column_names(&self) -> Result<&[String]> {
        self.ensure_open()?;
        Ok(&self.column_names)
    }

    /// Labels for the given row indices, in order.
    pub fn row_names_at(&self, indices: &[u32]) -> Result<Vec<String>> {
        self.ensure_open()?;
        indices
            .iter()
            .map(|&i| {
                self.row_names
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| Error::OutOfRange(format!("row index [{i}]")))
            })
            .collect()
    }

    /// Labels for the given column indices, in order.
    pub fn column_names_at(&self, indices: &[u32]) -> Result<Vec<String>> {
        self.ensure_open()?;
        indices
            .iter()
            .map(|&i| {
                self.column_names
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| Error::OutOfRange(format!("column index [{i}]")))
            })
            .collect()
    }

    /// Indices for the given row labels, in order.
    pub fn row_indices<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<u32>> {
        self.ensure_open()?;
        names
            .iter()
            .map(|name| {
                self.row_map
                    .get(name.as_ref())
                    .copied()
                    .ok_or_else(|| Error::NotFound(format!("row label [{}]", name.as_ref())))
            })
            .collect()
    }

    /// Indices for the given column labels, in order.
    pub fn column_indices<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<u32>> {
        self.ensure_open()?;
        names
            .iter()
            .map(|name| {
                self.column_map
                    .get(name.as_ref())
                    .copied()
                    .ok_or_else(|| Error::NotFound(format!("column label [{}]", name.as_ref())))
            })
            .collect()
    }

    pub fn header(&self) -> Result<&FileHeader> {
        self.ensure_open()?;
        Ok(&self.header)
    }

    pub fn max_compressed_block_size(&self) -> u32 {
        self.max_compressed_block_size
    }

    pub fn max_uncompressed_block_size(&self) -> u32 {
        self.max_uncompressed_block_size
    }

    pub fn cache(&self) -> &Arc<BlockCache> {
        &self.cache
    }

    /// Release the file handle and all label state. Idempotent.
    pub fn close(&mut self) {
        self.file = None;
        self.block_table = Vec::new();
        self.row_names = Vec::new();
        self.column_names = Vec::new();
        self.row_map = HashMap::new();
        self.column_map = HashMap::new();
    }
}

fn read_label(file: &mut File, entry: &IndexEntry) -> Result<String> {
    file.seek(SeekFrom::Start(entry.offset))?;
    let mut bytes = vec![0u8; entry.stored_size as usize];
    read_exact_or_corrupt(file, &mut bytes, "label")?;
    String::from_utf8(bytes).map_err(|_| Error::Corrupt("label is not valid UTF-8".into()))
}
