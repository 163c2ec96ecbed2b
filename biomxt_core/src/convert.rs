//! Single-pass streaming converter from delimited text to a BMXt file.
//!
//! The input is consumed one line at a time. Rows accumulate into a band of
//! `block_height` rows; each full band (and the final partial band) is
//! sliced into tiles of `block_width` columns, laid out row-major, compressed
//! independently, and appended to the output. Memory stays
//! O(block_height · ncol · cell size) regardless of matrix size.
//!
//! Output trajectory: a zeroed header placeholder, the blocks in block-index
//! order, the raw row-label bytes then column-label bytes, the block table,
//! the name table, and finally a seek back to offset 0 to write the real
//! header.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::codec::Codec;
use crate::delim::{count_fields, parse_line, DelimError};
use crate::error::{Error, Result};
use crate::format::{FileHeader, FileId, IndexEntry, FORMAT_VERSION, HEADER_SIZE, INDEX_ENTRY_SIZE};
use crate::types::{Cell, DataType};

/// Converter parameters. The separator is a single byte; callers decide the
/// default (the CLI auto-detects it from the input extension).
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    pub block_width: u32,
    pub block_height: u32,
    pub separator: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            block_width: 64,
            block_height: 64,
            separator: b',',
        }
    }
}

/// Run [`convert`] for the cell type selected at run time.
pub fn convert_dynamic(
    dtype: DataType,
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
    codec: &dyn Codec,
    warnings: &mut Vec<String>,
) -> Result<FileHeader> {
    match dtype {
        DataType::Int16 => convert::<i16>(input, output, options, codec, warnings),
        DataType::Int32 => convert::<i32>(input, output, options, codec, warnings),
        DataType::Int64 => convert::<i64>(input, output, options, codec, warnings),
        DataType::Float32 => convert::<f32>(input, output, options, codec, warnings),
        DataType::Float64 => convert::<f64>(input, output, options, codec, warnings),
        DataType::Unknown => Err(Error::BadArgument(
            "cannot convert with the unknown cell type".into(),
        )),
    }
}

/// Convert the delimited file at `input` into a BMXt file at `output`.
///
/// The first non-empty, non-`#` line is the header row: its first field (the
/// row-label column's own label) is discarded and the remaining fields fix
/// the column labels and `ncol`. Every later non-empty line supplies a row
/// label plus exactly `ncol` cell values.
///
/// Duplicate labels are reported through `warnings`; malformed lines,
/// unparsable cells, and out-of-range values abort with [`Error::Parse`]
/// citing the 1-based line number. The output file is not cleaned up on
/// failure.
pub fn convert<T: Cell>(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
    codec: &dyn Codec,
    warnings: &mut Vec<String>,
) -> Result<FileHeader> {
    if options.block_width == 0 || options.block_height == 0 {
        return Err(Error::BadArgument(
            "block width and height must be greater than 0".into(),
        ));
    }
    warnings.clear();

    let mut reader = BufReader::new(File::open(input)?);
    let mut out = File::create(output)?;

    // Placeholder header; overwritten once the table offsets are known.
    out.write_all(&[0u8; HEADER_SIZE as usize])?;
    let mut current_offset = HEADER_SIZE;

    let block_height = options.block_height as usize;
    let mut column_names: Vec<String> = Vec::new();
    let mut row_names: Vec<String> = Vec::new();
    let mut seen_rows: HashSet<String> = HashSet::new();
    let mut fields: Vec<String> = Vec::new();
    let mut band: Vec<Vec<T>> = Vec::new();
    let mut rows_in_band = 0usize;
    let mut block_table: Vec<IndexEntry> = Vec::new();
    let mut tile_scratch: Vec<u8> = Vec::new();

    let mut line = String::new();
    let mut line_no = 0u64;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        line_no += 1;

        if line.starts_with('#') {
            continue;
        }

        // Header row: fixes ncol and the column labels.
        if column_names.is_empty() {
            let ncells = count_fields(&line, options.separator)
                .map_err(|e| parse_error(line_no, e.to_string()))?;
            if ncells == 0 {
                continue;
            }
            if ncells < 2 {
                return Err(parse_error(
                    line_no,
                    "header row must name at least one column".into(),
                ));
            }
            fields = vec![String::new(); ncells];
            parse_line(&line, options.separator, &mut fields)
                .map_err(|e| parse_error(line_no, e.to_string()))?;

            // The corner cell is the row-label column's own label.
            column_names.extend(fields[1..].iter().cloned());
            let mut seen = HashSet::new();
            for name in &column_names {
                if !seen.insert(name.as_str()) {
                    warnings.push(format!("duplicate column label [{name}]"));
                }
            }

            band = vec![vec![T::default(); column_names.len()]; block_height];
            continue;
        }

        // Data row: row label plus ncol cells.
        let ncol = column_names.len();
        let ncells = match parse_line(&line, options.separator, &mut fields) {
            Ok(n) => n,
            Err(DelimError::TooManyFields { .. }) => {
                return Err(parse_error(
                    line_no,
                    format!("row has more cells than expected ({ncol}, row label excluded)"),
                ));
            }
            Err(e) => return Err(parse_error(line_no, e.to_string())),
        };
        if ncells == 0 {
            continue;
        }
        if ncells != ncol + 1 {
            return Err(parse_error(
                line_no,
                format!(
                    "row has {} cells (row label excluded), expected {ncol}",
                    ncells - 1
                ),
            ));
        }

        if !seen_rows.insert(fields[0].clone()) {
            warnings.push(format!("duplicate row label [{}]", fields[0]));
        }
        row_names.push(fields[0].clone());

        let row = &mut band[rows_in_band];
        for (cell, field) in row.iter_mut().zip(&fields[1..=ncol]) {
            *cell = T::parse(field).map_err(|e| parse_error(line_no, e.to_string()))?;
        }
        rows_in_band += 1;

        if rows_in_band == block_height {
            flush_band(
                &band,
                rows_in_band,
                options.block_width,
                codec,
                &mut out,
                &mut current_offset,
                &mut block_table,
                &mut tile_scratch,
            )?;
            rows_in_band = 0;
        }
    }

    if column_names.is_empty() {
        return Err(parse_error(line_no, "input contains no header row".into()));
    }

    // Final partial band.
    if rows_in_band > 0 {
        flush_band(
            &band,
            rows_in_band,
            options.block_width,
            codec,
            &mut out,
            &mut current_offset,
            &mut block_table,
            &mut tile_scratch,
        )?;
    }

    // Raw label bytes: rows first, then columns, each tracked by an index
    // entry for the name table.
    let mut name_table = Vec::with_capacity(row_names.len() + column_names.len());
    for name in row_names.iter().chain(column_names.iter()) {
        name_table.push(IndexEntry {
            offset: current_offset,
            stored_size: name.len() as u32,
            raw_size: name.len() as u32,
        });
        out.write_all(name.as_bytes())?;
        current_offset += name.len() as u64;
    }

    let block_table_offset = current_offset;
    for entry in &block_table {
        out.write_all(&entry.to_bytes())?;
        current_offset += INDEX_ENTRY_SIZE;
    }

    let name_table_offset = current_offset;
    for entry in &name_table {
        out.write_all(&entry.to_bytes())?;
    }

    let header = FileHeader {
        version: FORMAT_VERSION,
        cell_type: T::DATA_TYPE,
        compression: codec.algo(),
        nrow: row_names.len() as u32,
        ncol: column_names.len() as u32,
        block_width: options.block_width,
        block_height: options.block_height,
        block_count: block_table.len() as u32,
        block_table_offset,
        name_table_offset,
        uuid: FileId::generate(),
    };
    out.seek(SeekFrom::Start(0))?;
    out.write_all(&header.to_bytes())?;
    out.flush()?;

    info!(
        nrow = header.nrow,
        ncol = header.ncol,
        blocks = header.block_count,
        codec = codec.name(),
        warnings = warnings.len(),
        "conversion complete"
    );
    Ok(header)
}

fn parse_error(line: u64, message: String) -> Error {
    Error::Parse { line, message }
}

/// Slice the filled part of the band into tiles, compress each, and append
/// it to the output with an index entry. Tiles shrink in width at the right
/// edge; the band itself shrinks in height at the bottom edge.
#[allow(clippy::too_many_arguments)]
fn flush_band<T: Cell>(
    band: &[Vec<T>],
    rows_in_band: usize,
    block_width: u32,
    codec: &dyn Codec,
    out: &mut File,
    current_offset: &mut u64,
    block_table: &mut Vec<IndexEntry>,
    tile_scratch: &mut Vec<u8>,
) -> Result<()> {
    let ncol = band.first().map_or(0, Vec::len);
    let block_width = block_width as usize;

    let mut col = 0usize;
    while col < ncol {
        let actual_width = block_width.min(ncol - col);
        let raw_size = actual_width * rows_in_band * T::SIZE;
        tile_scratch.resize(raw_size, 0);

        for (r, row) in band.iter().take(rows_in_band).enumerate() {
            for c in 0..actual_width {
                let at = (r * actual_width + c) * T::SIZE;
                row[col + c].write_le(&mut tile_scratch[at..at + T::SIZE]);
            }
        }

        let compressed = codec.compress_block(tile_scratch)?;
        out.write_all(&compressed)?;
        block_table.push(IndexEntry {
            offset: *current_offset,
            stored_size: compressed.len() as u32,
            raw_size: raw_size as u32,
        });
        *current_offset += compressed.len() as u64;
        col += actual_width;
    }

    debug!(rows = rows_in_band, "flushed row band");
    Ok(())
}
