//! End-to-end tests: convert a delimited text matrix to a BMXt file, then
//! read it back block-wise, row-wise, and column-wise.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use biomxt_codecs::ZstdCodec;
use biomxt_core::cache::{BlockCache, ENTRY_OVERHEAD};
use biomxt_core::convert::{convert, ConvertOptions};
use biomxt_core::format::{FileHeader, IndexEntry, HEADER_SIZE, INDEX_ENTRY_SIZE};
use biomxt_core::{Cell, DataType, Error, MatrixFile};

// ── helpers ────────────────────────────────────────────────────────────────

fn options(block_width: u32, block_height: u32) -> ConvertOptions {
    ConvertOptions {
        block_width,
        block_height,
        separator: b',',
    }
}

/// Write `text` to a scratch CSV and convert it. Returns the scratch dir
/// (keeping it alive), the output path, the header, and the warnings.
fn convert_text<T: Cell>(
    text: &str,
    block_width: u32,
    block_height: u32,
) -> (TempDir, PathBuf, FileHeader, Vec<String>) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.csv");
    let output = dir.path().join("matrix.bmxt");
    fs::write(&input, text).unwrap();

    let mut warnings = Vec::new();
    let header = convert::<T>(
        &input,
        &output,
        &options(block_width, block_height),
        &ZstdCodec::default(),
        &mut warnings,
    )
    .unwrap();
    (dir, output, header, warnings)
}

fn convert_err<T: Cell>(text: &str, block_width: u32, block_height: u32) -> Error {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.csv");
    let output = dir.path().join("matrix.bmxt");
    fs::write(&input, text).unwrap();

    let mut warnings = Vec::new();
    convert::<T>(
        &input,
        &output,
        &options(block_width, block_height),
        &ZstdCodec::default(),
        &mut warnings,
    )
    .unwrap_err()
}

fn open(path: &PathBuf) -> MatrixFile {
    MatrixFile::open(path, Arc::new(ZstdCodec::default())).unwrap()
}

/// Build a CSV for an nrow × ncol matrix whose cell (r, c) is `r·ncol + c`.
fn grid_csv(nrow: u32, ncol: u32) -> String {
    let mut text = String::new();
    for c in 0..ncol {
        text.push_str(&format!(",c{c}"));
    }
    text.push('\n');
    for r in 0..nrow {
        text.push_str(&format!("r{r}"));
        for c in 0..ncol {
            text.push_str(&format!(",{}", r * ncol + c));
        }
        text.push('\n');
    }
    text
}

fn expected_cell<T: Cell>(r: u32, c: u32, ncol: u32) -> T {
    T::parse(&(r * ncol + c).to_string()).unwrap()
}

// ── the concrete 3×3 / 2×2 scenario ────────────────────────────────────────

#[test]
fn three_by_three_float32_in_two_by_two_blocks() {
    let text = ",c0,c1,c2\nr0,1,2,3\nr1,4,5,6\nr2,7,8,9\n";
    let (_dir, path, header, warnings) = convert_text::<f32>(text, 2, 2);
    assert!(warnings.is_empty());

    assert_eq!(header.nrow, 3);
    assert_eq!(header.ncol, 3);
    assert_eq!(header.block_count, 4);
    assert_eq!(header.cell_type, DataType::Float32);

    // Raw sizes of the four blocks, in block-index order: the interior
    // block, the right edge, the bottom edge, and the corner.
    let bytes = fs::read(&path).unwrap();
    let table_at = header.block_table_offset as usize;
    let raw_sizes: Vec<u32> = (0..4)
        .map(|i| {
            let at = table_at + i * INDEX_ENTRY_SIZE as usize;
            let mut buf = [0u8; INDEX_ENTRY_SIZE as usize];
            buf.copy_from_slice(&bytes[at..at + INDEX_ENTRY_SIZE as usize]);
            IndexEntry::from_bytes(&buf).raw_size
        })
        .collect();
    assert_eq!(raw_sizes, [16, 8, 8, 4]);

    let mut matrix = open(&path);
    let mut buf = Vec::new();
    assert_eq!(
        matrix.read_row_cells::<f32>(1, &mut buf).unwrap().to_vec(),
        [4.0, 5.0, 6.0]
    );
    let mut buf = Vec::new();
    assert_eq!(
        matrix
            .read_column_cells::<f32>(2, &mut buf)
            .unwrap()
            .to_vec(),
        [3.0, 6.0, 9.0]
    );

    // The corner block holds the single cell (2, 2).
    let mut buf = Vec::new();
    assert_eq!(
        matrix.read_block_cells::<f32>(3, &mut buf).unwrap().to_vec(),
        [9.0]
    );
}

// ── round-trips for every cell type ────────────────────────────────────────

fn roundtrip_case<T: Cell + std::fmt::Debug>(nrow: u32, ncol: u32, bw: u32, bh: u32) {
    let (_dir, path, header, _) = convert_text::<T>(&grid_csv(nrow, ncol), bw, bh);
    assert_eq!(header.nrow, nrow);
    assert_eq!(header.ncol, ncol);
    assert_eq!(header.cell_type, T::DATA_TYPE);
    assert_eq!(
        header.block_count,
        ncol.div_ceil(bw) * nrow.div_ceil(bh)
    );

    let mut matrix = open(&path);
    let mut buf = Vec::new();
    for r in 0..nrow {
        let row = matrix.read_row_cells::<T>(r, &mut buf).unwrap().to_vec();
        assert_eq!(row.len(), ncol as usize);
        for c in 0..ncol {
            assert_eq!(row[c as usize], expected_cell::<T>(r, c, ncol), "cell ({r},{c})");
        }
    }
    for c in 0..ncol {
        let column = matrix.read_column_cells::<T>(c, &mut buf).unwrap().to_vec();
        assert_eq!(column.len(), nrow as usize);
        for r in 0..nrow {
            assert_eq!(column[r as usize], expected_cell::<T>(r, c, ncol), "cell ({r},{c})");
        }
    }
}

#[test]
fn roundtrip_int16() {
    roundtrip_case::<i16>(7, 5, 2, 3);
}

#[test]
fn roundtrip_int32() {
    roundtrip_case::<i32>(5, 7, 3, 2);
}

#[test]
fn roundtrip_int64() {
    roundtrip_case::<i64>(4, 4, 2, 2);
}

#[test]
fn roundtrip_float32() {
    roundtrip_case::<f32>(9, 3, 2, 4);
}

#[test]
fn roundtrip_float64() {
    roundtrip_case::<f64>(3, 9, 4, 2);
}

// ── addressing ─────────────────────────────────────────────────────────────

#[test]
fn row_and_column_reads_agree_cell_by_cell() {
    let (nrow, ncol, bw, bh) = (11u32, 7u32, 3u32, 4u32);
    let (_dir, path, header, _) = convert_text::<i32>(&grid_csv(nrow, ncol), bw, bh);
    let mut matrix = open(&path);

    let mut rows = Vec::new();
    let mut buf = Vec::new();
    for r in 0..nrow {
        rows.push(matrix.read_row_cells::<i32>(r, &mut buf).unwrap().to_vec());
    }
    for c in 0..ncol {
        let column = matrix.read_column_cells::<i32>(c, &mut buf).unwrap().to_vec();
        for r in 0..nrow {
            assert_eq!(rows[r as usize][c as usize], column[r as usize]);
        }
    }

    // A cell is also reachable directly inside its block.
    let (r, c) = (10u32, 5u32);
    let (by, bx) = (r / bh, c / bw);
    let block_index = by * header.blocks_per_row() + bx;
    let actual_width = header.actual_block_width(bx);
    let pos = (r % bh) * actual_width + (c % bw);
    let block = matrix
        .read_block_cells::<i32>(block_index, &mut buf)
        .unwrap()
        .to_vec();
    assert_eq!(block[pos as usize], rows[r as usize][c as usize]);
}

// ── labels ─────────────────────────────────────────────────────────────────

#[test]
fn label_bijection_and_unknown_labels() {
    let (_dir, path, _, _) = convert_text::<f32>(&grid_csv(6, 4), 2, 2);
    let matrix = open(&path);

    let row_names = matrix.get_row_names().unwrap().to_vec();
    assert_eq!(row_names.len(), 6);
    for (i, name) in row_names.iter().enumerate() {
        assert_eq!(matrix.row_indices(&[name]).unwrap(), [i as u32]);
    }
    let column_names = matrix.get_column_names().unwrap().to_vec();
    for (i, name) in column_names.iter().enumerate() {
        assert_eq!(matrix.column_indices(&[name]).unwrap(), [i as u32]);
    }

    assert!(matches!(
        matrix.row_indices(&["no-such-row"]),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        matrix.column_indices(&["no-such-column"]),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        matrix.row_names_at(&[99]),
        Err(Error::OutOfRange(_))
    ));
}

#[test]
fn quoted_labels_roundtrip_verbatim() {
    // First label contains the separator; second is a single literal quote.
    let text = ",c0\n\"a,b\",1\n\"\"\"\",2\n";
    let (_dir, path, header, _) = convert_text::<i32>(text, 2, 2);
    assert_eq!(header.nrow, 2);

    let mut matrix = open(&path);
    assert_eq!(matrix.get_row_names().unwrap(), ["a,b", "\""]);
    assert_eq!(matrix.row_indices(&["a,b"]).unwrap(), [0]);
    assert_eq!(matrix.row_indices(&["\""]).unwrap(), [1]);

    let mut buf = Vec::new();
    matrix.read_row_by_name("a,b", &mut buf).unwrap();
    assert_eq!(i32::read_le(&buf), 1);
}

#[test]
fn empty_and_single_byte_labels() {
    let text = ",x\n,1\nr,2\n";
    let (_dir, path, _, warnings) = convert_text::<i32>(text, 4, 4);
    assert!(warnings.is_empty());

    let matrix = open(&path);
    assert_eq!(matrix.get_row_names().unwrap(), ["", "r"]);
    assert_eq!(matrix.get_column_names().unwrap(), ["x"]);
    assert_eq!(matrix.row_indices(&[""]).unwrap(), [0]);
}

#[test]
fn duplicate_labels_warn_and_last_wins() {
    let text = ",c0\ndup,1\ndup,2\n";
    let (_dir, path, _, warnings) = convert_text::<i32>(text, 2, 2);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("dup"));

    let matrix = open(&path);
    assert_eq!(matrix.row_indices(&["dup"]).unwrap(), [1]);
}

// ── parse failures ─────────────────────────────────────────────────────────

#[test]
fn unclosed_quote_aborts() {
    let text = ",c0,c1,c2\n\"abc,1,2,3\n";
    let err = convert_err::<f32>(text, 2, 2);
    match err {
        Error::Parse { line, message } => {
            assert_eq!(line, 2);
            assert!(message.contains("unclosed quote"), "message: {message}");
        }
        other => panic!("expected Parse error, got {other:?}"),
    }
}

#[test]
fn wrong_arity_aborts_with_line_number() {
    // Too few cells.
    let err = convert_err::<f32>(",c0,c1,c2\nr0,1,2\n", 2, 2);
    match err {
        Error::Parse { line, .. } => assert_eq!(line, 2),
        other => panic!("expected Parse error, got {other:?}"),
    }

    // Too many cells, after a valid first data row.
    let err = convert_err::<f32>(",c0,c1,c2\nr0,1,2,3\nr1,1,2,3,4\n", 2, 2);
    match err {
        Error::Parse { line, .. } => assert_eq!(line, 3),
        other => panic!("expected Parse error, got {other:?}"),
    }
}

#[test]
fn int16_range_is_enforced() {
    let err = convert_err::<i16>(",c0\nr0,40000\n", 2, 2);
    match err {
        Error::Parse { line, message } => {
            assert_eq!(line, 2);
            assert!(message.contains("out of range"), "message: {message}");
        }
        other => panic!("expected Parse error, got {other:?}"),
    }

    let (_dir, path, _, _) = convert_text::<i16>(",c0,c1\nr0,32767,-32768\n", 2, 2);
    let mut matrix = open(&path);
    let mut buf = Vec::new();
    assert_eq!(
        matrix.read_row_cells::<i16>(0, &mut buf).unwrap().to_vec(),
        [32767, -32768]
    );
}

#[test]
fn unparsable_cell_aborts() {
    let err = convert_err::<f64>(",c0\nr0,not-a-number\n", 2, 2);
    assert!(matches!(err, Error::Parse { line: 2, .. }));
}

#[test]
fn input_without_header_row_aborts() {
    assert!(matches!(
        convert_err::<f32>("", 2, 2),
        Error::Parse { .. }
    ));
    assert!(matches!(
        convert_err::<f32>("# only a comment\n\n", 2, 2),
        Error::Parse { .. }
    ));
}

#[test]
fn zero_block_dimensions_are_rejected() {
    let err = convert_err::<f32>(&grid_csv(2, 2), 0, 2);
    assert!(matches!(err, Error::BadArgument(_)));
    let err = convert_err::<f32>(&grid_csv(2, 2), 2, 0);
    assert!(matches!(err, Error::BadArgument(_)));
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let text = "# exported matrix\n\n,c0,c1\n# data follows\nr0,1,2\n\nr1,3,4\n";
    let (_dir, path, header, _) = convert_text::<i32>(text, 2, 2);
    assert_eq!(header.nrow, 2);
    assert_eq!(header.ncol, 2);

    let mut matrix = open(&path);
    let mut buf = Vec::new();
    assert_eq!(
        matrix.read_row_cells::<i32>(1, &mut buf).unwrap().to_vec(),
        [3, 4]
    );
}

// ── boundary geometries ────────────────────────────────────────────────────

#[test]
fn single_cell_matrix() {
    let (_dir, path, header, _) = convert_text::<f64>(grid_csv(1, 1).as_str(), 4, 4);
    assert_eq!(header.block_count, 1);

    let mut matrix = open(&path);
    let mut buf = Vec::new();
    assert_eq!(
        matrix.read_row_cells::<f64>(0, &mut buf).unwrap().to_vec(),
        [0.0]
    );
    assert_eq!(
        matrix
            .read_column_cells::<f64>(0, &mut buf)
            .unwrap()
            .to_vec(),
        [0.0]
    );
}

#[test]
fn blocks_larger_than_the_matrix() {
    let (nrow, ncol) = (3u32, 3u32);
    let (_dir, path, header, _) = convert_text::<i32>(&grid_csv(nrow, ncol), 8, 8);
    assert_eq!(header.block_count, 1);

    let mut matrix = open(&path);
    let mut buf = Vec::new();
    for r in 0..nrow {
        let row = matrix.read_row_cells::<i32>(r, &mut buf).unwrap().to_vec();
        assert_eq!(row, (0..ncol).map(|c| (r * ncol + c) as i32).collect::<Vec<_>>());
    }
    for c in 0..ncol {
        let column = matrix.read_column_cells::<i32>(c, &mut buf).unwrap().to_vec();
        assert_eq!(
            column,
            (0..nrow).map(|r| (r * ncol + c) as i32).collect::<Vec<_>>()
        );
    }
}

#[test]
fn single_row_and_single_column_matrices() {
    let (_dir, path, header, _) = convert_text::<i32>(&grid_csv(1, 5), 2, 2);
    assert_eq!(header.block_count, 3);
    let mut matrix = open(&path);
    let mut buf = Vec::new();
    assert_eq!(
        matrix.read_row_cells::<i32>(0, &mut buf).unwrap().to_vec(),
        [0, 1, 2, 3, 4]
    );

    let (_dir, path, header, _) = convert_text::<i32>(&grid_csv(5, 1), 2, 2);
    assert_eq!(header.block_count, 3);
    let mut matrix = open(&path);
    assert_eq!(
        matrix
            .read_column_cells::<i32>(0, &mut buf)
            .unwrap()
            .to_vec(),
        [0, 1, 2, 3, 4]
    );
}

// ── format invariants ──────────────────────────────────────────────────────

#[test]
fn produced_file_satisfies_format_invariants() {
    let (nrow, ncol, bw, bh) = (10u32, 6u32, 4u32, 3u32);
    let (_dir, path, header, _) = convert_text::<f32>(&grid_csv(nrow, ncol), bw, bh);

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"BMXt");

    let mut header_buf = [0u8; HEADER_SIZE as usize];
    header_buf.copy_from_slice(&bytes[..HEADER_SIZE as usize]);
    let on_disk = FileHeader::from_bytes(&header_buf).unwrap();
    assert_eq!(on_disk, header);
    assert_eq!(on_disk.block_count, ncol.div_ceil(bw) * nrow.div_ceil(bh));
    assert!(on_disk.name_table_offset > on_disk.block_table_offset);

    let mut entries = Vec::new();
    for i in 0..on_disk.block_count as usize {
        let at = on_disk.block_table_offset as usize + i * INDEX_ENTRY_SIZE as usize;
        let mut buf = [0u8; INDEX_ENTRY_SIZE as usize];
        buf.copy_from_slice(&bytes[at..at + INDEX_ENTRY_SIZE as usize]);
        entries.push(IndexEntry::from_bytes(&buf));
    }

    // Blocks sit between the header and the block table, in ascending
    // offset order, and their raw sizes sum to the whole matrix.
    let mut previous_offset = 0u64;
    let mut total_raw = 0u64;
    for entry in &entries {
        assert!(entry.offset >= HEADER_SIZE);
        assert!(entry.offset + entry.stored_size as u64 <= on_disk.block_table_offset);
        assert!(entry.offset > previous_offset || previous_offset == 0);
        previous_offset = entry.offset;
        total_raw += entry.raw_size as u64;
    }
    assert_eq!(total_raw, (nrow * ncol * 4) as u64);

    // Name table: nrow row entries then ncol column entries, matching the
    // reader's view of the labels.
    let matrix = open(&path);
    let mut labels = Vec::new();
    for i in 0..(nrow + ncol) as usize {
        let at = on_disk.name_table_offset as usize + i * INDEX_ENTRY_SIZE as usize;
        let mut buf = [0u8; INDEX_ENTRY_SIZE as usize];
        buf.copy_from_slice(&bytes[at..at + INDEX_ENTRY_SIZE as usize]);
        let entry = IndexEntry::from_bytes(&buf);
        let start = entry.offset as usize;
        labels.push(String::from_utf8(bytes[start..start + entry.stored_size as usize].to_vec()).unwrap());
    }
    assert_eq!(&labels[..nrow as usize], matrix.get_row_names().unwrap());
    assert_eq!(&labels[nrow as usize..], matrix.get_column_names().unwrap());
}

// ── cache behaviour through the reader ─────────────────────────────────────

#[test]
fn cache_eviction_under_pressure() {
    let (_dir, path, _, _) = convert_text::<f32>(&grid_csv(4, 4), 2, 2);

    // Each decompressed block is 2·2·4 = 16 bytes; the ceiling holds one
    // entry but not two, so alternating reads evict on every miss.
    let block_cost = ENTRY_OVERHEAD + 16;
    let cache = Arc::new(BlockCache::with_memory_limit(2 * block_cost - 1));
    let mut matrix =
        MatrixFile::open_with_cache(&path, Arc::new(ZstdCodec::default()), Arc::clone(&cache))
            .unwrap();

    let mut buf = Vec::new();
    for round in 0..8u32 {
        let index = round % 2;
        matrix.read_block(index, &mut buf).unwrap();
        assert!(cache.get_memory_used() <= cache.get_memory_limit());

        // Block 0 starts with cell (0,0) = 0.0; block 1 with (0,2) = 2.0.
        let first = f32::read_le(&buf);
        assert_eq!(first, if index == 0 { 0.0 } else { 2.0 });
    }
    assert_eq!(cache.get_memory_used(), block_cost);
}

#[test]
fn repeated_reads_are_served_from_cache() {
    let (_dir, path, _, _) = convert_text::<i64>(&grid_csv(6, 6), 2, 2);
    let cache = Arc::new(BlockCache::new());
    let mut matrix =
        MatrixFile::open_with_cache(&path, Arc::new(ZstdCodec::default()), Arc::clone(&cache))
            .unwrap();

    let mut buf = Vec::new();
    matrix.read_row(0, &mut buf).unwrap();
    let used_after_first = cache.get_memory_used();
    assert!(used_after_first > 0);

    // Re-reading the same stripe touches only cached blocks.
    matrix.read_row(1, &mut buf).unwrap();
    assert_eq!(cache.get_memory_used(), used_after_first);
}

#[test]
fn owned_cache_ceiling_covers_one_stripe() {
    // 7/2 floors to 3 whole blocks per axis (a ceiling-division stripe
    // would be 4); the largest block is 2·2·4 = 16 raw bytes.
    let (_dir, path, _, _) = convert_text::<f32>(&grid_csv(7, 7), 2, 2);
    let matrix = open(&path);
    assert_eq!(
        matrix.cache().get_memory_limit(),
        3 * (16 + ENTRY_OVERHEAD)
    );

    // A matrix narrower than one block floors to zero on both axes; the
    // ceiling is clamped so its single block still fits.
    let (_dir, path, _, _) = convert_text::<f32>(&grid_csv(1, 1), 4, 4);
    let matrix = open(&path);
    assert_eq!(matrix.cache().get_memory_limit(), 4 + ENTRY_OVERHEAD);
}

// ── reader validation ──────────────────────────────────────────────────────

#[test]
fn out_of_range_indices_are_rejected() {
    let (_dir, path, _, _) = convert_text::<f32>(&grid_csv(3, 3), 2, 2);
    let mut matrix = open(&path);
    let mut buf = Vec::new();

    assert!(matches!(
        matrix.read_row(3, &mut buf),
        Err(Error::OutOfRange(_))
    ));
    assert!(matches!(
        matrix.read_column(3, &mut buf),
        Err(Error::OutOfRange(_))
    ));
    assert!(matches!(
        matrix.read_block(4, &mut buf),
        Err(Error::OutOfRange(_))
    ));
}

#[test]
fn typed_reads_check_the_cell_type() {
    let (_dir, path, _, _) = convert_text::<f32>(&grid_csv(2, 2), 2, 2);
    let mut matrix = open(&path);
    let mut buf = Vec::new();
    assert!(matches!(
        matrix.read_row_cells::<i32>(0, &mut buf),
        Err(Error::BadArgument(_))
    ));
}

#[test]
fn operations_fail_after_close() {
    let (_dir, path, _, _) = convert_text::<f32>(&grid_csv(3, 3), 2, 2);
    let mut matrix = open(&path);
    matrix.close();

    let mut buf = Vec::new();
    assert!(matches!(matrix.read_block(0, &mut buf), Err(Error::Closed)));
    assert!(matches!(matrix.read_row(0, &mut buf), Err(Error::Closed)));
    assert!(matches!(
        matrix.read_column(0, &mut buf),
        Err(Error::Closed)
    ));
    assert!(matches!(matrix.get_row_names(), Err(Error::Closed)));
    assert!(matches!(matrix.header(), Err(Error::Closed)));
    assert!(matches!(
        matrix.row_indices(&["r0"]),
        Err(Error::Closed)
    ));
}

#[test]
fn truncated_and_garbage_files_are_corrupt() {
    let dir = tempfile::tempdir().unwrap();

    let garbage = dir.path().join("garbage.bmxt");
    fs::write(&garbage, b"not a matrix at all").unwrap();
    let err = MatrixFile::open(&garbage, Arc::new(ZstdCodec::default())).unwrap_err();
    assert!(matches!(err, Error::Corrupt(_)));

    // A valid file truncated inside its tables.
    let (_src_dir, path, header, _) = convert_text::<f32>(&grid_csv(4, 4), 2, 2);
    let bytes = fs::read(&path).unwrap();
    let truncated = dir.path().join("truncated.bmxt");
    fs::write(&truncated, &bytes[..header.block_table_offset as usize + 4]).unwrap();
    let err = MatrixFile::open(&truncated, Arc::new(ZstdCodec::default())).unwrap_err();
    assert!(matches!(err, Error::Corrupt(_)));
}

#[test]
fn reserved_compression_tag_cannot_be_read() {
    let (_dir, path, _, _) = convert_text::<f32>(&grid_csv(2, 2), 2, 2);

    // Flip the header's compression tag to the reserved gzip value.
    let mut bytes = fs::read(&path).unwrap();
    bytes[7] = 1;
    fs::write(&path, &bytes).unwrap();

    let mut header_buf = [0u8; HEADER_SIZE as usize];
    header_buf.copy_from_slice(&bytes[..HEADER_SIZE as usize]);
    let header = FileHeader::from_bytes(&header_buf).unwrap();
    assert!(matches!(
        biomxt_codecs::reader_codec(header.compression),
        Err(Error::Corrupt(_))
    ));

    // Opening with the zstd codec anyway is a caller error, not corruption.
    let err = MatrixFile::open(&path, Arc::new(ZstdCodec::default())).unwrap_err();
    assert!(matches!(err, Error::BadArgument(_)));
}

#[test]
fn tab_separated_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.tsv");
    let output = dir.path().join("matrix.bmxt");
    fs::write(&input, "\tc0\tc1\nr0\t1\t2\nr1\t3\t4\n").unwrap();

    let mut warnings = Vec::new();
    let header = convert::<i32>(
        &input,
        &output,
        &ConvertOptions {
            block_width: 2,
            block_height: 2,
            separator: b'\t',
        },
        &ZstdCodec::default(),
        &mut warnings,
    )
    .unwrap();
    assert_eq!((header.nrow, header.ncol), (2, 2));

    let mut matrix = open(&output);
    let mut buf = Vec::new();
    assert_eq!(
        matrix.read_row_cells::<i32>(1, &mut buf).unwrap().to_vec(),
        [3, 4]
    );
}
