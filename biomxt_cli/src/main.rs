use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use biomxt_codecs::{reader_codec, writer_codec};
use biomxt_core::convert::{convert_dynamic, ConvertOptions};
use biomxt_core::format::{FileHeader, HEADER_SIZE};
use biomxt_core::{Cell, CellSlice, CompressAlgorithm, DataType, MatrixFile};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "biomxt",
    about = "BioMXt — tiled, compressed, random-access matrix container",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a delimited text matrix into a .bmxt file
    Convert {
        /// Input CSV/TSV file
        input: PathBuf,
        /// Output path (default: the input path with a .bmxt extension)
        output: Option<PathBuf>,
        /// Columns per block
        #[arg(long, default_value_t = 64)]
        block_width: u32,
        /// Rows per block
        #[arg(long, default_value_t = 64)]
        block_height: u32,
        /// Field separator: ',' ';' or 'tab' (default: by input extension,
        /// .tsv → tab, otherwise comma)
        #[arg(short, long)]
        separator: Option<String>,
        /// Cell type: int16, int32, int64, float32, float64
        #[arg(short, long, default_value = "float32")]
        dtype: String,
        /// Compression: zstd (gzip and lz4 are reserved)
        #[arg(short, long, default_value = "zstd")]
        compression: String,
        /// Zstd compression level
        #[arg(long, default_value_t = 3)]
        zstd_level: i32,
        /// Replace the output file if it already exists
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the header of a .bmxt file
    Header {
        file: PathBuf,
    },
    /// Print one row of the matrix
    Row {
        file: PathBuf,
        /// Row index (zero-based)
        #[arg(short, long)]
        index: Option<u32>,
        /// Row label
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Print one column of the matrix
    Column {
        file: PathBuf,
        /// Column index (zero-based)
        #[arg(short, long)]
        index: Option<u32>,
        /// Column label
        #[arg(short, long)]
        label: Option<String>,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn parse_separator(spec: &str) -> anyhow::Result<u8> {
    match spec {
        "," => Ok(b','),
        ";" => Ok(b';'),
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        other => bail!("unknown separator [{other}]; expected ',' ';' or 'tab'"),
    }
}

fn detect_separator(input: &Path) -> u8 {
    match input.extension().and_then(|e| e.to_str()) {
        Some("tsv") => b'\t',
        _ => b',',
    }
}

/// First-pass header read, so the right codec can be resolved before the
/// file is opened for real.
fn read_file_header(path: &Path) -> anyhow::Result<FileHeader> {
    let mut file =
        File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = [0u8; HEADER_SIZE as usize];
    file.read_exact(&mut buf)
        .with_context(|| format!("reading header of {}", path.display()))?;
    Ok(FileHeader::from_bytes(&buf)?)
}

fn open_matrix(path: &Path) -> anyhow::Result<MatrixFile> {
    let header = read_file_header(path)?;
    let codec = reader_codec(header.compression)?;
    Ok(MatrixFile::open(path, codec)?)
}

fn print_header(header: &FileHeader) {
    println!("magic              : BMXt");
    println!("version            : {}", header.version);
    println!("cell type          : {}", header.cell_type);
    println!("compression        : {}", header.compression);
    println!("rows               : {}", header.nrow);
    println!("columns            : {}", header.ncol);
    println!("block width        : {}", header.block_width);
    println!("block height       : {}", header.block_height);
    println!("block count        : {}", header.block_count);
    println!("block table offset : {}", header.block_table_offset);
    println!("name table offset  : {}", header.name_table_offset);
    println!("uuid               : {}", header.uuid);
}

fn print_cells<T: Cell + std::fmt::Display>(cells: CellSlice<'_, T>) {
    let mut line = String::new();
    for (i, value) in cells.iter().enumerate() {
        if i > 0 {
            line.push('\t');
        }
        line.push_str(&value.to_string());
    }
    println!("{line}");
}

fn resolve_index(
    kind: &str,
    index: Option<u32>,
    label: Option<String>,
    lookup: impl FnOnce(&str) -> anyhow::Result<u32>,
) -> anyhow::Result<u32> {
    match (index, label) {
        (Some(index), None) => Ok(index),
        (None, Some(label)) => lookup(&label),
        _ => bail!("specify exactly one of --index or --label for the {kind}"),
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run_convert(
    input: PathBuf,
    output: Option<PathBuf>,
    block_width: u32,
    block_height: u32,
    separator: Option<String>,
    dtype: &str,
    compression: &str,
    zstd_level: i32,
    overwrite: bool,
) -> anyhow::Result<()> {
    let dtype = match DataType::from_name(dtype) {
        DataType::Unknown => bail!(
            "unknown data type [{dtype}]; expected int16, int32, int64, float32, or float64"
        ),
        dtype => dtype,
    };
    let compression = CompressAlgorithm::from_name(compression)
        .with_context(|| format!("unknown compression [{compression}]"))?;
    let codec = writer_codec(compression, zstd_level)?;

    let separator = match separator {
        Some(spec) => parse_separator(&spec)?,
        None => detect_separator(&input),
    };
    let output = output.unwrap_or_else(|| input.with_extension("bmxt"));
    if output.exists() && !overwrite {
        bail!(
            "output file {} already exists (pass --overwrite to replace it)",
            output.display()
        );
    }

    let options = ConvertOptions {
        block_width,
        block_height,
        separator,
    };
    let mut warnings = Vec::new();
    let header = convert_dynamic(
        dtype,
        &input,
        &output,
        &options,
        codec.as_ref(),
        &mut warnings,
    )
    .with_context(|| format!("converting {}", input.display()))?;

    for warning in &warnings {
        eprintln!("warning: {warning}");
    }
    eprintln!("wrote {}", output.display());
    print_header(&header);
    Ok(())
}

fn run_header(file: PathBuf) -> anyhow::Result<()> {
    let header = read_file_header(&file)?;
    print_header(&header);
    Ok(())
}

fn run_row(file: PathBuf, index: Option<u32>, label: Option<String>) -> anyhow::Result<()> {
    let mut matrix = open_matrix(&file)?;
    let index = resolve_index("row", index, label, |name| {
        Ok(matrix.row_indices(&[name])?[0])
    })?;

    let dtype = matrix.header()?.cell_type;
    let mut buf = Vec::new();
    match dtype {
        DataType::Int16 => print_cells(matrix.read_row_cells::<i16>(index, &mut buf)?),
        DataType::Int32 => print_cells(matrix.read_row_cells::<i32>(index, &mut buf)?),
        DataType::Int64 => print_cells(matrix.read_row_cells::<i64>(index, &mut buf)?),
        DataType::Float32 => print_cells(matrix.read_row_cells::<f32>(index, &mut buf)?),
        DataType::Float64 => print_cells(matrix.read_row_cells::<f64>(index, &mut buf)?),
        DataType::Unknown => bail!("file declares an unknown cell type"),
    }
    Ok(())
}

fn run_column(file: PathBuf, index: Option<u32>, label: Option<String>) -> anyhow::Result<()> {
    let mut matrix = open_matrix(&file)?;
    let index = resolve_index("column", index, label, |name| {
        Ok(matrix.column_indices(&[name])?[0])
    })?;

    let dtype = matrix.header()?.cell_type;
    let mut buf = Vec::new();
    match dtype {
        DataType::Int16 => print_cells(matrix.read_column_cells::<i16>(index, &mut buf)?),
        DataType::Int32 => print_cells(matrix.read_column_cells::<i32>(index, &mut buf)?),
        DataType::Int64 => print_cells(matrix.read_column_cells::<i64>(index, &mut buf)?),
        DataType::Float32 => print_cells(matrix.read_column_cells::<f32>(index, &mut buf)?),
        DataType::Float64 => print_cells(matrix.read_column_cells::<f64>(index, &mut buf)?),
        DataType::Unknown => bail!("file declares an unknown cell type"),
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert {
            input,
            output,
            block_width,
            block_height,
            separator,
            dtype,
            compression,
            zstd_level,
            overwrite,
        } => run_convert(
            input,
            output,
            block_width,
            block_height,
            separator,
            &dtype,
            &compression,
            zstd_level,
            overwrite,
        ),
        Commands::Header { file } => run_header(file),
        Commands::Row { file, index, label } => run_row(file, index, label),
        Commands::Column { file, index, label } => run_column(file, index, label),
    }
}
