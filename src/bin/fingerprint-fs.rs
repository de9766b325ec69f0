//! fingerprint-fs CLI
//!
//! Command-line interface for fingerprint file operations.
//!
//! Provides commands for:
//! - Counting and listing the fingerprints in a file
//! - Converting between binary, ASCII and compressed formats
//! - Thresholded neighbour searches of queries against targets

use clap::{Parser, Subcommand};
use fingerprint_fs::file::{count_fps_in_file, get_fp_names, read_fp_file, FpReader, FpWriterBuilder};
use fingerprint_fs::fp::neighbours_within;
use fingerprint_fs::{FileFormat, FingerprintOps, FpResult, Session, SessionConfig, SimilarityMode};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fingerprint-fs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Molecular fingerprint file operations")]
#[command(long_about = "fingerprint-fs - Molecular Fingerprint CLI\n\n\
    Reads and writes dense (bit vector) and sparse (fragment number) fingerprints\n\
    in binary and ASCII formats, plain or gzip-compressed, and compares them by\n\
    Tanimoto or Tversky distance.\n\n\
    Format descriptors:\n\
    • FLUSH            binary dense\n\
    • BIN_FRAG_NUMS    binary fragment numbers\n\
    • BITSTRINGS       ASCII dense, e.g. BITSTRINGS,sep=,\n\
    • FRAG_NUMS        ASCII fragment numbers, e.g. FRAG_NUMS,GZ,sep=TAB\n\
    Add FIX_NAMES to an ASCII output format to replace the separator inside names.\n\n\
    Examples:\n\
      fingerprint-fs count -i targets.fpd -f FLUSH\n\
      fingerprint-fs convert -i fps.txt -f BITSTRINGS --bits 166 -o fps.fpd -F FLUSH\n\
      fingerprint-fs search -q queries.fpd -t targets.fpd -f FLUSH --threshold 0.3")]
pub struct Cli {
    /// Dense fingerprint width in bits
    #[arg(long, global = true, value_name = "BITS")]
    bits: Option<u32>,

    /// JSON session settings file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count the fingerprints in a file
    Count {
        /// Input fingerprint file
        #[arg(short, long, value_name = "FILE", help_heading = "Required")]
        input: PathBuf,

        /// Input format descriptor
        #[arg(short, long, default_value = "FLUSH", value_name = "FORMAT")]
        format: FileFormat,
    },

    /// List fingerprint names in file order
    Names {
        /// Input fingerprint file
        #[arg(short, long, value_name = "FILE", help_heading = "Required")]
        input: PathBuf,

        /// Input format descriptor
        #[arg(short, long, default_value = "FLUSH", value_name = "FORMAT")]
        format: FileFormat,
    },

    /// Re-encode a fingerprint file in another format
    #[command(long_about = "Re-encode a fingerprint file in another format\n\n\
        Fingerprints are streamed, so files larger than memory convert fine.\n\
        Both formats must carry the same shape (dense or sparse).\n\n\
        Example:\n\
          fingerprint-fs convert -i fps.txt -f BITSTRINGS,sep=, --bits 1024 -o fps.fpd -F FLUSH,GZ")]
    Convert {
        /// Input fingerprint file
        #[arg(short, long, value_name = "FILE", help_heading = "Required")]
        input: PathBuf,

        /// Input format descriptor
        #[arg(short, long, default_value = "FLUSH", value_name = "FORMAT")]
        format: FileFormat,

        /// Output fingerprint file
        #[arg(short, long, value_name = "FILE", help_heading = "Required")]
        output: PathBuf,

        /// Output format descriptor
        #[arg(short = 'F', long, default_value = "FLUSH", value_name = "FORMAT")]
        output_format: FileFormat,
    },

    /// Find every target within a distance threshold of each query
    #[command(long_about = "Find every target within a distance threshold of each query\n\n\
        Queries are loaded whole; targets are streamed in chunks. Output is one\n\
        line per hit: query name, target name, distance.\n\n\
        Example:\n\
          fingerprint-fs search -q q.fpd -t t.fpd --threshold 0.3 --similarity TVERSKY --alpha 0.9")]
    Search {
        /// Query fingerprint file
        #[arg(short, long, value_name = "FILE", help_heading = "Required")]
        queries: PathBuf,

        /// Target fingerprint file
        #[arg(short, long, value_name = "FILE", help_heading = "Required")]
        targets: PathBuf,

        /// Format descriptor for both files
        #[arg(short, long, default_value = "FLUSH", value_name = "FORMAT")]
        format: FileFormat,

        /// Largest distance reported
        #[arg(long, default_value_t = 0.3, value_name = "DIST")]
        threshold: f64,

        /// TANIMOTO or TVERSKY
        #[arg(long, value_name = "NAME")]
        similarity: Option<SimilarityMode>,

        /// Tversky coefficient in [0, 1]
        #[arg(long, value_name = "ALPHA")]
        alpha: Option<f64>,

        /// Targets held in memory at once
        #[arg(long, default_value_t = 10_000, value_name = "N")]
        chunk_size: usize,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn build_session(config: Option<&PathBuf>, bits: Option<u32>) -> FpResult<Session> {
    let mut session = match config {
        Some(path) => Session::from_config(&SessionConfig::load(path)?)?,
        None => Session::default(),
    };
    if let Some(bits) = bits {
        session.set_num_bits(bits)?;
    }
    Ok(session)
}

fn run() -> FpResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut session = build_session(cli.config.as_ref(), cli.bits)?;

    match cli.command {
        Commands::Count { input, format } => {
            println!("{}", count_fps_in_file(&input, &format)?);
        }

        Commands::Names { input, format } => {
            for name in get_fp_names(&input, &format)? {
                println!("{}", name);
            }
        }

        Commands::Convert {
            input,
            format,
            output,
            output_format,
        } => {
            let start = Instant::now();
            let mut reader = FpReader::open(&input, &format, &mut session)?;
            let mut writer = FpWriterBuilder::new(&output, output_format)
                .with_num_bits(reader.num_bits())
                .create()?;
            for fp in &mut reader {
                writer.write(&fp?)?;
            }
            let written = writer.finish()?;
            info!(
                "Converted {} fingerprints in {:.2}s",
                written,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Search {
            queries,
            targets,
            format,
            threshold,
            similarity,
            alpha,
            chunk_size,
        } => {
            if let Some(mode) = similarity {
                session.set_similarity(mode);
            }
            if let Some(alpha) = alpha {
                session.set_tversky_alpha(alpha)?;
            }
            let start = Instant::now();
            let queries = read_fp_file(&queries, &format, &mut session)?;
            let mut reader = FpReader::open(&targets, &format, &mut session)?;
            let metric = *session.metric();

            let mut offset = 0;
            let mut hits = 0usize;
            loop {
                let chunk = reader.read_chunk(chunk_size.max(1))?;
                if chunk.is_empty() {
                    break;
                }
                debug!("Searching targets {}..{}", offset, offset + chunk.len());
                for query in &queries {
                    for (i, dist) in neighbours_within(query, &chunk, &metric, threshold)? {
                        println!("{} {} {:.4}", query.name(), chunk[i].name(), dist);
                        hits += 1;
                    }
                }
                offset += chunk.len();
            }
            info!(
                "{} hits from {} queries against {} targets in {:.2}s",
                hits,
                queries.len(),
                offset,
                start.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}
