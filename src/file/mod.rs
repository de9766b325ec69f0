//! Fingerprint files: descriptors, streams, codecs, readers and writers
//!
//! # Architecture
//!
//! ```text
//! "BITSTRINGS,GZ,sep=," ─► FileFormat
//!                              │
//! FpInput (plain | gzip) ─► binary / ascii codec ─► FpReader ─► Fingerprint
//! Fingerprint ─► FpWriter ─► binary / ascii codec ─► FpOutput (plain | gzip)
//! ```

pub mod ascii;
pub mod binary;
pub mod format;
pub mod reader;
pub mod stream;
pub mod writer;

pub use ascii::convert_sep_to_new_sep;
pub use binary::{BinaryHeader, Endian};
pub use format::{decode_format_string, Compression, FileFormat, WireFormat, DEFAULT_SEPARATOR};
pub use reader::{count_fps_in_file, get_fp_names, read_fp_file, FpReader, FpReaderBuilder};
pub use stream::{FpInput, FpOutput};
pub use writer::{write_fp_file, FpWriter, FpWriterBuilder};
