//! Fingerprint error types
//!
//! Every fallible operation in the crate returns [`FpResult`]. Decode errors
//! are returned to the reader that hit them; the reader then stops yielding
//! records, so no half-decoded fingerprint ever reaches a collection.

use std::io;
use std::path::PathBuf;

/// Result type for fingerprint operations
pub type FpResult<T> = Result<T, FingerprintError>;

/// Errors that can occur while decoding, storing or comparing fingerprints
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// Unrecognised token in a file format descriptor string
    ///
    /// Carries the whole descriptor exactly as supplied.
    #[error("Bad input format specifier string : {0}")]
    FormatDecode(String),

    /// Unrecognised similarity calculation name
    #[error("Bad distance calculation specifier string : {0}")]
    UnknownSimilarity(String),

    /// A fingerprint file could not be opened
    ///
    /// # Common Causes
    /// - File not found
    /// - Permission denied
    /// - Output directory missing (for writes)
    #[error("Couldn't open {path:?} for {mode}: {source}")]
    FileOpen {
        path: PathBuf,
        mode: &'static str,
        #[source]
        source: io::Error,
    },

    /// The binary header names a different format than the one expected
    ///
    /// # Common Causes
    /// - Reading a fragment-number file as a dense file or vice versa
    /// - Reading an ASCII file with a binary format descriptor
    #[error("File {path:?} was expected to be {expected} but appears to be {found}")]
    FormatMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// A binary record ended before all its declared bytes were read
    ///
    /// The file is abandoned; reading does not resume mid-record.
    #[error("Truncated record: expected {expected} bytes, got {actual}")]
    TruncatedRecord { expected: usize, actual: usize },

    /// An ASCII bitstring does not match the configured width
    #[error("Bitstring for {name} has {actual} bits, expected {expected}")]
    BitstringLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A fragment identifier in an ASCII record is not a number
    #[error("Bad fragment number {token:?} in fingerprint {name}")]
    BadFragmentNumber { name: String, token: String },

    /// Distance or combination requested between a Dense and a Sparse fingerprint
    #[error("Incompatible fingerprint types for operation {0}.")]
    IncompatibleOperands(&'static str),

    /// A fingerprint's shape does not match the file format it is written to
    ///
    /// # Common Causes
    /// - Writing Sparse fingerprints to a `FLUSH` or `BITSTRINGS` file
    /// - Writing Dense fingerprints to a fragment-number file
    #[error("Format {format} cannot hold a {shape} fingerprint")]
    ShapeMismatch {
        format: &'static str,
        shape: &'static str,
    },

    /// A codec was handed a format it does not encode
    #[error("Format {format} is not handled by the {codec} codec")]
    WrongCodec {
        format: &'static str,
        codec: &'static str,
    },

    /// A name holds the ASCII field separator and would not read back intact
    ///
    /// Enable name fixing on the format (`FIX_NAMES`) to replace the
    /// separator with `_` on write.
    #[error("Fingerprint name {name:?} contains the field separator {separator:?}")]
    SeparatorInName { name: String, separator: String },

    /// Attempt to change the width after Dense fingerprints were issued
    #[error("Can't change fingerprint width from {current} to {requested} bits once dense fingerprints exist")]
    WidthReconfiguration { current: u32, requested: u32 },

    /// Two Dense fingerprints, or a record and the session, disagree on width
    #[error("Fingerprint width mismatch: expected {expected} bits, got {actual}")]
    WidthMismatch { expected: u32, actual: u32 },

    /// A textual representation or transport payload could not be parsed
    #[error("Malformed fingerprint record: {0}")]
    MalformedRecord(String),

    /// Session settings failed validation or (de)serialization
    #[error("Invalid session settings: {0}")]
    InvalidConfig(String),

    /// I/O error reading or writing an already open stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FingerprintError {
    /// Wrap an open failure with the path and direction
    pub(crate) fn open(path: impl Into<PathBuf>, mode: &'static str, source: io::Error) -> Self {
        FingerprintError::FileOpen {
            path: path.into(),
            mode,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_decode_carries_string_verbatim() {
        let err = FingerprintError::FormatDecode("BIN,wibble".to_string());
        assert_eq!(
            err.to_string(),
            "Bad input format specifier string : BIN,wibble"
        );
    }

    #[test]
    fn test_incompatible_names_operation() {
        let err = FingerprintError::IncompatibleOperands("distance");
        assert_eq!(
            err.to_string(),
            "Incompatible fingerprint types for operation distance."
        );
    }

    #[test]
    fn test_shape_mismatch_names_format_and_shape() {
        let err = FingerprintError::ShapeMismatch {
            format: "FLUSH",
            shape: "sparse",
        };
        assert_eq!(err.to_string(), "Format FLUSH cannot hold a sparse fingerprint");
    }

    #[test]
    fn test_file_open_keeps_source() {
        use std::error::Error;

        let err = FingerprintError::open(
            "/no/such/file.fps",
            "reading",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("reading"));
    }
}
