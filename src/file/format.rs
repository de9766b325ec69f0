//! Fingerprint file format descriptors
//!
//! A descriptor names the wire format, whether the stream is gzip-compressed
//! and, for ASCII files, the field separator. Drivers pass descriptors as
//! strings such as `"FLUSH"`, `"BITSTRINGS,sep=,"` or `"FRAG_NUMS,GZ,sep=TAB"`.
//!
//! # Grammar
//!
//! ```text
//! descriptor := token ("," token)* ["," "sep=" separator]
//! token      := wire format name | "GZ" | "GZIP" | "COMPRESSED" | "PLAIN"
//!             | "FIX_NAMES"
//! separator  := "SPACE" | "TAB" | "COMMA" | any literal text
//! ```
//!
//! Tokens are case-insensitive. `sep=` must come last because the separator
//! may itself contain commas; everything after it is taken literally.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FingerprintError, FpResult};
use crate::fp::Shape;

/// Separator used when a descriptor does not name one
pub const DEFAULT_SEPARATOR: &str = " ";

/// Record encoding on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireFormat {
    /// Binary dense bit vectors ("flush" fingerprints)
    FlushDense,
    /// Binary fragment-number lists
    BinaryFragments,
    /// One `name<sep>0101...` line per fingerprint
    AsciiBitstring,
    /// One `name<sep>id<sep>id...` line per fingerprint
    AsciiFragments,
}

impl WireFormat {
    /// True for the two binary formats
    pub fn is_binary(self) -> bool {
        matches!(self, WireFormat::FlushDense | WireFormat::BinaryFragments)
    }

    /// Shape of the fingerprints this format carries
    pub fn shape(self) -> Shape {
        match self {
            WireFormat::FlushDense | WireFormat::AsciiBitstring => Shape::Dense,
            WireFormat::BinaryFragments | WireFormat::AsciiFragments => Shape::Sparse,
        }
    }

    /// Canonical descriptor token
    pub fn token(self) -> &'static str {
        match self {
            WireFormat::FlushDense => "FLUSH",
            WireFormat::BinaryFragments => "BIN_FRAG_NUMS",
            WireFormat::AsciiBitstring => "BITSTRINGS",
            WireFormat::AsciiFragments => "FRAG_NUMS",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "FLUSH" | "FLUSH_FPS" | "BIN" | "BINARY" => Some(WireFormat::FlushDense),
            "BIN_FRAG_NUMS" | "BINFRAG" | "BIN_FRAGS" => Some(WireFormat::BinaryFragments),
            "BITSTRINGS" | "BITSTRING" | "ASCII" => Some(WireFormat::AsciiBitstring),
            "FRAG_NUMS" | "FRAGS" => Some(WireFormat::AsciiFragments),
            _ => None,
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Stream compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compression {
    Plain,
    Gzip,
}

/// Complete description of a fingerprint file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileFormat {
    pub wire: WireFormat,
    /// `None` detects on read and writes plain
    pub compression: Option<Compression>,
    /// ASCII field separator; ignored by the binary formats
    pub separator: String,
    /// Replace the separator inside names with `_` when writing ASCII,
    /// instead of failing with [`FingerprintError::SeparatorInName`]
    pub fix_names: bool,
}

impl FileFormat {
    /// Descriptor with default compression handling and separator
    pub fn new(wire: WireFormat) -> Self {
        Self {
            wire,
            compression: None,
            separator: DEFAULT_SEPARATOR.to_string(),
            fix_names: false,
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_fixed_names(mut self, fix_names: bool) -> Self {
        self.fix_names = fix_names;
        self
    }

    /// Compression used when writing
    pub fn write_compression(&self) -> Compression {
        self.compression.unwrap_or(Compression::Plain)
    }
}

/// Parse a format descriptor string
///
/// Any unknown token fails with [`FingerprintError::FormatDecode`] carrying
/// `format_string` unchanged.
pub fn decode_format_string(format_string: &str) -> FpResult<FileFormat> {
    let bad = || FingerprintError::FormatDecode(format_string.to_string());

    let (head, separator) = match find_sep_key(format_string) {
        Some(pos) => {
            let raw = &format_string[pos + 4..];
            if raw.is_empty() {
                return Err(bad());
            }
            (&format_string[..pos], Some(decode_separator(raw)))
        }
        None => (format_string, None),
    };

    let mut wire = None;
    let mut compression = None;
    let mut fix_names = false;
    for token in head.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let upper = token.to_ascii_uppercase();
        if let Some(w) = WireFormat::from_token(&upper) {
            if wire.replace(w).is_some() {
                return Err(bad());
            }
            continue;
        }
        match upper.as_str() {
            "GZ" | "GZIP" | "COMPRESSED" => compression = Some(Compression::Gzip),
            "PLAIN" | "UNCOMPRESSED" => compression = Some(Compression::Plain),
            "FIX_NAMES" => fix_names = true,
            _ => return Err(bad()),
        }
    }

    Ok(FileFormat {
        wire: wire.ok_or_else(bad)?,
        compression,
        separator: separator.unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        fix_names,
    })
}

/// Byte offset of a `sep=` key that starts a token
fn find_sep_key(s: &str) -> Option<usize> {
    let lower = s.to_ascii_lowercase();
    let mut from = 0;
    while let Some(rel) = lower[from..].find("sep=") {
        let pos = from + rel;
        if pos == 0 || s.as_bytes()[pos - 1] == b',' {
            return Some(pos);
        }
        from = pos + 4;
    }
    None
}

fn decode_separator(raw: &str) -> String {
    match raw.to_ascii_uppercase().as_str() {
        "SPACE" => " ".to_string(),
        "TAB" => "\t".to_string(),
        "COMMA" => ",".to_string(),
        _ => raw.to_string(),
    }
}

fn encode_separator(sep: &str) -> &str {
    match sep {
        " " => "SPACE",
        "\t" => "TAB",
        _ => sep,
    }
}

impl FromStr for FileFormat {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_format_string(s)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire)?;
        match self.compression {
            Some(Compression::Gzip) => write!(f, ",GZ")?,
            Some(Compression::Plain) => write!(f, ",PLAIN")?,
            None => {}
        }
        if self.fix_names {
            write!(f, ",FIX_NAMES")?;
        }
        if !self.wire.is_binary() {
            write!(f, ",sep={}", encode_separator(&self.separator))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_tokens() {
        let f = decode_format_string("FLUSH").unwrap();
        assert_eq!(f.wire, WireFormat::FlushDense);
        assert_eq!(f.compression, None);
        assert_eq!(f.separator, " ");

        let f = decode_format_string("frag_nums").unwrap();
        assert_eq!(f.wire, WireFormat::AsciiFragments);
    }

    #[test]
    fn test_comma_separator() {
        let f = decode_format_string("BIN,sep=,").unwrap();
        assert_eq!(f.wire, WireFormat::FlushDense);
        assert_eq!(f.separator, ",");

        let f = decode_format_string("BITSTRINGS,sep=,").unwrap();
        assert_eq!(f.wire, WireFormat::AsciiBitstring);
        assert_eq!(f.separator, ",");
    }

    #[test]
    fn test_named_separators_and_compression() {
        let f = decode_format_string("FRAG_NUMS,GZ,sep=TAB").unwrap();
        assert_eq!(f.compression, Some(Compression::Gzip));
        assert_eq!(f.separator, "\t");

        let f = decode_format_string("bin_frag_nums,plain").unwrap();
        assert_eq!(f.wire, WireFormat::BinaryFragments);
        assert_eq!(f.compression, Some(Compression::Plain));
    }

    #[test]
    fn test_fix_names_token() {
        let f = decode_format_string("frag_nums,fix_names,sep=,").unwrap();
        assert!(f.fix_names);
        assert_eq!(f.separator, ",");
        assert!(!decode_format_string("FRAG_NUMS").unwrap().fix_names);
    }

    #[test]
    fn test_multi_character_separator() {
        let f = decode_format_string("BITSTRINGS,sep=::").unwrap();
        assert_eq!(f.separator, "::");
    }

    #[test]
    fn test_unknown_token_carries_whole_string() {
        let result = decode_format_string("BITSTRINGS,ZIP");
        assert!(matches!(result, Err(FingerprintError::FormatDecode(s)) if s == "BITSTRINGS,ZIP"));
    }

    #[test]
    fn test_missing_or_duplicate_wire_format() {
        assert!(decode_format_string("GZ").is_err());
        assert!(decode_format_string("").is_err());
        assert!(decode_format_string("FLUSH,FRAG_NUMS").is_err());
        assert!(decode_format_string("FLUSH,sep=").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for s in ["FLUSH", "BIN_FRAG_NUMS,GZ", "BITSTRINGS,sep=,", "FRAG_NUMS,PLAIN,sep=TAB", "BITSTRINGS,FIX_NAMES"] {
            let f = decode_format_string(s).unwrap();
            assert_eq!(decode_format_string(&f.to_string()).unwrap(), f);
        }
    }

    #[test]
    fn test_wire_shape() {
        assert_eq!(WireFormat::FlushDense.shape(), Shape::Dense);
        assert_eq!(WireFormat::AsciiFragments.shape(), Shape::Sparse);
        assert!(WireFormat::BinaryFragments.is_binary());
        assert!(!WireFormat::AsciiBitstring.is_binary());
    }
}
