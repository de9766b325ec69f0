//! Binary fingerprint records.
//!
//! # Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | format tag (`FPD1` dense, `FPS1` fragments) |
//! | 4 | 4 | bit width (0 for fragment files) |
//! | 8 | var | records |
//!
//! Dense record: `[name_len u32][name][ceil(W/32) × u32]`.
//! Fragment record: `[name_len u32][name][count u32][count × u32]`.
//!
//! Every integer is in the writer's byte order. The reader recognises the
//! tag in either order, which tells it whether to swap.

use std::io::Write;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

use super::format::WireFormat;
use super::stream::FpInput;
use crate::error::{FingerprintError, FpResult};
use crate::fp::{calc_num_words, BitBuffer, DenseFingerprint, Fingerprint, FingerprintOps, SparseFingerprint};

/// Tag for dense files: "FPD1"
pub const FLUSH_DENSE_TAG: u32 = u32::from_le_bytes(*b"FPD1");

/// Tag for fragment-number files: "FPS1"
pub const BINARY_FRAGMENTS_TAG: u32 = u32::from_le_bytes(*b"FPS1");

/// Header size in bytes
pub const HEADER_LEN: usize = 8;

/// Longest name accepted on read
const MAX_NAME_LEN: usize = 1 << 16;

/// Widest dense fingerprint accepted in a header on read
pub const MAX_NUM_BITS: u32 = 1 << 24;

/// Most fragment identifiers accepted in one record on read
const MAX_FRAGMENTS: usize = 1 << 24;

/// Byte order of a binary file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order of this machine
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    /// The other byte order
    pub fn opposite(self) -> Self {
        match self {
            Endian::Little => Endian::Big,
            Endian::Big => Endian::Little,
        }
    }

    fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big => BigEndian::read_u32(bytes),
        }
    }

    fn read_u32_into(self, bytes: &[u8], out: &mut [u32]) {
        match self {
            Endian::Little => LittleEndian::read_u32_into(bytes, out),
            Endian::Big => BigEndian::read_u32_into(bytes, out),
        }
    }

    fn write_u32<W: Write>(self, w: &mut W, v: u32) -> FpResult<()> {
        match self {
            Endian::Little => w.write_u32::<LittleEndian>(v)?,
            Endian::Big => w.write_u32::<BigEndian>(v)?,
        }
        Ok(())
    }
}

fn tag_for(wire: WireFormat) -> Option<u32> {
    match wire {
        WireFormat::FlushDense => Some(FLUSH_DENSE_TAG),
        WireFormat::BinaryFragments => Some(BINARY_FRAGMENTS_TAG),
        _ => None,
    }
}

fn wire_for(tag: u32) -> Option<WireFormat> {
    match tag {
        FLUSH_DENSE_TAG => Some(WireFormat::FlushDense),
        BINARY_FRAGMENTS_TAG => Some(WireFormat::BinaryFragments),
        _ => None,
    }
}

/// Decoded file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryHeader {
    pub wire: WireFormat,
    /// Dense width in bits, 0 for fragment files
    pub num_bits: u32,
    /// Byte order of everything after (and including) the header
    pub endian: Endian,
}

impl BinaryHeader {
    /// True if the file's byte order differs from this machine's
    pub fn byte_swapping(&self) -> bool {
        self.endian != Endian::native()
    }

    /// Write the header in `self.endian`
    pub fn write<W: Write>(&self, w: &mut W) -> FpResult<()> {
        let tag = tag_for(self.wire).ok_or(FingerprintError::WrongCodec {
            format: self.wire.token(),
            codec: "binary",
        })?;
        self.endian.write_u32(w, tag)?;
        self.endian.write_u32(w, self.num_bits)?;
        Ok(())
    }

    /// Read and validate the header at the start of `input`
    ///
    /// `forced_swap` overrides byte-order detection: `Some(true)` reads the
    /// file as non-native, `Some(false)` as native.
    pub fn read(input: &mut FpInput, expected: WireFormat, forced_swap: Option<bool>) -> FpResult<Self> {
        let mut buf = [0u8; HEADER_LEN];
        let got = input.read_up_to(&mut buf)?;
        if got < HEADER_LEN {
            return Err(mismatch(input.path(), expected, "a file too short for a header"));
        }

        let candidates = match forced_swap {
            Some(true) => vec![Endian::native().opposite()],
            Some(false) => vec![Endian::native()],
            None => vec![Endian::native(), Endian::native().opposite()],
        };

        for endian in candidates.iter().copied() {
            let tag = endian.read_u32(&buf[0..4]);
            match wire_for(tag) {
                Some(wire) if wire == expected => {
                    let num_bits = endian.read_u32(&buf[4..8]);
                    if wire == WireFormat::FlushDense && num_bits > MAX_NUM_BITS {
                        return Err(FingerprintError::MalformedRecord(format!(
                            "{} declares {} bits per fingerprint, more than {}",
                            input.path().display(),
                            num_bits,
                            MAX_NUM_BITS
                        )));
                    }
                    return Ok(Self {
                        wire,
                        num_bits,
                        endian,
                    });
                }
                Some(other) => return Err(mismatch(input.path(), expected, other.token())),
                None => continue,
            }
        }
        Err(mismatch(input.path(), expected, "an unrecognised or ASCII format"))
    }
}

fn mismatch(path: &Path, expected: WireFormat, found: &str) -> FingerprintError {
    FingerprintError::FormatMismatch {
        path: path.to_path_buf(),
        expected: expected.token().to_string(),
        found: found.to_string(),
    }
}

/// Bytes one record of `fp` occupies
pub fn record_len(fp: &Fingerprint) -> usize {
    let payload = match fp {
        Fingerprint::Dense(d) => d.bits().num_words() * 4,
        Fingerprint::Sparse(s) => 4 + s.len() * 4,
    };
    4 + fp.name().len() + payload
}

/// Append one record in the header's layout
pub fn write_record<W: Write>(w: &mut W, fp: &Fingerprint, header: &BinaryHeader) -> FpResult<()> {
    let endian = header.endian;
    match (header.wire, fp) {
        (WireFormat::FlushDense, Fingerprint::Dense(d)) => {
            if d.num_bits() != header.num_bits {
                return Err(FingerprintError::WidthMismatch {
                    expected: header.num_bits,
                    actual: d.num_bits(),
                });
            }
            write_name(w, fp.name(), endian)?;
            for &word in d.bits().words() {
                endian.write_u32(w, word)?;
            }
        }
        (WireFormat::BinaryFragments, Fingerprint::Sparse(s)) => {
            write_name(w, fp.name(), endian)?;
            endian.write_u32(w, s.len() as u32)?;
            for &frag in s.frag_nums() {
                endian.write_u32(w, frag)?;
            }
        }
        (wire, _) if wire.is_binary() => {
            return Err(FingerprintError::ShapeMismatch {
                format: wire.token(),
                shape: fp.shape().label(),
            })
        }
        (wire, _) => {
            return Err(FingerprintError::WrongCodec {
                format: wire.token(),
                codec: "binary",
            })
        }
    }
    Ok(())
}

fn write_name<W: Write>(w: &mut W, name: &str, endian: Endian) -> FpResult<()> {
    endian.write_u32(w, name.len() as u32)?;
    w.write_all(name.as_bytes())?;
    Ok(())
}

/// Fill `buf` completely or report a truncated record
fn read_exact_record(input: &mut FpInput, buf: &mut [u8]) -> FpResult<()> {
    let got = input.read_up_to(buf)?;
    if got < buf.len() {
        return Err(FingerprintError::TruncatedRecord {
            expected: buf.len(),
            actual: got,
        });
    }
    Ok(())
}

/// Read a u32 field inside a record
fn read_field(input: &mut FpInput, endian: Endian) -> FpResult<u32> {
    let mut buf = [0u8; 4];
    read_exact_record(input, &mut buf)?;
    Ok(endian.read_u32(&buf))
}

/// Read the leading name length; `None` on a clean end of file
fn read_name_len(input: &mut FpInput, endian: Endian) -> FpResult<Option<usize>> {
    let mut buf = [0u8; 4];
    match input.read_up_to(&mut buf)? {
        0 => Ok(None),
        4 => {
            let len = endian.read_u32(&buf) as usize;
            if len > MAX_NAME_LEN {
                return Err(FingerprintError::MalformedRecord(format!(
                    "name length {} exceeds {}",
                    len, MAX_NAME_LEN
                )));
            }
            Ok(Some(len))
        }
        n => Err(FingerprintError::TruncatedRecord {
            expected: 4,
            actual: n,
        }),
    }
}

fn read_words(input: &mut FpInput, count: usize, endian: Endian) -> FpResult<Vec<u32>> {
    let mut bytes = vec![0u8; count * 4];
    read_exact_record(input, &mut bytes)?;
    let mut words = vec![0u32; count];
    endian.read_u32_into(&bytes, &mut words);
    Ok(words)
}

fn read_fragment_count(input: &mut FpInput, endian: Endian) -> FpResult<usize> {
    let count = read_field(input, endian)? as usize;
    if count > MAX_FRAGMENTS {
        return Err(FingerprintError::MalformedRecord(format!(
            "fragment count {} exceeds {}",
            count, MAX_FRAGMENTS
        )));
    }
    Ok(count)
}

/// Decode the next record
///
/// `Ok(None)` means the file ended cleanly on a record boundary.
pub fn read_record(input: &mut FpInput, header: &BinaryHeader) -> FpResult<Option<Fingerprint>> {
    let endian = header.endian;
    let Some(name_len) = read_name_len(input, endian)? else {
        return Ok(None);
    };
    let mut name = vec![0u8; name_len];
    read_exact_record(input, &mut name)?;
    let name = String::from_utf8(name)
        .map_err(|_| FingerprintError::MalformedRecord("fingerprint name is not UTF-8".into()))?;

    let fp = match header.wire {
        WireFormat::FlushDense => {
            let words = read_words(input, calc_num_words(header.num_bits), endian)?;
            let bits = BitBuffer::from_words(header.num_bits, words)?;
            Fingerprint::Dense(DenseFingerprint::new(name, bits))
        }
        WireFormat::BinaryFragments => {
            let count = read_fragment_count(input, endian)?;
            let frags = read_words(input, count, endian)?;
            Fingerprint::Sparse(SparseFingerprint::new(name, frags))
        }
        wire => {
            return Err(FingerprintError::WrongCodec {
                format: wire.token(),
                codec: "binary",
            })
        }
    };
    Ok(Some(fp))
}

/// Skip the next record, returning its name; `None` on a clean end of file
pub fn skip_record(input: &mut FpInput, header: &BinaryHeader) -> FpResult<Option<String>> {
    let endian = header.endian;
    let Some(name_len) = read_name_len(input, endian)? else {
        return Ok(None);
    };
    let mut name = vec![0u8; name_len];
    read_exact_record(input, &mut name)?;

    let payload = match header.wire {
        WireFormat::FlushDense => calc_num_words(header.num_bits) * 4,
        _ => read_fragment_count(input, endian)? * 4,
    };
    let skipped = input.skip(payload as u64)? as usize;
    if skipped < payload {
        return Err(FingerprintError::TruncatedRecord {
            expected: payload,
            actual: skipped,
        });
    }
    Ok(Some(String::from_utf8_lossy(&name).into_owned()))
}
