//! Line-oriented text records.
//!
//! Each line is `name<sep>payload`. Bitstring payloads are `W` characters of
//! `0`/`1`; separators between bit characters are tolerated on read. Fragment
//! payloads are separator-delimited decimal identifiers.

use std::borrow::Cow;

use super::format::WireFormat;
use crate::error::{FingerprintError, FpResult};
use crate::fp::{DenseFingerprint, Fingerprint, FingerprintOps, SparseFingerprint};

/// Replace every occurrence of `sep` in `ins` with `new_sep`
pub fn convert_sep_to_new_sep(ins: &str, sep: &str, new_sep: &str) -> String {
    if sep.is_empty() || sep == new_sep {
        return ins.to_string();
    }
    ins.replace(sep, new_sep)
}

/// Split a line into name and payload; blank lines yield `None`
///
/// A line without the separator is all name and an empty payload.
pub fn split_line<'a>(line: &'a str, sep: &str) -> Option<(&'a str, &'a str)> {
    if line.trim().is_empty() {
        return None;
    }
    match line.split_once(sep) {
        Some(parts) if !sep.is_empty() => Some(parts),
        _ => Some((line, "")),
    }
}

/// Decode one line; blank lines yield `None`
///
/// `num_bits` is only consulted for bitstring payloads.
pub fn parse_line(line: &str, wire: WireFormat, sep: &str, num_bits: u32) -> FpResult<Option<Fingerprint>> {
    let Some((name, payload)) = split_line(line, sep) else {
        return Ok(None);
    };

    let fp = match wire {
        WireFormat::AsciiBitstring => {
            let bits = convert_sep_to_new_sep(payload, sep, "");
            DenseFingerprint::from_bitstring(name, bits.trim(), num_bits)?.into()
        }
        WireFormat::AsciiFragments => {
            let spaced = convert_sep_to_new_sep(payload, sep, " ");
            let frags = spaced
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<u32>().map_err(|_| FingerprintError::BadFragmentNumber {
                        name: name.to_string(),
                        token: tok.to_string(),
                    })
                })
                .collect::<FpResult<Vec<u32>>>()?;
            SparseFingerprint::new(name, frags).into()
        }
        wire => {
            return Err(FingerprintError::WrongCodec {
                format: wire.token(),
                codec: "ascii",
            })
        }
    };
    Ok(Some(fp))
}

/// Name as it will appear on an ASCII line
///
/// A name holding `sep` would split at the wrong place on read. With
/// `fix_names` the separator is replaced by `_` (or `-` when `_` is itself
/// part of the separator); otherwise the name is rejected.
pub fn line_safe_name<'a>(name: &'a str, sep: &str, fix_names: bool) -> FpResult<Cow<'a, str>> {
    if sep.is_empty() || !name.contains(sep) {
        return Ok(Cow::Borrowed(name));
    }
    let rejected = || FingerprintError::SeparatorInName {
        name: name.to_string(),
        separator: sep.to_string(),
    };
    if !fix_names {
        return Err(rejected());
    }
    let fixed = name.replace(sep, if sep.contains('_') { "-" } else { "_" });
    if fixed.contains(sep) {
        return Err(rejected());
    }
    Ok(Cow::Owned(fixed))
}

/// Encode one fingerprint as a line, without the trailing newline
pub fn format_line(fp: &Fingerprint, wire: WireFormat, sep: &str, fix_names: bool) -> FpResult<String> {
    let name = line_safe_name(fp.name(), sep, fix_names);
    match (wire, fp) {
        (WireFormat::AsciiBitstring, Fingerprint::Dense(d)) => {
            Ok(format!("{}{}{}", name?, sep, d.bits().to_bitstring()))
        }
        (WireFormat::AsciiFragments, Fingerprint::Sparse(s)) => {
            let mut line = name?.into_owned();
            for frag in s.frag_nums() {
                line.push_str(sep);
                line.push_str(&frag.to_string());
            }
            Ok(line)
        }
        (wire, _) if !wire.is_binary() => Err(FingerprintError::ShapeMismatch {
            format: wire.token(),
            shape: fp.shape().label(),
        }),
        (wire, _) => Err(FingerprintError::WrongCodec {
            format: wire.token(),
            codec: "ascii",
        }),
    }
}
