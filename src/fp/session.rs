//! Per-run fingerprint settings.
//!
//! A [`Session`] carries the Dense width and the similarity metric that every
//! reader, parser and distance call of one run shares. Nothing in the crate
//! keeps these as globals; drivers create one session and pass it down.
//!
//! # Width lock
//!
//! The width may change freely until the session issues its first Dense
//! fingerprint (a zero fingerprint, a parsed bitstring, or a Dense reader).
//! After that, [`Session::set_num_bits`] with a different value fails with
//! [`FingerprintError::WidthReconfiguration`].
//!
//! # Example
//!
//! ```
//! use fingerprint_fs::fp::{Session, SimilarityMode};
//!
//! let session = Session::new(8).with_similarity(SimilarityMode::Tversky);
//! let a = session.dense_from_bitstring("a", "11110000").unwrap();
//! let b = session.dense_from_bitstring("b", "11001100").unwrap();
//! let d = session.distance(&a, &b).unwrap();
//! assert!((d - 0.5).abs() < 1e-12);
//! ```

use std::cell::Cell;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bits::calc_num_words;
use super::fingerprint::{DenseFingerprint, Fingerprint};
use super::similarity::{Metric, SimilarityMode, DEFAULT_TVERSKY_ALPHA};
use crate::error::{FingerprintError, FpResult};
use crate::file::format::{decode_format_string, FileFormat};

/// Width used when no configuration names one
pub const DEFAULT_NUM_BITS: u32 = 1024;

/// Settings shared by everything that touches fingerprints in one run
#[derive(Debug, Clone)]
pub struct Session {
    num_bits: u32,
    metric: Metric,
    width_locked: Cell<bool>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_BITS)
    }
}

impl Session {
    /// Unlocked session with Tanimoto distances
    pub fn new(num_bits: u32) -> Self {
        Self {
            num_bits,
            metric: Metric::tanimoto(),
            width_locked: Cell::new(false),
        }
    }

    pub fn with_similarity(mut self, mode: SimilarityMode) -> Self {
        self.metric.mode = mode;
        self
    }

    /// Set the Tversky coefficient, clamped to `[0, 1]`
    pub fn with_tversky_alpha(mut self, alpha: f64) -> Self {
        self.metric.tversky_alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Build from validated settings
    pub fn from_config(config: &SessionConfig) -> FpResult<Self> {
        config.validate()?;
        let mode: SimilarityMode = config.similarity.parse()?;
        let mut session = Self::new(config.num_bits).with_similarity(mode);
        session.metric.tversky_alpha = config.tversky_alpha;
        Ok(session)
    }

    /// Dense width in bits
    #[inline]
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Storage words per Dense fingerprint
    #[inline]
    pub fn num_words(&self) -> usize {
        calc_num_words(self.num_bits)
    }

    /// Change the Dense width
    ///
    /// Setting the current value again is always allowed.
    pub fn set_num_bits(&mut self, num_bits: u32) -> FpResult<()> {
        if num_bits == self.num_bits {
            return Ok(());
        }
        if self.width_locked.get() {
            return Err(FingerprintError::WidthReconfiguration {
                current: self.num_bits,
                requested: num_bits,
            });
        }
        debug!("Fingerprint width {} -> {} bits", self.num_bits, num_bits);
        self.num_bits = num_bits;
        Ok(())
    }

    /// Freeze the width
    pub fn lock_width(&self) {
        if !self.width_locked.replace(true) {
            debug!("Fingerprint width locked at {} bits", self.num_bits);
        }
    }

    pub fn is_width_locked(&self) -> bool {
        self.width_locked.get()
    }

    /// Active metric
    #[inline]
    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    pub fn set_similarity(&mut self, mode: SimilarityMode) {
        self.metric.mode = mode;
    }

    /// Set the Tversky coefficient; must lie in `[0, 1]`
    pub fn set_tversky_alpha(&mut self, alpha: f64) -> FpResult<()> {
        check_alpha(alpha)?;
        self.metric.tversky_alpha = alpha;
        Ok(())
    }

    /// All-zero Dense fingerprint of the session width
    pub fn zero_fingerprint(&self, name: impl Into<String>) -> Fingerprint {
        self.lock_width();
        DenseFingerprint::zero(name, self.num_bits).into()
    }

    /// Dense fingerprint from a bitstring of exactly the session width
    pub fn dense_from_bitstring(&self, name: impl Into<String>, bitstring: &str) -> FpResult<Fingerprint> {
        let fp = DenseFingerprint::from_bitstring(name, bitstring, self.num_bits)?;
        self.lock_width();
        Ok(fp.into())
    }

    fn check_width(&self, fp: &Fingerprint) -> FpResult<()> {
        match fp {
            Fingerprint::Dense(d) if d.num_bits() != self.num_bits => Err(FingerprintError::WidthMismatch {
                expected: self.num_bits,
                actual: d.num_bits(),
            }),
            _ => Ok(()),
        }
    }

    /// Exact distance under the session metric
    pub fn distance(&self, a: &Fingerprint, b: &Fingerprint) -> FpResult<f64> {
        self.check_width(a)?;
        self.check_width(b)?;
        a.distance(b, &self.metric)
    }

    /// Thresholded distance under the session metric
    pub fn distance_within(&self, a: &Fingerprint, b: &Fingerprint, threshold: f64) -> FpResult<f64> {
        self.check_width(a)?;
        self.check_width(b)?;
        a.distance_within(b, &self.metric, threshold)
    }
}

fn check_alpha(alpha: f64) -> FpResult<()> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(FingerprintError::InvalidConfig(format!(
            "tversky_alpha {} is outside [0, 1]",
            alpha
        )));
    }
    Ok(())
}

// =============================================================================
// SERIALIZED SETTINGS
// =============================================================================

/// Session settings as stored on disk or shipped to worker processes
///
/// Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub num_bits: u32,
    /// `TANIMOTO` or `TVERSKY`
    pub similarity: String,
    pub tversky_alpha: f64,
    /// Descriptor string, e.g. `"BITSTRINGS,sep=,"`
    pub input_format: String,
    pub output_format: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            num_bits: DEFAULT_NUM_BITS,
            similarity: SimilarityMode::Tanimoto.to_string(),
            tversky_alpha: DEFAULT_TVERSKY_ALPHA,
            input_format: "FLUSH".to_string(),
            output_format: "FLUSH".to_string(),
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON settings file
    pub fn load(path: impl AsRef<Path>) -> FpResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FingerprintError::open(path, "reading", e))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| FingerprintError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        debug!("Loaded session settings from {}", path.display());
        Ok(config)
    }

    /// Write as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> FpResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| FingerprintError::open(path, "writing", e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| FingerprintError::InvalidConfig(e.to_string()))?;
        Ok(())
    }

    /// Check every field
    pub fn validate(&self) -> FpResult<()> {
        if self.num_bits == 0 {
            return Err(FingerprintError::InvalidConfig("num_bits must be positive".into()));
        }
        check_alpha(self.tversky_alpha)?;
        self.similarity.parse::<SimilarityMode>()?;
        decode_format_string(&self.input_format)?;
        decode_format_string(&self.output_format)?;
        Ok(())
    }

    pub fn input_format(&self) -> FpResult<FileFormat> {
        decode_format_string(&self.input_format)
    }

    pub fn output_format(&self) -> FpResult<FileFormat> {
        decode_format_string(&self.output_format)
    }

    /// Compact encoding for handing settings to another process
    pub fn to_transport_bytes(&self) -> FpResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| FingerprintError::InvalidConfig(e.to_string()))
    }

    /// Inverse of [`SessionConfig::to_transport_bytes`]; the result is validated
    pub fn from_transport_bytes(bytes: &[u8]) -> FpResult<Self> {
        let config: Self =
            bincode::deserialize(bytes).map_err(|e| FingerprintError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl From<&Session> for SessionConfig {
    fn from(session: &Session) -> Self {
        Self {
            num_bits: session.num_bits,
            similarity: session.metric.mode.to_string(),
            tversky_alpha: session.metric.tversky_alpha,
            ..Self::default()
        }
    }
}
