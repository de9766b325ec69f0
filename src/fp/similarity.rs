//! Tanimoto and Tversky distances, exact and thresholded.
//!
//! All distances are `1 - similarity` and computed from three counts:
//! `a = |A|`, `b = |B|` and `c = |A ∩ B|`. Two empty operands have
//! distance 0.0 by convention (the ratio would otherwise be 0/0).
//!
//! The thresholded form bounds the best achievable similarity from `a` and
//! `b` alone (`c <= min(a, b)`) and returns [`MAX_DISTANCE`] without touching
//! the payloads when even that bound is beyond the threshold.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::fingerprint::{DenseFingerprint, Fingerprint, SparseFingerprint};
use crate::error::{FingerprintError, FpResult};

/// Distance returned by thresholded calls that reject early
pub const MAX_DISTANCE: f64 = 1.0;

/// Default Tversky asymmetry coefficient
pub const DEFAULT_TVERSKY_ALPHA: f64 = 0.5;

/// Similarity calculation selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimilarityMode {
    #[default]
    Tanimoto,
    Tversky,
}

impl FromStr for SimilarityMode {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TANIMOTO" => Ok(SimilarityMode::Tanimoto),
            "TVERSKY" => Ok(SimilarityMode::Tversky),
            _ => Err(FingerprintError::UnknownSimilarity(s.to_string())),
        }
    }
}

impl fmt::Display for SimilarityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMode::Tanimoto => write!(f, "TANIMOTO"),
            SimilarityMode::Tversky => write!(f, "TVERSKY"),
        }
    }
}

/// A similarity mode together with its Tversky coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub mode: SimilarityMode,
    pub tversky_alpha: f64,
}

impl Default for Metric {
    fn default() -> Self {
        Self::tanimoto()
    }
}

impl Metric {
    pub fn tanimoto() -> Self {
        Self {
            mode: SimilarityMode::Tanimoto,
            tversky_alpha: DEFAULT_TVERSKY_ALPHA,
        }
    }

    pub fn tversky(alpha: f64) -> Self {
        Self {
            mode: SimilarityMode::Tversky,
            tversky_alpha: alpha,
        }
    }

    /// Exact distance from the three counts
    pub fn distance_from_counts(&self, a: u32, b: u32, common: u32) -> f64 {
        debug_assert!(common <= a.min(b));
        match self.mode {
            SimilarityMode::Tanimoto => tanimoto_distance(a, b, common),
            SimilarityMode::Tversky => tversky_distance(a, b, common, self.tversky_alpha),
        }
    }

    /// Smallest distance any pair with these counts can have
    ///
    /// Only meaningful for `0 <= alpha <= 1`; outside that range the Tversky
    /// ratio is not monotonic in `c` and the bound is 0.0 (never rejects).
    pub fn lower_bound(&self, a: u32, b: u32) -> f64 {
        if self.mode == SimilarityMode::Tversky && !(0.0..=1.0).contains(&self.tversky_alpha) {
            return 0.0;
        }
        self.distance_from_counts(a, b, a.min(b))
    }

    /// Thresholded distance; `common` runs only if the bound passes
    fn within<F>(&self, a: u32, b: u32, threshold: f64, common: F) -> f64
    where
        F: FnOnce() -> u32,
    {
        if self.lower_bound(a, b) > threshold {
            return MAX_DISTANCE;
        }
        let dist = self.distance_from_counts(a, b, common());
        if dist > threshold {
            MAX_DISTANCE
        } else {
            dist
        }
    }
}

fn tanimoto_distance(a: u32, b: u32, common: u32) -> f64 {
    let union = a + b - common;
    if union == 0 {
        return 0.0;
    }
    1.0 - f64::from(common) / f64::from(union)
}

fn tversky_distance(a: u32, b: u32, common: u32, alpha: f64) -> f64 {
    let a_not_b = f64::from(a - common);
    let b_not_a = f64::from(b - common);
    let c = f64::from(common);
    let denom = alpha * a_not_b + (1.0 - alpha) * b_not_a + c;
    if denom == 0.0 {
        // alpha of 0 or 1 zeroes the weight of a non-empty side
        return if a == 0 && b == 0 { 0.0 } else { MAX_DISTANCE };
    }
    1.0 - c / denom
}

impl DenseFingerprint {
    /// Exact distance to another Dense fingerprint of the same width
    pub fn distance(&self, other: &DenseFingerprint, metric: &Metric) -> FpResult<f64> {
        let common = self.bits_in_common(other)?;
        Ok(metric.distance_from_counts(self.num_bits_set(), other.num_bits_set(), common))
    }

    /// Distance, or [`MAX_DISTANCE`] once it is known to exceed `threshold`
    pub fn distance_within(
        &self,
        other: &DenseFingerprint,
        metric: &Metric,
        threshold: f64,
    ) -> FpResult<f64> {
        if self.num_bits() != other.num_bits() {
            return Err(FingerprintError::WidthMismatch {
                expected: self.num_bits(),
                actual: other.num_bits(),
            });
        }
        Ok(metric.within(
            self.num_bits_set(),
            other.num_bits_set(),
            threshold,
            || self.bits().count_and(other.bits()),
        ))
    }
}

impl SparseFingerprint {
    /// Exact distance to another Sparse fingerprint
    pub fn distance(&self, other: &SparseFingerprint, metric: &Metric) -> f64 {
        metric.distance_from_counts(
            self.len() as u32,
            other.len() as u32,
            self.frags_in_common(other),
        )
    }

    /// Distance, or [`MAX_DISTANCE`] once it is known to exceed `threshold`
    pub fn distance_within(&self, other: &SparseFingerprint, metric: &Metric, threshold: f64) -> f64 {
        metric.within(self.len() as u32, other.len() as u32, threshold, || {
            self.frags_in_common(other)
        })
    }
}

impl Fingerprint {
    /// Exact distance, dispatched on the shapes of both operands
    pub fn distance(&self, other: &Fingerprint, metric: &Metric) -> FpResult<f64> {
        match (self, other) {
            (Fingerprint::Dense(a), Fingerprint::Dense(b)) => a.distance(b, metric),
            (Fingerprint::Sparse(a), Fingerprint::Sparse(b)) => Ok(a.distance(b, metric)),
            (Fingerprint::Dense(_), Fingerprint::Sparse(_)) => {
                Err(FingerprintError::IncompatibleOperands("distance"))
            }
            (Fingerprint::Sparse(_), Fingerprint::Dense(_)) => {
                Err(FingerprintError::IncompatibleOperands("distance"))
            }
        }
    }

    /// Thresholded distance, dispatched on the shapes of both operands
    pub fn distance_within(&self, other: &Fingerprint, metric: &Metric, threshold: f64) -> FpResult<f64> {
        match (self, other) {
            (Fingerprint::Dense(a), Fingerprint::Dense(b)) => a.distance_within(b, metric, threshold),
            (Fingerprint::Sparse(a), Fingerprint::Sparse(b)) => {
                Ok(a.distance_within(b, metric, threshold))
            }
            (Fingerprint::Dense(_), Fingerprint::Sparse(_)) => {
                Err(FingerprintError::IncompatibleOperands("distance"))
            }
            (Fingerprint::Sparse(_), Fingerprint::Dense(_)) => {
                Err(FingerprintError::IncompatibleOperands("distance"))
            }
        }
    }
}

/// Indices and distances of every target within `threshold` of `query`
///
/// A distance of exactly [`MAX_DISTANCE`] is indistinguishable from an early
/// reject and is never reported.
pub fn neighbours_within(
    query: &Fingerprint,
    targets: &[Fingerprint],
    metric: &Metric,
    threshold: f64,
) -> FpResult<Vec<(usize, f64)>> {
    let mut hits = Vec::new();
    for (i, target) in targets.iter().enumerate() {
        let dist = query.distance_within(target, metric, threshold)?;
        if dist <= threshold && dist < MAX_DISTANCE {
            hits.push((i, dist));
        }
    }
    Ok(hits)
}
