//! # fingerprint-fs
//!
//! Storage, serialization and comparison of molecular fingerprints.
//!
//! Two payload shapes share one contract: Dense bit vectors of a fixed
//! session width, and Sparse sorted fragment-number sets. Each reads and
//! writes in a binary and an ASCII wire format, optionally gzip-compressed,
//! and compares under Tanimoto or Tversky distance with a thresholded
//! fast-reject variant for neighbour searches.

pub mod error;
pub mod file;
pub mod fp;

pub use error::{FingerprintError, FpResult};
pub use file::{FileFormat, FpReader, FpWriter, WireFormat};
pub use fp::{
    DenseFingerprint, Fingerprint, FingerprintOps, Metric, Session, SessionConfig, Shape,
    SimilarityMode, SparseFingerprint,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_loads() {
        let session = Session::default();
        let fp = session.zero_fingerprint("zero");
        assert_eq!(fp.bit_count(), 0);
        assert_eq!(fp.shape(), Shape::Dense);
    }
}
