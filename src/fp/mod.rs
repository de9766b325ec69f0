//! Fingerprint types, similarity, and per-run settings
//!
//! # Architecture
//!
//! ```text
//! BitBuffer ──► DenseFingerprint ─┐
//!                                 ├─► Fingerprint ──► Metric / Session ──► distance
//!           SparseFingerprint ────┘        │
//!                                          └─► PayloadView (transport)
//! ```

pub mod bits;
pub mod fingerprint;
pub mod session;
pub mod similarity;
pub mod transport;

pub use bits::{calc_num_words, BitBuffer, BITS_PER_WORD};
pub use fingerprint::{DenseFingerprint, Fingerprint, FingerprintOps, Shape, SparseFingerprint};
pub use session::{Session, SessionConfig, DEFAULT_NUM_BITS};
pub use similarity::{
    neighbours_within, Metric, SimilarityMode, DEFAULT_TVERSKY_ALPHA, MAX_DISTANCE,
};
pub use transport::PayloadView;
