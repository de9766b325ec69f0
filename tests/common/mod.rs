//! Common test fixtures
//!
//! Seeded random fingerprints and scratch-file helpers shared by the
//! integration tests.

#![allow(dead_code)] // Not every test binary uses every fixture

use fingerprint_fs::{DenseFingerprint, Fingerprint, SparseFingerprint};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

/// Deterministic RNG so failures reproduce
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Random bitstring of `num_bits` characters with roughly `density` ones
pub fn random_bitstring(rng: &mut ChaCha8Rng, num_bits: u32, density: f64) -> String {
    (0..num_bits)
        .map(|_| if rng.gen_bool(density) { '1' } else { '0' })
        .collect()
}

/// `count` Dense fingerprints named `d0`, `d1`, ...
pub fn random_dense(rng: &mut ChaCha8Rng, count: usize, num_bits: u32) -> Vec<Fingerprint> {
    (0..count)
        .map(|i| {
            let density = rng.gen_range(0.0..0.5);
            let bits = random_bitstring(rng, num_bits, density);
            DenseFingerprint::from_bitstring(format!("d{}", i), &bits, num_bits)
                .expect("generated bitstring has the requested width")
                .into()
        })
        .collect()
}

/// `count` Sparse fingerprints named `s0`, `s1`, ... drawn from `0..universe`
pub fn random_sparse(rng: &mut ChaCha8Rng, count: usize, universe: u32) -> Vec<Fingerprint> {
    (0..count)
        .map(|i| {
            let len = rng.gen_range(0..40);
            let frags = (0..len).map(|_| rng.gen_range(0..universe)).collect();
            SparseFingerprint::new(format!("s{}", i), frags).into()
        })
        .collect()
}

/// Path inside a temp directory
pub fn scratch(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}
