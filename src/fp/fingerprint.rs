//! Dense and Sparse fingerprints behind one capability contract.
//!
//! A fingerprint is a mutable display name plus an immutable payload fixed at
//! construction. [`Fingerprint`] is the tagged union drivers hold in their
//! collections; the two concrete shapes are usable on their own too.

use std::cell::OnceCell;
use std::fmt;

use super::bits::BitBuffer;
use crate::error::{FingerprintError, FpResult};

/// Which of the two payload encodings a fingerprint carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Fixed-width bit vector
    Dense,
    /// Sorted list of fragment identifiers
    Sparse,
}

impl Shape {
    fn tag(self) -> &'static str {
        match self {
            Shape::Dense => "D",
            Shape::Sparse => "S",
        }
    }

    /// Lower-case name used in messages
    pub fn label(self) -> &'static str {
        match self {
            Shape::Dense => "dense",
            Shape::Sparse => "sparse",
        }
    }
}

/// Operations every fingerprint shape provides
pub trait FingerprintOps {
    /// Display name
    fn name(&self) -> &str;

    /// Replace the display name; the payload is untouched
    fn set_name(&mut self, name: String);

    /// Payload shape
    fn shape(&self) -> Shape;

    /// Number of set bits (Dense) or fragments (Sparse)
    fn bit_count(&self) -> u32;

    /// Self-describing text form, inverse of [`Fingerprint::from_text`]
    fn to_text(&self) -> String;
}

// =============================================================================
// DENSE
// =============================================================================

/// Bit-vector fingerprint with a cached popcount
#[derive(Clone)]
pub struct DenseFingerprint {
    name: String,
    bits: BitBuffer,
    num_bits_set: OnceCell<u32>,
}

impl DenseFingerprint {
    /// Wrap an existing bit buffer
    pub fn new(name: impl Into<String>, bits: BitBuffer) -> Self {
        Self {
            name: name.into(),
            bits,
            num_bits_set: OnceCell::new(),
        }
    }

    /// All-zero fingerprint of the given width
    pub fn zero(name: impl Into<String>, num_bits: u32) -> Self {
        Self::new(name, BitBuffer::zeroed(num_bits))
    }

    /// Build from a `0`/`1` string that must be exactly `num_bits` long
    pub fn from_bitstring(name: impl Into<String>, bitstring: &str, num_bits: u32) -> FpResult<Self> {
        let name = name.into();
        let bits = parse_bitstring(&name, bitstring, num_bits)?;
        Ok(Self::new(name, bits))
    }

    /// Replace name and payload from a bitstring of the current width
    ///
    /// On error the fingerprint is left as it was.
    pub fn rebuild_from_bitstring(&mut self, name: impl Into<String>, bitstring: &str) -> FpResult<()> {
        let name = name.into();
        let bits = parse_bitstring(&name, bitstring, self.bits.num_bits())?;
        self.name = name;
        self.bits = bits;
        self.num_bits_set = OnceCell::new();
        Ok(())
    }

    /// Underlying bit buffer
    #[inline]
    pub fn bits(&self) -> &BitBuffer {
        &self.bits
    }

    /// Width in bits
    #[inline]
    pub fn num_bits(&self) -> u32 {
        self.bits.num_bits()
    }

    /// Cached popcount
    #[inline]
    pub fn num_bits_set(&self) -> u32 {
        *self.num_bits_set.get_or_init(|| self.bits.count_ones())
    }

    fn check_width(&self, other: &DenseFingerprint) -> FpResult<()> {
        if self.num_bits() != other.num_bits() {
            return Err(FingerprintError::WidthMismatch {
                expected: self.num_bits(),
                actual: other.num_bits(),
            });
        }
        Ok(())
    }

    /// Number of bits set in both
    pub fn bits_in_common(&self, other: &DenseFingerprint) -> FpResult<u32> {
        self.check_width(other)?;
        Ok(self.bits.count_and(&other.bits))
    }

    /// `(in both, in self only, in other only)`
    pub fn bits_in_common_split(&self, other: &DenseFingerprint) -> FpResult<(u32, u32, u32)> {
        let common = self.bits_in_common(other)?;
        Ok((
            common,
            self.num_bits_set() - common,
            other.num_bits_set() - common,
        ))
    }

    /// Number of bits set here but clear in `other`
    pub fn set_in_self_not_other(&self, other: &DenseFingerprint) -> FpResult<u32> {
        self.check_width(other)?;
        Ok(self.bits.count_and_not(&other.bits))
    }

    /// New fingerprint holding `self & other`, named after `self`
    pub fn and(&self, other: &DenseFingerprint) -> FpResult<DenseFingerprint> {
        let mut out = self.clone();
        out.and_assign(other)?;
        Ok(out)
    }

    /// New fingerprint holding `self | other`, named after `self`
    pub fn or(&self, other: &DenseFingerprint) -> FpResult<DenseFingerprint> {
        let mut out = self.clone();
        out.or_assign(other)?;
        Ok(out)
    }

    /// `self &= other`
    pub fn and_assign(&mut self, other: &DenseFingerprint) -> FpResult<()> {
        self.bits.and_assign(&other.bits)?;
        self.num_bits_set = OnceCell::new();
        Ok(())
    }

    /// `self |= other`
    pub fn or_assign(&mut self, other: &DenseFingerprint) -> FpResult<()> {
        self.bits.or_assign(&other.bits)?;
        self.num_bits_set = OnceCell::new();
        Ok(())
    }
}

fn parse_bitstring(name: &str, bitstring: &str, num_bits: u32) -> FpResult<BitBuffer> {
    if bitstring.len() != num_bits as usize {
        return Err(FingerprintError::BitstringLength {
            name: name.to_string(),
            expected: num_bits as usize,
            actual: bitstring.len(),
        });
    }
    BitBuffer::from_bitstring(bitstring).ok_or_else(|| {
        FingerprintError::MalformedRecord(format!(
            "bitstring for {} contains characters other than 0 and 1",
            name
        ))
    })
}

impl PartialEq for DenseFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.bits == other.bits
    }
}

impl Eq for DenseFingerprint {}

impl fmt::Debug for DenseFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseFingerprint")
            .field("name", &self.name)
            .field("bits", &self.bits)
            .finish()
    }
}

impl FingerprintOps for DenseFingerprint {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn shape(&self) -> Shape {
        Shape::Dense
    }

    fn bit_count(&self) -> u32 {
        self.num_bits_set()
    }

    fn to_text(&self) -> String {
        format!(
            "{} {} {} {}",
            Shape::Dense.tag(),
            self.num_bits(),
            self.bits.to_bitstring(),
            self.name
        )
    }
}

// =============================================================================
// SPARSE
// =============================================================================

/// Fragment-number fingerprint: a sorted set of fragment identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseFingerprint {
    name: String,
    frag_nums: Vec<u32>,
}

impl SparseFingerprint {
    /// Build from fragment identifiers in any order; duplicates collapse
    pub fn new(name: impl Into<String>, mut frag_nums: Vec<u32>) -> Self {
        frag_nums.sort_unstable();
        frag_nums.dedup();
        Self {
            name: name.into(),
            frag_nums,
        }
    }

    /// Fragment identifiers in ascending order
    #[inline]
    pub fn frag_nums(&self) -> &[u32] {
        &self.frag_nums
    }

    /// Number of identifiers
    #[inline]
    pub fn len(&self) -> usize {
        self.frag_nums.len()
    }

    /// True if no fragments are present
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frag_nums.is_empty()
    }

    /// Size of the intersection, by a merge walk of the two sorted lists
    pub fn frags_in_common(&self, other: &SparseFingerprint) -> u32 {
        let (mut i, mut j, mut common) = (0, 0, 0u32);
        let (a, b) = (&self.frag_nums, &other.frag_nums);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    common += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        common
    }
}

impl FingerprintOps for SparseFingerprint {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn shape(&self) -> Shape {
        Shape::Sparse
    }

    fn bit_count(&self) -> u32 {
        self.frag_nums.len() as u32
    }

    fn to_text(&self) -> String {
        let frags: Vec<String> = self.frag_nums.iter().map(|f| f.to_string()).collect();
        format!(
            "{} {} {} {}",
            Shape::Sparse.tag(),
            self.frag_nums.len(),
            frags.join(","),
            self.name
        )
    }
}

// =============================================================================
// TAGGED UNION
// =============================================================================

/// A fingerprint of either shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    Dense(DenseFingerprint),
    Sparse(SparseFingerprint),
}

impl Fingerprint {
    /// Parse the output of [`FingerprintOps::to_text`]
    ///
    /// Layout: `<D|S> <length> <payload> <name>`. The name is everything after
    /// the third space, so it may itself contain spaces.
    pub fn from_text(rep: &str) -> FpResult<Self> {
        let mut parts = rep.splitn(4, ' ');
        let (Some(tag), Some(len), Some(payload), Some(name)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(FingerprintError::MalformedRecord(format!(
                "expected 4 fields in {:?}",
                rep
            )));
        };
        let len: u32 = len.parse().map_err(|_| {
            FingerprintError::MalformedRecord(format!("bad length {:?} in {:?}", len, rep))
        })?;

        match tag {
            "D" => Ok(Fingerprint::Dense(DenseFingerprint::from_bitstring(
                name, payload, len,
            )?)),
            "S" => {
                let frags = if payload.is_empty() {
                    Vec::new()
                } else {
                    payload
                        .split(',')
                        .map(|tok| {
                            tok.parse::<u32>().map_err(|_| FingerprintError::BadFragmentNumber {
                                name: name.to_string(),
                                token: tok.to_string(),
                            })
                        })
                        .collect::<FpResult<Vec<u32>>>()?
                };
                if frags.len() != len as usize {
                    return Err(FingerprintError::MalformedRecord(format!(
                        "{} declares {} fragments but lists {}",
                        name,
                        len,
                        frags.len()
                    )));
                }
                Ok(Fingerprint::Sparse(SparseFingerprint::new(name, frags)))
            }
            other => Err(FingerprintError::MalformedRecord(format!(
                "unknown fingerprint kind {:?}",
                other
            ))),
        }
    }

    /// Dense payload, if this is a Dense fingerprint
    pub fn as_dense(&self) -> Option<&DenseFingerprint> {
        match self {
            Fingerprint::Dense(d) => Some(d),
            Fingerprint::Sparse(_) => None,
        }
    }

    /// Sparse payload, if this is a Sparse fingerprint
    pub fn as_sparse(&self) -> Option<&SparseFingerprint> {
        match self {
            Fingerprint::Sparse(s) => Some(s),
            Fingerprint::Dense(_) => None,
        }
    }

    fn ops(&self) -> &dyn FingerprintOps {
        match self {
            Fingerprint::Dense(d) => d,
            Fingerprint::Sparse(s) => s,
        }
    }

    /// AND of two Dense fingerprints; other shapes are incompatible
    pub fn and(&self, other: &Fingerprint) -> FpResult<Fingerprint> {
        match (self, other) {
            (Fingerprint::Dense(a), Fingerprint::Dense(b)) => Ok(Fingerprint::Dense(a.and(b)?)),
            _ => Err(FingerprintError::IncompatibleOperands("and")),
        }
    }

    /// OR of two Dense fingerprints; other shapes are incompatible
    pub fn or(&self, other: &Fingerprint) -> FpResult<Fingerprint> {
        match (self, other) {
            (Fingerprint::Dense(a), Fingerprint::Dense(b)) => Ok(Fingerprint::Dense(a.or(b)?)),
            _ => Err(FingerprintError::IncompatibleOperands("or")),
        }
    }
}

impl FingerprintOps for Fingerprint {
    fn name(&self) -> &str {
        self.ops().name()
    }

    fn set_name(&mut self, name: String) {
        match self {
            Fingerprint::Dense(d) => d.set_name(name),
            Fingerprint::Sparse(s) => s.set_name(name),
        }
    }

    fn shape(&self) -> Shape {
        self.ops().shape()
    }

    fn bit_count(&self) -> u32 {
        self.ops().bit_count()
    }

    fn to_text(&self) -> String {
        self.ops().to_text()
    }
}

impl From<DenseFingerprint> for Fingerprint {
    fn from(fp: DenseFingerprint) -> Self {
        Fingerprint::Dense(fp)
    }
}

impl From<SparseFingerprint> for Fingerprint {
    fn from(fp: SparseFingerprint) -> Self {
        Fingerprint::Sparse(fp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_from_bitstring() {
        let fp = DenseFingerprint::from_bitstring("mol1", "11110000", 8).unwrap();
        assert_eq!(fp.name(), "mol1");
        assert_eq!(fp.bit_count(), 4);
        assert_eq!(fp.bits().to_bitstring(), "11110000");
    }

    #[test]
    fn test_dense_wrong_length() {
        let result = DenseFingerprint::from_bitstring("mol1", "1111000", 8);
        assert!(matches!(
            result,
            Err(FingerprintError::BitstringLength { expected: 8, actual: 7, .. })
        ));
    }

    #[test]
    fn test_rebuild_is_atomic_on_error() {
        let mut fp = DenseFingerprint::from_bitstring("mol1", "11110000", 8).unwrap();
        assert!(fp.rebuild_from_bitstring("mol2", "111").is_err());
        assert_eq!(fp.name(), "mol1");
        assert_eq!(fp.bit_count(), 4);

        fp.rebuild_from_bitstring("mol2", "10000000").unwrap();
        assert_eq!(fp.name(), "mol2");
        assert_eq!(fp.bit_count(), 1);
    }

    #[test]
    fn test_combine_resets_cached_count() {
        let mut a = DenseFingerprint::from_bitstring("a", "11110000", 8).unwrap();
        let b = DenseFingerprint::from_bitstring("b", "11001100", 8).unwrap();
        assert_eq!(a.bit_count(), 4);

        let and = a.and(&b).unwrap();
        assert_eq!(and.name(), "a");
        assert_eq!(and.bit_count(), 2);

        a.or_assign(&b).unwrap();
        assert_eq!(a.bit_count(), 6);
    }

    #[test]
    fn test_bits_in_common_split() {
        let a = DenseFingerprint::from_bitstring("a", "11110000", 8).unwrap();
        let b = DenseFingerprint::from_bitstring("b", "11001100", 8).unwrap();
        assert_eq!(a.bits_in_common_split(&b).unwrap(), (2, 2, 2));
        assert_eq!(a.set_in_self_not_other(&b).unwrap(), 2);
    }

    #[test]
    fn test_width_mismatch_is_reported() {
        let a = DenseFingerprint::zero("a", 8);
        let b = DenseFingerprint::zero("b", 16);
        assert!(matches!(
            a.bits_in_common(&b),
            Err(FingerprintError::WidthMismatch { expected: 8, actual: 16 })
        ));
    }

    #[test]
    fn test_sparse_sorted_and_deduplicated() {
        let fp = SparseFingerprint::new("s", vec![9, 3, 3, 1]);
        assert_eq!(fp.frag_nums(), &[1, 3, 9]);
        assert_eq!(fp.bit_count(), 3);
    }

    #[test]
    fn test_sparse_intersection() {
        let a = SparseFingerprint::new("a", vec![1, 2, 3]);
        let b = SparseFingerprint::new("b", vec![2, 3, 4]);
        assert_eq!(a.frags_in_common(&b), 2);
        assert_eq!(b.frags_in_common(&a), 2);
    }

    #[test]
    fn test_text_round_trip_dense() {
        let fp: Fingerprint = DenseFingerprint::from_bitstring("name with spaces", "1010", 4)
            .unwrap()
            .into();
        let text = fp.to_text();
        assert_eq!(text, "D 4 1010 name with spaces");
        assert_eq!(Fingerprint::from_text(&text).unwrap(), fp);
    }

    #[test]
    fn test_text_round_trip_sparse() {
        let fp: Fingerprint = SparseFingerprint::new("s1", vec![5, 17, 2]).into();
        let text = fp.to_text();
        assert_eq!(text, "S 3 2,5,17 s1");
        assert_eq!(Fingerprint::from_text(&text).unwrap(), fp);

        let empty: Fingerprint = SparseFingerprint::new("e", vec![]).into();
        assert_eq!(Fingerprint::from_text(&empty.to_text()).unwrap(), empty);
    }

    #[test]
    fn test_from_text_rejects_garbage() {
        assert!(matches!(
            Fingerprint::from_text("X 1 1 a"),
            Err(FingerprintError::MalformedRecord(_))
        ));
        assert!(matches!(
            Fingerprint::from_text("S 2 1,x a"),
            Err(FingerprintError::BadFragmentNumber { .. })
        ));
        assert!(Fingerprint::from_text("D 8").is_err());
    }

    #[test]
    fn test_set_name_keeps_payload() {
        let mut fp: Fingerprint = SparseFingerprint::new("old", vec![1, 2]).into();
        fp.set_name("new".to_string());
        assert_eq!(fp.name(), "new");
        assert_eq!(fp.as_sparse().unwrap().frag_nums(), &[1, 2]);
    }

    #[test]
    fn test_mixed_shape_combination_fails() {
        let d: Fingerprint = DenseFingerprint::zero("d", 8).into();
        let s: Fingerprint = SparseFingerprint::new("s", vec![1]).into();
        assert!(matches!(
            d.and(&s),
            Err(FingerprintError::IncompatibleOperands("and"))
        ));
        assert!(matches!(
            s.or(&d),
            Err(FingerprintError::IncompatibleOperands("or"))
        ));
    }
}
