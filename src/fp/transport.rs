//! Raw payload access for message-passing transports.
//!
//! A transport ships the name, the shape, and the payload bytes of a
//! fingerprint, and rebuilds it on the other side with
//! [`Fingerprint::from_payload`]. Payload bytes are the storage words in this
//! machine's byte order; both ends are assumed to share it.

use byteorder::{ByteOrder, NativeEndian};

use super::bits::{calc_num_words, BitBuffer};
use super::fingerprint::{DenseFingerprint, Fingerprint, FingerprintOps, Shape, SparseFingerprint};
use crate::error::{FingerprintError, FpResult};

/// Borrowed payload bytes of one fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadView<'a> {
    shape: Shape,
    bytes: &'a [u8],
}

impl<'a> PayloadView<'a> {
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Fingerprint {
    /// Borrow the payload without copying
    pub fn payload_view(&self) -> PayloadView<'_> {
        match self {
            Fingerprint::Dense(d) => PayloadView {
                shape: Shape::Dense,
                bytes: d.bits().as_bytes(),
            },
            Fingerprint::Sparse(s) => PayloadView {
                shape: Shape::Sparse,
                bytes: bytemuck::cast_slice(s.frag_nums()),
            },
        }
    }

    /// Rebuild a fingerprint from a name and payload bytes
    ///
    /// `num_bits` is the Dense width and is ignored for Sparse payloads.
    pub fn from_payload(name: impl Into<String>, shape: Shape, bytes: &[u8], num_bits: u32) -> FpResult<Self> {
        if bytes.len() % 4 != 0 {
            return Err(FingerprintError::MalformedRecord(format!(
                "payload of {} bytes is not a whole number of words",
                bytes.len()
            )));
        }
        let mut words = vec![0u32; bytes.len() / 4];
        NativeEndian::read_u32_into(bytes, &mut words);

        match shape {
            Shape::Dense => {
                let expected = calc_num_words(num_bits);
                if words.len() != expected {
                    return Err(FingerprintError::MalformedRecord(format!(
                        "dense payload has {} words, width {} needs {}",
                        words.len(),
                        num_bits,
                        expected
                    )));
                }
                let bits = BitBuffer::from_words(num_bits, words)?;
                Ok(DenseFingerprint::new(name, bits).into())
            }
            Shape::Sparse => Ok(SparseFingerprint::new(name, words).into()),
        }
    }

    /// Copy out everything a transport needs: `(name, shape, payload)`
    pub fn to_payload_parts(&self) -> (String, Shape, Vec<u8>) {
        let view = self.payload_view();
        (self.name().to_string(), view.shape(), view.bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_payload_round_trip() {
        let fp: Fingerprint = DenseFingerprint::from_bitstring("d", &"10".repeat(20), 40)
            .unwrap()
            .into();
        let view = fp.payload_view();
        assert_eq!(view.shape(), Shape::Dense);
        assert_eq!(view.len(), 8);

        let back = Fingerprint::from_payload("d", view.shape(), view.bytes(), 40).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_sparse_payload_round_trip() {
        let fp: Fingerprint = SparseFingerprint::new("s", vec![3, 1, 4159]).into();
        let (name, shape, bytes) = fp.to_payload_parts();
        assert_eq!(bytes.len(), 12);
        assert_eq!(Fingerprint::from_payload(name, shape, &bytes, 0).unwrap(), fp);
    }

    #[test]
    fn test_empty_sparse_payload() {
        let fp: Fingerprint = SparseFingerprint::new("e", vec![]).into();
        assert!(fp.payload_view().is_empty());
        let back = Fingerprint::from_payload("e", Shape::Sparse, &[], 0).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_bad_payload_lengths() {
        assert!(matches!(
            Fingerprint::from_payload("x", Shape::Sparse, &[0, 1, 2], 0),
            Err(FingerprintError::MalformedRecord(_))
        ));
        assert!(matches!(
            Fingerprint::from_payload("x", Shape::Dense, &[0; 4], 64),
            Err(FingerprintError::MalformedRecord(_))
        ));
    }
}
