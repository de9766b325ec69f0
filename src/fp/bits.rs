//! Fixed-width packed bit vector.
//!
//! Bits are packed into `u32` words, bit `i` living in word `i / 32` at
//! position `i % 32`. Bits past `num_bits` in the last word are always zero,
//! so popcounts never see padding.

use std::fmt;

use crate::error::{FingerprintError, FpResult};

/// Bits held by one storage word
pub const BITS_PER_WORD: u32 = u32::BITS;

/// Number of words needed to hold `num_bits` bits
#[inline]
pub fn calc_num_words(num_bits: u32) -> usize {
    num_bits.div_ceil(BITS_PER_WORD) as usize
}

/// Mask of the valid bits in the final word
#[inline]
fn last_word_mask(num_bits: u32) -> u32 {
    match num_bits % BITS_PER_WORD {
        0 => u32::MAX,
        r => (1u32 << r) - 1,
    }
}

/// Owned, bounds-checked bit vector of fixed width
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitBuffer {
    words: Box<[u32]>,
    num_bits: u32,
}

impl BitBuffer {
    /// All-zero buffer of `num_bits` bits
    pub fn zeroed(num_bits: u32) -> Self {
        Self {
            words: vec![0u32; calc_num_words(num_bits)].into_boxed_slice(),
            num_bits,
        }
    }

    /// Take ownership of a word array
    ///
    /// The array must hold exactly `calc_num_words(num_bits)` words. Padding
    /// bits past `num_bits` are cleared.
    pub fn from_words(num_bits: u32, words: Vec<u32>) -> FpResult<Self> {
        let needed = calc_num_words(num_bits);
        if words.len() != needed {
            return Err(FingerprintError::TruncatedRecord {
                expected: needed * 4,
                actual: words.len() * 4,
            });
        }
        let mut buf = Self {
            words: words.into_boxed_slice(),
            num_bits,
        };
        buf.clear_padding();
        Ok(buf)
    }

    /// Parse a string of `0`/`1` characters, one per bit
    ///
    /// Returns `None` if any character is not `0` or `1`.
    pub fn from_bitstring(bits: &str) -> Option<Self> {
        let mut buf = Self::zeroed(bits.len() as u32);
        for (i, c) in bits.bytes().enumerate() {
            match c {
                b'1' => buf.set(i as u32, true),
                b'0' => {}
                _ => return None,
            }
        }
        Some(buf)
    }

    fn clear_padding(&mut self) {
        if let Some(last) = self.words.last_mut() {
            *last &= last_word_mask(self.num_bits);
        }
    }

    /// Width in bits
    #[inline]
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Width in storage words
    #[inline]
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// Raw storage words
    #[inline]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Storage words as native-endian bytes, borrowed
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Get bit at position
    #[inline]
    pub fn get(&self, pos: u32) -> bool {
        assert!(pos < self.num_bits, "bit {} out of range {}", pos, self.num_bits);
        let word = (pos / BITS_PER_WORD) as usize;
        (self.words[word] >> (pos % BITS_PER_WORD)) & 1 == 1
    }

    /// Set bit at position
    #[inline]
    pub fn set(&mut self, pos: u32, value: bool) {
        assert!(pos < self.num_bits, "bit {} out of range {}", pos, self.num_bits);
        let word = (pos / BITS_PER_WORD) as usize;
        let bit = 1u32 << (pos % BITS_PER_WORD);
        if value {
            self.words[word] |= bit;
        } else {
            self.words[word] &= !bit;
        }
    }

    /// Count set bits (popcount)
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Popcount of `self & other` without building the intersection
    pub fn count_and(&self, other: &BitBuffer) -> u32 {
        debug_assert_eq!(self.num_bits, other.num_bits);
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones())
            .sum()
    }

    /// Popcount of `self & !other`
    pub fn count_and_not(&self, other: &BitBuffer) -> u32 {
        debug_assert_eq!(self.num_bits, other.num_bits);
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & !b).count_ones())
            .sum()
    }

    fn check_width(&self, other: &BitBuffer) -> FpResult<()> {
        if self.num_bits != other.num_bits {
            return Err(FingerprintError::WidthMismatch {
                expected: self.num_bits,
                actual: other.num_bits,
            });
        }
        Ok(())
    }

    /// In-place AND
    pub fn and_assign(&mut self, other: &BitBuffer) -> FpResult<()> {
        self.check_width(other)?;
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a &= b;
        }
        Ok(())
    }

    /// In-place OR
    pub fn or_assign(&mut self, other: &BitBuffer) -> FpResult<()> {
        self.check_width(other)?;
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= b;
        }
        Ok(())
    }

    /// Render as `0`/`1` characters, bit 0 first
    pub fn to_bitstring(&self) -> String {
        (0..self.num_bits)
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect()
    }
}

impl fmt::Debug for BitBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitBuffer({}: {})", self.num_bits, self.to_bitstring())
    }
}
