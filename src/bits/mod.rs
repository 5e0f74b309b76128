use log::debug;
use thiserror::Error;

use crate::config::{self, CheckMode};

/// A single byte whose check field disagreed with its data bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub byte_index: usize,
    /// Check value recomputed from the data bits.
    pub expected: u8,
    /// Check value read from the stream.
    pub found: u8,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    #[error("check field mismatch in {} byte(s)", .mismatches.len())]
    ChecksumMismatch { mismatches: Vec<ChecksumMismatch> },
}

/// Packed bit vector, MSB first within each byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitString {
    bytes: Vec<u8>,
    len: usize,
}

impl BitString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        Some((self.bytes[index / 8] >> (7 - index % 8)) & 1 == 1)
    }

    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 1 << (7 - self.len % 8);
        }
        self.len += 1;
    }

    /// Append the low `width` bits of `value`, most significant first.
    pub fn push_bits(&mut self, value: u8, width: usize) {
        for shift in (0..width).rev() {
            self.push((value >> shift) & 1 == 1);
        }
    }

    /// Read `width` bits starting at `start` as an unsigned value.
    fn read_bits(&self, start: usize, width: usize) -> u8 {
        (start..start + width).fold(0u8, |acc, i| {
            (acc << 1) | self.get(i).map_or(0, u8::from)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| (self.bytes[i / 8] >> (7 - i % 8)) & 1 == 1)
    }

    /// Append every bit of `other`.
    pub fn extend_from(&mut self, other: &BitString) {
        if self.len % 8 == 0 {
            self.bytes.extend_from_slice(&other.bytes);
            self.len += other.len;
        } else {
            for bit in other.iter() {
                self.push(bit);
            }
        }
    }

    /// Toggle the bit at `index`. Panics if out of range.
    pub fn flip(&mut self, index: usize) {
        assert!(index < self.len, "bit index {index} out of range {}", self.len);
        self.bytes[index / 8] ^= 1 << (7 - index % 8);
    }
}

impl FromIterator<bool> for BitString {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bits = BitString::new();
        for bit in iter {
            bits.push(bit);
        }
        bits
    }
}

/// Check value stored after each data byte: the popcount, truncated to the field width.
pub fn check_value(byte: u8, error_correction_bits: u8) -> u8 {
    let ones = byte.count_ones() as u16;
    (ones % (1u16 << error_correction_bits)) as u8
}

/// Expand a byte buffer into the check-augmented bit stream.
pub fn frame_bits(payload: &[u8], error_correction_bits: u8) -> BitString {
    let check_width = error_correction_bits as usize;
    let mut bits =
        BitString::with_capacity(payload.len() * config::bits_per_byte(error_correction_bits));

    for &byte in payload {
        bits.push_bits(byte, config::DATA_BITS);
        bits.push_bits(check_value(byte, error_correction_bits), check_width);
    }

    bits
}

/// Rebuild bytes from a check-augmented bit stream.
///
/// A trailing chunk shorter than `8 + error_correction_bits` is dropped. In
/// [`CheckMode::Strict`] every byte's check field is verified and all
/// offending bytes are reported together.
pub fn deframe_bits(
    bits: &BitString,
    error_correction_bits: u8,
    mode: CheckMode,
) -> Result<Vec<u8>, BitError> {
    let chunk_len = config::bits_per_byte(error_correction_bits);
    let check_width = error_correction_bits as usize;
    let whole_chunks = bits.len() / chunk_len;

    let trailing = bits.len() % chunk_len;
    if trailing != 0 {
        debug!("dropping {} trailing bits shorter than a {}-bit chunk", trailing, chunk_len);
    }

    let mut data = Vec::with_capacity(whole_chunks);
    let mut mismatches = Vec::new();

    for chunk in 0..whole_chunks {
        let start = chunk * chunk_len;
        let byte = bits.read_bits(start, config::DATA_BITS);

        if mode == CheckMode::Strict {
            let found = bits.read_bits(start + config::DATA_BITS, check_width);
            let expected = check_value(byte, error_correction_bits);
            if found != expected {
                mismatches.push(ChecksumMismatch {
                    byte_index: chunk,
                    expected,
                    found,
                });
            }
        }

        data.push(byte);
    }

    if !mismatches.is_empty() {
        return Err(BitError::ChecksumMismatch { mismatches });
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_from_str(s: &str) -> BitString {
        s.chars().map(|c| c == '1').collect()
    }

    fn bits_to_string(bits: &BitString) -> String {
        bits.iter().map(|b| if b { '1' } else { '0' }).collect()
    }

    #[test]
    fn test_frame_known_bytes() {
        let bits = frame_bits(b"AB", 8);
        assert_eq!(bits.len(), 32);
        assert_eq!(
            bits_to_string(&bits),
            "0100000100000010\
             0100001000000010"
        );
    }

    #[test]
    fn test_check_field_all_ones() {
        let bits = frame_bits(&[0xFF], 8);
        assert_eq!(bits_to_string(&bits), "1111111100001000");
    }

    #[test]
    fn test_narrow_check_field_truncates_popcount() {
        // popcount(0xFF) = 8 = 0b1000, keep the low 3 bits
        let bits = frame_bits(&[0xFF], 3);
        assert_eq!(bits_to_string(&bits), "11111111000");
        assert_eq!(deframe_bits(&bits, 3, CheckMode::Strict).unwrap(), vec![0xFF]);
    }

    #[test]
    fn test_zero_width_check_field() {
        let bits = frame_bits(b"xyz", 0);
        assert_eq!(bits.len(), 24);
        assert_eq!(deframe_bits(&bits, 0, CheckMode::Strict).unwrap(), b"xyz");
    }

    #[test]
    fn test_deframe_drops_partial_chunk() {
        let mut bits = frame_bits(b"hi", 8);
        // zero padding as produced by the last frame
        for _ in 0..15 {
            bits.push(false);
        }
        assert_eq!(deframe_bits(&bits, 8, CheckMode::Lenient).unwrap(), b"hi");
    }

    #[test]
    fn test_deframe_keeps_whole_padding_chunks() {
        let mut bits = frame_bits(b"hi", 8);
        for _ in 0..16 {
            bits.push(false);
        }
        assert_eq!(deframe_bits(&bits, 8, CheckMode::Lenient).unwrap(), b"hi\0");
    }

    #[test]
    fn test_lenient_ignores_bad_check_bits() {
        let mut bits = frame_bits(b"A", 8);
        bits.flip(15);
        assert_eq!(deframe_bits(&bits, 8, CheckMode::Lenient).unwrap(), b"A");
    }

    #[test]
    fn test_strict_reports_every_offending_byte() {
        let mut bits = frame_bits(b"ABC", 8);
        bits.flip(0); // data bit of byte 0
        bits.flip(16 * 2 + 12); // check bit of byte 2

        let err = deframe_bits(&bits, 8, CheckMode::Strict).unwrap_err();
        let BitError::ChecksumMismatch { mismatches } = err;
        assert_eq!(mismatches.len(), 2);
        assert_eq!(
            mismatches[0],
            ChecksumMismatch {
                byte_index: 0,
                expected: 3,
                found: 2
            }
        );
        assert_eq!(mismatches[1].byte_index, 2);
    }

    #[test]
    fn test_extend_unaligned() {
        let mut a = bits_from_str("101");
        let b = bits_from_str("0110011101");
        a.extend_from(&b);
        assert_eq!(bits_to_string(&a), "1010110011101");

        let mut c = bits_from_str("11110000");
        c.extend_from(&bits_from_str("1"));
        assert_eq!(bits_to_string(&c), "111100001");
    }

    #[test]
    fn test_get_out_of_range() {
        let bits = bits_from_str("1");
        assert_eq!(bits.get(0), Some(true));
        assert_eq!(bits.get(1), None);
    }
}
