//! Symbolic bit vectors.
use std::fmt;
use std::ops::Range;

use crate::bit::Bit;
use crate::CircuitError;

/// An ordered sequence of circuit bits representing a multi-bit value.
///
/// Bits are stored least significant bit first. A vector is only a view of bits owned by a
/// [`Circuit`](crate::circuit::Circuit); operations that need new gates are methods of the circuit,
/// while pure rewiring (slicing, concatenation, shifts and rotations) is available here.
///
/// Byte strings use the same layout: bit `8 * k + i` of a vector is bit `i` of byte `k`.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SymBitVec {
    bits: Vec<Bit>,
}

impl SymBitVec {
    /// Creates a vector from bits, least significant first.
    pub fn from_bits(bits: Vec<Bit>) -> SymBitVec {
        SymBitVec { bits }
    }

    /// Creates a constant vector from bit values, least significant first.
    pub fn constant(values: impl IntoIterator<Item = bool>) -> SymBitVec {
        SymBitVec {
            bits: values.into_iter().map(Bit::constant).collect(),
        }
    }

    /// Creates a constant vector of `width` bits holding the low bits of `value`.
    ///
    /// Bits beyond the 64th are zero.
    pub fn from_u64(value: u64, width: usize) -> SymBitVec {
        SymBitVec::constant((0..width).map(|i| i < 64 && (value >> i) & 1 == 1))
    }

    /// Creates a constant 32-bit word.
    pub fn from_u32(value: u32) -> SymBitVec {
        SymBitVec::from_u64(value as u64, 32)
    }

    /// Creates a constant vector holding a byte string.
    pub fn from_bytes(bytes: &[u8]) -> SymBitVec {
        SymBitVec::constant(
            bytes
                .iter()
                .flat_map(|&byte| (0..8).map(move |i| (byte >> i) & 1 == 1)),
        )
    }

    /// A constant all-zero vector.
    pub fn zero(width: usize) -> SymBitVec {
        SymBitVec {
            bits: vec![Bit::FALSE; width],
        }
    }

    /// Number of bits.
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Whether the vector has no bits.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The bits of this vector, least significant first.
    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    /// A single bit.
    ///
    /// Panics if the index is out of range.
    pub fn bit(&self, index: usize) -> Bit {
        self.bits[index]
    }

    /// Whether every bit is a known constant.
    pub fn is_constant(&self) -> bool {
        self.bits.iter().all(|bit| bit.is_constant())
    }

    /// Values of all bits if the vector is constant.
    pub fn const_bits(&self) -> Option<Vec<bool>> {
        self.bits.iter().map(|bit| bit.const_value()).collect()
    }

    /// Value of a constant vector of at most 64 bits.
    pub fn const_u64(&self) -> Option<u64> {
        if self.width() > 64 {
            return None;
        }
        let values = self.const_bits()?;
        Some(
            values
                .iter()
                .enumerate()
                .fold(0, |acc, (i, &value)| acc | ((value as u64) << i)),
        )
    }

    /// Bytes of a constant vector.
    ///
    /// A trailing partial byte is padded with zero bits.
    pub fn const_bytes(&self) -> Result<Vec<u8>, CircuitError> {
        let values = self.const_bits().ok_or(CircuitError::NotConstant {
            width: self.width(),
        })?;
        Ok(bits_to_bytes(&values))
    }

    /// A sub-range of bits.
    pub fn slice(&self, range: Range<usize>) -> Result<SymBitVec, CircuitError> {
        if range.start > range.end || range.end > self.width() {
            return Err(CircuitError::SliceOutOfRange {
                start: range.start,
                end: range.end,
                width: self.width(),
            });
        }
        Ok(SymBitVec::from_bits(self.bits[range].to_vec()))
    }

    /// Concatenation with `self` in the low bits and `high` above.
    pub fn concat(&self, high: &SymBitVec) -> SymBitVec {
        let mut bits = Vec::with_capacity(self.width() + high.width());
        bits.extend_from_slice(&self.bits);
        bits.extend_from_slice(&high.bits);
        SymBitVec { bits }
    }

    /// Concatenation of several vectors, the first one in the lowest bits.
    pub fn concat_all<'a>(parts: impl IntoIterator<Item = &'a SymBitVec>) -> SymBitVec {
        SymBitVec {
            bits: parts
                .into_iter()
                .flat_map(|part| part.bits.iter().cloned())
                .collect(),
        }
    }

    /// Extends the vector with zero bits up to `width`.
    pub fn zero_extend(&self, width: usize) -> Result<SymBitVec, CircuitError> {
        if width < self.width() {
            return Err(CircuitError::WidthMismatch {
                left: self.width(),
                right: width,
            });
        }
        let mut bits = self.bits.clone();
        bits.resize(width, Bit::FALSE);
        Ok(SymBitVec { bits })
    }

    /// Consecutive chunks of `width` bits; the last chunk may be shorter.
    pub fn chunks(&self, width: usize) -> impl Iterator<Item = SymBitVec> + '_ {
        self.bits
            .chunks(width)
            .map(|chunk| SymBitVec::from_bits(chunk.to_vec()))
    }

    /// Logical shift towards the most significant bit.
    pub fn shl(&self, amount: usize) -> Result<SymBitVec, CircuitError> {
        self.check_shift(amount, self.width())?;
        let width = self.width();
        let mut bits = vec![Bit::FALSE; amount];
        bits.extend_from_slice(&self.bits[..width - amount]);
        Ok(SymBitVec { bits })
    }

    /// Logical shift towards the least significant bit.
    pub fn shr(&self, amount: usize) -> Result<SymBitVec, CircuitError> {
        self.check_shift(amount, self.width())?;
        let mut bits = self.bits[amount..].to_vec();
        bits.resize(self.width(), Bit::FALSE);
        Ok(SymBitVec { bits })
    }

    /// Rotation towards the most significant bit.
    pub fn rotl(&self, amount: usize) -> Result<SymBitVec, CircuitError> {
        self.check_rotation(amount)?;
        let mut bits = self.bits.clone();
        bits.rotate_right(amount);
        Ok(SymBitVec { bits })
    }

    /// Rotation towards the least significant bit.
    pub fn rotr(&self, amount: usize) -> Result<SymBitVec, CircuitError> {
        self.check_rotation(amount)?;
        let mut bits = self.bits.clone();
        bits.rotate_left(amount);
        Ok(SymBitVec { bits })
    }

    fn check_shift(&self, amount: usize, max: usize) -> Result<(), CircuitError> {
        if amount > max {
            return Err(CircuitError::InvalidShiftAmount {
                amount,
                width: self.width(),
            });
        }
        Ok(())
    }

    fn check_rotation(&self, amount: usize) -> Result<(), CircuitError> {
        // Rotating an empty vector by zero is allowed.
        if amount >= self.width() && amount > 0 {
            return Err(CircuitError::InvalidShiftAmount {
                amount,
                width: self.width(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SymBitVec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.bits.iter().rev()).finish()
    }
}

/// Pack bit values into bytes using the vector byte layout.
pub fn bits_to_bytes(values: &[bool]) -> Vec<u8> {
    values
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &value)| acc | ((value as u8) << i))
        })
        .collect()
}

/// Unpack the first `width` bits of a byte string using the vector byte layout.
///
/// Missing bytes read as zero.
pub fn bytes_to_bits(bytes: &[u8], width: usize) -> Vec<bool> {
    (0..width)
        .map(|i| {
            bytes
                .get(i / 8)
                .map_or(false, |&byte| (byte >> (i % 8)) & 1 == 1)
        })
        .collect()
}

#[cfg(any(test, feature = "proptest-strategies"))]
#[doc(hidden)]
pub mod strategy {
    use super::*;
    use proptest::{prelude::*, *};

    /// Random constant vectors of the given widths.
    pub fn constant_vec(width: impl Strategy<Value = usize>) -> impl Strategy<Value = SymBitVec> {
        width.prop_flat_map(|width| collection::vec(bool::ANY, width).prop_map(SymBitVec::constant))
    }
}

#[cfg(test)]
mod tests {
    use super::{strategy::*, *};

    use proptest::{prelude::*, *};

    #[test]
    fn byte_layout() {
        let vec = SymBitVec::from_bytes(&[0b1011_0010, 0x01]);
        assert_eq!(vec.width(), 16);
        assert_eq!(vec.bit(1), Bit::TRUE);
        assert_eq!(vec.bit(0), Bit::FALSE);
        assert_eq!(vec.bit(8), Bit::TRUE);
        assert_eq!(vec.const_bytes().unwrap(), vec![0b1011_0010, 0x01]);
        assert_eq!(vec.const_u64(), Some(0x01b2));
    }

    #[test]
    fn partial_bytes() {
        let vec = SymBitVec::from_u64(0b101, 3);
        assert_eq!(vec.const_bytes().unwrap(), vec![0b101]);
        assert_eq!(bytes_to_bits(&[0xff], 3), vec![true, true, true]);
        assert_eq!(bytes_to_bits(&[], 2), vec![false, false]);
    }

    #[test]
    fn shift_amounts() {
        let vec = SymBitVec::from_u32(0x8000_0001);
        assert_eq!(vec.shl(1).unwrap().const_u64(), Some(0x2));
        assert_eq!(vec.shr(31).unwrap().const_u64(), Some(0x1));
        assert_eq!(vec.shl(32).unwrap().const_u64(), Some(0));
        assert_eq!(
            vec.shl(33),
            Err(CircuitError::InvalidShiftAmount {
                amount: 33,
                width: 32
            })
        );
        assert_eq!(vec.rotl(1).unwrap().const_u64(), Some(0x3));
        assert_eq!(vec.rotr(1).unwrap().const_u64(), Some(0xc000_0000));
        assert!(vec.rotr(32).is_err());
        assert_eq!(vec.rotl(0).unwrap(), vec);
    }

    #[test]
    fn slicing_and_concatenation() {
        let vec = SymBitVec::from_u32(0xdead_beef);
        let low = vec.slice(0..16).unwrap();
        let high = vec.slice(16..32).unwrap();
        assert_eq!(low.const_u64(), Some(0xbeef));
        assert_eq!(high.const_u64(), Some(0xdead));
        assert_eq!(low.concat(&high), vec);
        assert_eq!(SymBitVec::concat_all(vec![&low, &high]), vec);
        assert!(vec.slice(8..40).is_err());
        assert_eq!(
            low.zero_extend(32).unwrap().const_u64(),
            Some(0x0000_beef)
        );
        assert!(vec.zero_extend(8).is_err());
    }

    proptest! {
        #[test]
        fn rotation_matches_native(value in any::<u32>(), amount in 0..32usize) {
            let vec = SymBitVec::from_u32(value);
            prop_assert_eq!(
                vec.rotl(amount).unwrap().const_u64(),
                Some(value.rotate_left(amount as u32) as u64)
            );
            prop_assert_eq!(
                vec.rotr(amount).unwrap().const_u64(),
                Some(value.rotate_right(amount as u32) as u64)
            );
            prop_assert_eq!(
                vec.shr(amount).unwrap().const_u64(),
                Some((value >> amount) as u64)
            );
        }

        #[test]
        fn bytes_roundtrip(vec in constant_vec(0..100usize)) {
            let bytes = vec.const_bytes().unwrap();
            prop_assert_eq!(bytes.len(), (vec.width() + 7) / 8);
            prop_assert_eq!(bytes_to_bits(&bytes, vec.width()), vec.const_bits().unwrap());
        }
    }
}
