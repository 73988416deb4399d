//! Message padding and word layout shared by the Merkle-Damgård hashes.
use preimage_circuit::SymBitVec;

use crate::{HashError, HashFamily};

pub const BLOCK_BITS: usize = 512;

/// Byte order of message words and of the encoded message length.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Endian {
    Big,
    Little,
}

/// Checks that a message is a whole number of bytes.
pub fn check_aligned(family: HashFamily, input: &SymBitVec) -> Result<(), HashError> {
    if input.width() % 8 != 0 {
        return Err(HashError::UnalignedInput {
            family,
            bits: input.width(),
        });
    }
    Ok(())
}

/// Appends the `0x80` marker, zero bytes and the 64-bit message length in bits.
///
/// The result is a whole number of 512-bit blocks.
pub fn md_padding(input: &SymBitVec, length_order: Endian) -> SymBitVec {
    let message_bytes = input.width() / 8;
    let mut tail = vec![0x80u8];
    while (message_bytes + tail.len()) % 64 != 56 {
        tail.push(0);
    }
    let length = input.width() as u64;
    match length_order {
        Endian::Big => tail.extend_from_slice(&length.to_be_bytes()),
        Endian::Little => tail.extend_from_slice(&length.to_le_bytes()),
    }
    input.concat(&SymBitVec::from_bytes(&tail))
}

/// Reverses the byte order of a vector.
///
/// Converts between a big-endian word read from memory and its numeric value, in both
/// directions.
pub fn swap_bytes(word: &SymBitVec) -> SymBitVec {
    let bytes: Vec<SymBitVec> = word.chunks(8).collect();
    SymBitVec::concat_all(bytes.iter().rev())
}

/// Splits a padded block into its sixteen 32-bit message words.
pub fn block_words(block: &SymBitVec, order: Endian) -> Vec<SymBitVec> {
    block
        .chunks(32)
        .map(|word| match order {
            Endian::Big => swap_bytes(&word),
            Endian::Little => word,
        })
        .collect()
}

/// Serializes state words into a digest.
pub fn digest(state: &[SymBitVec], order: Endian) -> SymBitVec {
    let words: Vec<SymBitVec> = state
        .iter()
        .map(|word| match order {
            Endian::Big => swap_bytes(word),
            Endian::Little => word.clone(),
        })
        .collect();
    SymBitVec::concat_all(words.iter())
}

/// Constant 32-bit words.
pub fn constant_words(values: &[u32]) -> Vec<SymBitVec> {
    values.iter().map(|&value| SymBitVec::from_u32(value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_lengths() {
        for &(bytes, blocks) in [(0, 1), (3, 1), (55, 1), (56, 2), (64, 2), (119, 2), (120, 3)].iter() {
            let input = SymBitVec::from_bytes(&vec![0x61; bytes]);
            let padded = md_padding(&input, Endian::Big);
            assert_eq!(padded.width(), blocks * BLOCK_BITS, "{} bytes", bytes);
        }
    }

    #[test]
    fn padding_layout() {
        let input = SymBitVec::from_bytes(b"abc");
        let big = md_padding(&input, Endian::Big).const_bytes().unwrap();
        let little = md_padding(&input, Endian::Little).const_bytes().unwrap();

        assert_eq!(&big[..4], &[0x61, 0x62, 0x63, 0x80]);
        assert!(big[4..62].iter().all(|&byte| byte == 0));
        assert_eq!(&big[62..], &[0x00, 0x18]);

        assert_eq!(little[56], 0x18);
        assert!(little[57..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn word_order() {
        let block = md_padding(&SymBitVec::from_bytes(b"abcd"), Endian::Big);
        let big = block_words(&block, Endian::Big);
        let little = block_words(&block, Endian::Little);

        assert_eq!(big.len(), 16);
        assert_eq!(big[0].const_u64(), Some(0x6162_6364));
        assert_eq!(little[0].const_u64(), Some(0x6463_6261));
        assert_eq!(big[1].const_u64(), Some(0x8000_0000));

        let words = constant_words(&[0x0102_0304]);
        assert_eq!(
            digest(&words, Endian::Big).const_bytes().unwrap(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(
            digest(&words, Endian::Little).const_bytes().unwrap(),
            vec![4, 3, 2, 1]
        );
    }
}
