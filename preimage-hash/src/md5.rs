//! Symbolic MD5.
use std::ops::RangeInclusive;

use log::debug;

use preimage_circuit::{Circuit, SymBitVec};

use crate::words::{self, Endian, BLOCK_BITS};
use crate::{HashError, HashFamily, SymHash};

/// Additive constants, `floor(abs(sin(i + 1)) * 2^32)`.
pub const K: [u32; 64] = [
    0xd76aa478, 0xe8c7b756, 0x242070db, 0xc1bdceee, 0xf57c0faf, 0x4787c62a, 0xa8304613, 0xfd469501,
    0x698098d8, 0x8b44f7af, 0xffff5bb1, 0x895cd7be, 0x6b901122, 0xfd987193, 0xa679438e, 0x49b40821,
    0xf61e2562, 0xc040b340, 0x265e5a51, 0xe9b6c7aa, 0xd62f105d, 0x02441453, 0xd8a1e681, 0xe7d3fbc8,
    0x21e1cde6, 0xc33707d6, 0xf4d50d87, 0x455a14ed, 0xa9e3e905, 0xfcefa3f8, 0x676f02d9, 0x8d2a4c8a,
    0xfffa3942, 0x8771f681, 0x6d9d6122, 0xfde5380c, 0xa4beea44, 0x4bdecfa9, 0xf6bb4b60, 0xbebfbc70,
    0x289b7ec6, 0xeaa127fa, 0xd4ef3085, 0x04881d05, 0xd9d4d039, 0xe6db99e5, 0x1fa27cf8, 0xc4ac5665,
    0xf4292244, 0x432aff97, 0xab9423a7, 0xfc93a039, 0x655b59c3, 0x8f0ccc92, 0xffeff47d, 0x85845dd1,
    0x6fa87e4f, 0xfe2ce6e0, 0xa3014314, 0x4e0811a1, 0xf7537e82, 0xbd3af235, 0x2ad7d2bb, 0xeb86d391,
];

/// Per-round rotation amounts, repeating every four steps.
pub const SHIFTS: [[usize; 4]; 4] = [[7, 12, 17, 22], [5, 9, 14, 20], [4, 11, 16, 23], [6, 10, 15, 21]];

pub const IV: [u32; 4] = [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476];

pub const STEPS: usize = 64;

/// MD5 with the compression function truncated to `difficulty` steps.
#[derive(Copy, Clone, Default, Debug)]
pub struct Md5;

impl SymHash for Md5 {
    fn family(&self) -> HashFamily {
        HashFamily::Md5
    }

    fn output_width(&self, _input_bits: usize) -> usize {
        128
    }

    fn difficulty_range(&self) -> RangeInclusive<usize> {
        1..=STEPS
    }

    fn hash(
        &self,
        circuit: &mut Circuit,
        input: &SymBitVec,
        difficulty: usize,
    ) -> Result<SymBitVec, HashError> {
        self.check_difficulty(difficulty)?;
        words::check_aligned(self.family(), input)?;

        let padded = words::md_padding(input, Endian::Little);
        debug!(
            "md5: {} blocks, {} steps",
            padded.width() / BLOCK_BITS,
            difficulty
        );

        let mut state = words::constant_words(&IV);
        for block in padded.chunks(BLOCK_BITS) {
            state = compress(circuit, &state, &block, difficulty)?;
        }

        Ok(words::digest(&state, Endian::Little))
    }
}

/// The boolean function and message word index of a step.
fn step_function(
    circuit: &mut Circuit,
    step: usize,
    b: &SymBitVec,
    c: &SymBitVec,
    d: &SymBitVec,
) -> Result<(SymBitVec, usize), HashError> {
    Ok(match step / 16 {
        0 => {
            let bc = circuit.and(b, c)?;
            let not_b = circuit.not(b);
            let bd = circuit.and(&not_b, d)?;
            (circuit.or(&bc, &bd)?, step)
        }
        1 => {
            let db = circuit.and(d, b)?;
            let not_d = circuit.not(d);
            let dc = circuit.and(&not_d, c)?;
            (circuit.or(&db, &dc)?, (5 * step + 1) % 16)
        }
        2 => (circuit.xor_many(&[b, c, d])?, (3 * step + 5) % 16),
        _ => {
            let not_d = circuit.not(d);
            let b_or = circuit.or(b, &not_d)?;
            (circuit.xor(c, &b_or)?, (7 * step) % 16)
        }
    })
}

fn compress(
    circuit: &mut Circuit,
    state: &[SymBitVec],
    block: &SymBitVec,
    steps: usize,
) -> Result<Vec<SymBitVec>, HashError> {
    let m = words::block_words(block, Endian::Little);

    let mut a = state[0].clone();
    let mut b = state[1].clone();
    let mut c = state[2].clone();
    let mut d = state[3].clone();

    for step in 0..steps {
        let (f, g) = step_function(circuit, step, &b, &c, &d)?;
        let sum = circuit.add_many(&[&a, &f, &SymBitVec::from_u32(K[step]), &m[g]])?;
        let rotated = sum.rotl(SHIFTS[step / 16][step % 4])?;
        let new_b = circuit.add(&b, &rotated)?;

        a = d;
        d = c;
        c = b;
        b = new_b;
    }

    Ok(vec![
        circuit.add(&state[0], &a)?,
        circuit.add(&state[1], &b)?,
        circuit.add(&state[2], &c)?,
        circuit.add(&state[3], &d)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md5_hex(message: &[u8]) -> String {
        let mut circuit = Circuit::new();
        let digest = Md5
            .hash(&mut circuit, &SymBitVec::from_bytes(message), STEPS)
            .unwrap();
        digest
            .const_bytes()
            .unwrap()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }

    #[test]
    fn known_digests() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn sin_table() {
        for (i, &k) in K.iter().enumerate() {
            let expected = ((i as f64 + 1.0).sin().abs() * 4_294_967_296.0) as u32;
            assert_eq!(k, expected, "step {}", i);
        }
    }
}
