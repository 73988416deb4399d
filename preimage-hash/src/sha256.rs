//! Symbolic SHA-256.
use std::ops::RangeInclusive;

use log::debug;

use preimage_circuit::{Circuit, SymBitVec};

use crate::words::{self, Endian, BLOCK_BITS};
use crate::{HashError, HashFamily, SymHash};

/// Round constants.
pub const K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

/// Initial hash value.
pub const IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

pub const ROUNDS: usize = 64;

/// SHA-256 with the compression function truncated to `difficulty` rounds.
#[derive(Copy, Clone, Default, Debug)]
pub struct Sha256;

impl SymHash for Sha256 {
    fn family(&self) -> HashFamily {
        HashFamily::Sha256
    }

    fn output_width(&self, _input_bits: usize) -> usize {
        256
    }

    fn difficulty_range(&self) -> RangeInclusive<usize> {
        1..=ROUNDS
    }

    fn hash(
        &self,
        circuit: &mut Circuit,
        input: &SymBitVec,
        difficulty: usize,
    ) -> Result<SymBitVec, HashError> {
        self.check_difficulty(difficulty)?;
        words::check_aligned(self.family(), input)?;

        let padded = words::md_padding(input, Endian::Big);
        debug!(
            "sha256: {} blocks, {} rounds",
            padded.width() / BLOCK_BITS,
            difficulty
        );

        let mut state = words::constant_words(&IV);
        for block in padded.chunks(BLOCK_BITS) {
            state = compress(circuit, &state, &block, difficulty)?;
        }

        Ok(words::digest(&state, Endian::Big))
    }
}

/// The message schedule, expanded only as far as the rounds executed.
fn schedule(
    circuit: &mut Circuit,
    block: &SymBitVec,
    rounds: usize,
) -> Result<Vec<SymBitVec>, HashError> {
    let mut w = words::block_words(block, Endian::Big);
    for t in 16..rounds {
        let s0 = {
            let x = &w[t - 15];
            circuit.xor_many(&[&x.rotr(7)?, &x.rotr(18)?, &x.shr(3)?])?
        };
        let s1 = {
            let x = &w[t - 2];
            circuit.xor_many(&[&x.rotr(17)?, &x.rotr(19)?, &x.shr(10)?])?
        };
        let next = circuit.add_many(&[&w[t - 16], &s0, &w[t - 7], &s1])?;
        w.push(next);
    }
    Ok(w)
}

fn compress(
    circuit: &mut Circuit,
    state: &[SymBitVec],
    block: &SymBitVec,
    rounds: usize,
) -> Result<Vec<SymBitVec>, HashError> {
    let w = schedule(circuit, block, rounds)?;

    let mut v = state.to_vec();
    for (t, &k) in K.iter().enumerate().take(rounds) {
        let (a, b, c, d) = (&v[0], &v[1], &v[2], &v[3]);
        let (e, f, g, h) = (&v[4], &v[5], &v[6], &v[7]);

        let sigma1 = circuit.xor_many(&[&e.rotr(6)?, &e.rotr(11)?, &e.rotr(25)?])?;
        let ch = {
            let ef = circuit.and(e, f)?;
            let not_e = circuit.not(e);
            let eg = circuit.and(&not_e, g)?;
            circuit.xor(&ef, &eg)?
        };
        let temp1 = circuit.add_many(&[h, &sigma1, &ch, &SymBitVec::from_u32(k), &w[t]])?;

        let sigma0 = circuit.xor_many(&[&a.rotr(2)?, &a.rotr(13)?, &a.rotr(22)?])?;
        let maj = {
            let ab = circuit.and(a, b)?;
            let ac = circuit.and(a, c)?;
            let bc = circuit.and(b, c)?;
            circuit.xor_many(&[&ab, &ac, &bc])?
        };
        let temp2 = circuit.add(&sigma0, &maj)?;

        let new_e = circuit.add(d, &temp1)?;
        let new_a = circuit.add(&temp1, &temp2)?;

        v.pop();
        v.insert(0, new_a);
        v[4] = new_e;
    }

    state
        .iter()
        .zip(v.iter())
        .map(|(initial, updated)| circuit.add(initial, updated).map_err(HashError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abc_digest() {
        let mut circuit = Circuit::new();
        let digest = Sha256
            .hash(&mut circuit, &SymBitVec::from_bytes(b"abc"), ROUNDS)
            .unwrap();
        assert_eq!(
            digest.const_bytes().unwrap(),
            vec![
                0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae,
                0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61,
                0xf2, 0x00, 0x15, 0xad,
            ]
        );
        assert!(circuit.is_empty());
    }

    #[test]
    fn fewer_rounds_build_smaller_circuits() {
        let mut sizes = vec![];
        for &rounds in [1, 8, 16, 24].iter() {
            let mut circuit = Circuit::new();
            let input = circuit.input_vec(32);
            let digest = Sha256.hash(&mut circuit, &input, rounds).unwrap();
            assert_eq!(digest.width(), 256);
            sizes.push(circuit.len());
        }
        assert!(sizes.windows(2).all(|pair| pair[0] < pair[1]), "{:?}", sizes);
    }
}
