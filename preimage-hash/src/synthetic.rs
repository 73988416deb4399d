//! Synthetic hashes for exercising the engine without cryptographic complexity.
//!
//! [`Identity`] and [`Complement`] check that a preimage survives the encode, solve and extract
//! round trip exactly. [`LossyPseudo`] discards information, so a target usually has several
//! preimages. [`NonLossyPseudo`] is a bijection on its input width, so every target has exactly
//! one preimage.
use std::ops::RangeInclusive;

use preimage_circuit::{Circuit, SymBitVec};

use crate::{sha256, HashError, HashFamily, SymHash};

/// Largest number of mixing rounds of the pseudo hashes.
pub const MAX_ROUNDS: usize = 64;

/// A `width` bit constant for mixing round `round`.
///
/// The bits are taken from consecutive SHA-256 round constants starting at `round`.
pub fn round_constant(round: usize, width: usize) -> SymBitVec {
    SymBitVec::constant((0..width).map(|j| {
        let word = sha256::K[(round + j / 32) % sha256::K.len()];
        (word >> (j % 32)) & 1 == 1
    }))
}

/// Output equals input, the difficulty is ignored.
#[derive(Copy, Clone, Default, Debug)]
pub struct Identity;

impl SymHash for Identity {
    fn family(&self) -> HashFamily {
        HashFamily::Identity
    }

    fn output_width(&self, input_bits: usize) -> usize {
        input_bits
    }

    fn difficulty_range(&self) -> RangeInclusive<usize> {
        0..=usize::max_value()
    }

    fn default_difficulty(&self) -> usize {
        0
    }

    fn hash(
        &self,
        _circuit: &mut Circuit,
        input: &SymBitVec,
        _difficulty: usize,
    ) -> Result<SymBitVec, HashError> {
        Ok(input.clone())
    }
}

/// Output is the bitwise complement of the input, the difficulty is ignored.
#[derive(Copy, Clone, Default, Debug)]
pub struct Complement;

impl SymHash for Complement {
    fn family(&self) -> HashFamily {
        HashFamily::Complement
    }

    fn output_width(&self, input_bits: usize) -> usize {
        input_bits
    }

    fn difficulty_range(&self) -> RangeInclusive<usize> {
        0..=usize::max_value()
    }

    fn default_difficulty(&self) -> usize {
        0
    }

    fn hash(
        &self,
        circuit: &mut Circuit,
        input: &SymBitVec,
        _difficulty: usize,
    ) -> Result<SymBitVec, HashError> {
        Ok(circuit.not(input))
    }
}

/// Compresses `n` input bits into `ceil(n / 2)` output bits.
///
/// The input is split into a low half `l` of `h = ceil(n / 2)` bits and a high half `r`, zero
/// extended to `h` bits. Starting from `s = l`, each round computes
/// `s = (rotl(s, 1) ^ (s & r)) + c` for the round constant `c`. The output is `s ^ r`.
#[derive(Copy, Clone, Default, Debug)]
pub struct LossyPseudo;

impl SymHash for LossyPseudo {
    fn family(&self) -> HashFamily {
        HashFamily::LossyPseudo
    }

    fn output_width(&self, input_bits: usize) -> usize {
        (input_bits + 1) / 2
    }

    fn difficulty_range(&self) -> RangeInclusive<usize> {
        0..=MAX_ROUNDS
    }

    fn hash(
        &self,
        circuit: &mut Circuit,
        input: &SymBitVec,
        difficulty: usize,
    ) -> Result<SymBitVec, HashError> {
        self.check_difficulty(difficulty)?;
        if input.is_empty() {
            return Err(HashError::EmptyInput {
                family: self.family(),
            });
        }

        let n = input.width();
        let h = self.output_width(n);
        let right = input.slice(h..n)?.zero_extend(h)?;

        let mut state = input.slice(0..h)?;
        for round in 0..difficulty {
            let masked = circuit.and(&state, &right)?;
            let mixed = circuit.xor(&state.rotl(1 % h)?, &masked)?;
            state = circuit.add(&mixed, &round_constant(round, h))?;
        }

        Ok(circuit.xor(&state, &right)?)
    }
}

/// Invertible mixing of `n` bits.
///
/// Each round applies `x ^= x << 1`, adds the round constant, applies `x ^= x >> max(1, n / 2)`
/// and rotates left by `3 mod n`. Every step is a bijection, and difficulty 0 is the identity.
#[derive(Copy, Clone, Default, Debug)]
pub struct NonLossyPseudo;

impl SymHash for NonLossyPseudo {
    fn family(&self) -> HashFamily {
        HashFamily::NonLossyPseudo
    }

    fn output_width(&self, input_bits: usize) -> usize {
        input_bits
    }

    fn difficulty_range(&self) -> RangeInclusive<usize> {
        0..=MAX_ROUNDS
    }

    fn hash(
        &self,
        circuit: &mut Circuit,
        input: &SymBitVec,
        difficulty: usize,
    ) -> Result<SymBitVec, HashError> {
        self.check_difficulty(difficulty)?;
        if input.is_empty() {
            return Err(HashError::EmptyInput {
                family: self.family(),
            });
        }

        let n = input.width();
        let mut x = input.clone();
        for round in 0..difficulty {
            // Both xorshifts degenerate to clearing the only bit of a 1-bit vector.
            if n > 1 {
                x = circuit.xor(&x, &x.shl(1)?)?;
            }
            x = circuit.add(&x, &round_constant(round, n))?;
            if n > 1 {
                x = circuit.xor(&x, &x.shr((n / 2).max(1))?)?;
            }
            x = x.rotl(3 % n)?;
        }

        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::{prelude::*, *};

    use preimage_circuit::bitvec::strategy::constant_vec;

    fn fold(hash: &dyn SymHash, input: &SymBitVec, difficulty: usize) -> Vec<bool> {
        let mut circuit = Circuit::new();
        let output = hash.hash(&mut circuit, input, difficulty).unwrap();
        assert!(circuit.is_empty());
        output.const_bits().unwrap()
    }

    fn all_inputs(width: usize) -> impl Iterator<Item = SymBitVec> {
        (0..1u64 << width).map(move |value| SymBitVec::from_u64(value, width))
    }

    #[test]
    fn round_constants() {
        assert_eq!(round_constant(0, 32).const_u64(), Some(sha256::K[0] as u64));
        assert_eq!(round_constant(63, 32).const_u64(), Some(sha256::K[63] as u64));
        assert_eq!(
            round_constant(63, 64).const_u64(),
            Some(((sha256::K[0] as u64) << 32) | sha256::K[63] as u64)
        );
        assert_eq!(round_constant(5, 4).const_u64(), Some((sha256::K[5] & 0xf) as u64));
    }

    #[test]
    fn complement_flips_every_bit() {
        let input = SymBitVec::from_u64(0b1011_0010, 8);
        assert_eq!(
            fold(&Complement, &input, 0),
            SymBitVec::from_u64(0b0100_1101, 8).const_bits().unwrap()
        );
        assert_eq!(fold(&Identity, &input, 7), input.const_bits().unwrap());
    }

    #[test]
    fn non_lossy_difficulty_zero_is_identity() {
        let mut circuit = Circuit::new();
        let input = circuit.input_vec(12);
        assert_eq!(NonLossyPseudo.hash(&mut circuit, &input, 0).unwrap(), input);
    }

    #[test]
    fn non_lossy_is_a_bijection() {
        for &width in [1, 2, 3, 5, 8].iter() {
            for &difficulty in [0, 1, 3, 64].iter() {
                let mut outputs: Vec<Vec<bool>> = all_inputs(width)
                    .map(|input| fold(&NonLossyPseudo, &input, difficulty))
                    .collect();
                outputs.sort();
                outputs.dedup();
                assert_eq!(outputs.len(), 1 << width, "{} bits, {} rounds", width, difficulty);
            }
        }
    }

    #[test]
    fn lossy_has_collisions() {
        for &width in [2, 5, 8].iter() {
            let mut outputs: Vec<Vec<bool>> = all_inputs(width)
                .map(|input| fold(&LossyPseudo, &input, 4))
                .collect();
            outputs.sort();
            outputs.dedup();
            assert!(outputs.len() <= 1 << LossyPseudo.output_width(width));
            assert!(outputs.len() < 1 << width);
        }
    }

    proptest! {
        #[test]
        fn symbolic_matches_folding(
            input in constant_vec(1..40usize),
            difficulty in 0..=MAX_ROUNDS,
        ) {
            for hash in [&LossyPseudo as &dyn SymHash, &NonLossyPseudo].iter() {
                let mut circuit = Circuit::new();
                let free = circuit.input_vec(input.width());
                let output = hash.hash(&mut circuit, &free, difficulty).unwrap();
                prop_assert_eq!(output.width(), hash.output_width(input.width()));

                let values = circuit
                    .evaluate(output.bits(), &input.const_bits().unwrap())
                    .unwrap();
                prop_assert_eq!(values, fold(*hash, &input, difficulty));
            }
        }
    }
}
