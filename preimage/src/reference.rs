//! Concrete reference hashes.
//!
//! Used to check recovered preimages without going through the circuit or the CNF encoding.
use md5::Md5;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use preimage_circuit::bitvec::{bits_to_bytes, bytes_to_bits};
use preimage_circuit::{Circuit, CircuitError, SymBitVec};
use preimage_hash::{HashError, HashFamily, SymHash};

mod native;

pub use native::NativeReference;

/// Computes digests of concrete inputs.
pub trait ReferenceHash {
    /// Digest bits of `input` under `family` truncated to `difficulty`.
    fn digest(
        &self,
        family: HashFamily,
        input: &[bool],
        difficulty: usize,
    ) -> Result<Vec<bool>, HashError>;
}

/// Builds the symbolic hash over a constant input, so every gate folds to a constant.
///
/// This runs the same code as the attacked circuit and cannot detect errors in it.
#[derive(Copy, Clone, Default, Debug)]
pub struct FoldingReference;

impl ReferenceHash for FoldingReference {
    fn digest(
        &self,
        family: HashFamily,
        input: &[bool],
        difficulty: usize,
    ) -> Result<Vec<bool>, HashError> {
        let mut circuit = Circuit::new();
        let input = SymBitVec::constant(input.iter().cloned());
        let output = family.hash(&mut circuit, &input, difficulty)?;
        output.const_bits().ok_or_else(|| {
            HashError::Circuit(CircuitError::NotConstant {
                width: output.width(),
            })
        })
    }
}

/// The RustCrypto implementations for the full cryptographic hashes, [`NativeReference`] for
/// everything else.
#[derive(Copy, Clone, Default, Debug)]
pub struct DigestReference;

impl ReferenceHash for DigestReference {
    fn digest(
        &self,
        family: HashFamily,
        input: &[bool],
        difficulty: usize,
    ) -> Result<Vec<bool>, HashError> {
        family.check_difficulty(difficulty)?;
        if difficulty != family.default_difficulty() || input.len() % 8 != 0 {
            return NativeReference.digest(family, input, difficulty);
        }
        let message = bits_to_bytes(input);
        let digest = match family {
            HashFamily::Sha256 => Sha256::digest(&message).to_vec(),
            HashFamily::Md5 => Md5::digest(&message).to_vec(),
            HashFamily::Ripemd160 => Ripemd160::digest(&message).to_vec(),
            _ => return NativeReference.digest(family, input, difficulty),
        };
        Ok(bytes_to_bits(&digest, digest.len() * 8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{rngs::StdRng, Rng, SeedableRng};
    use strum::IntoEnumIterator;

    fn random_bits(rng: &mut StdRng, len: usize) -> Vec<bool> {
        (0..len).map(|_| rng.gen()).collect()
    }

    #[test]
    fn references_agree() {
        let mut rng = StdRng::seed_from_u64(7);
        for family in HashFamily::iter() {
            for &len in [0usize, 8, 24, 448, 520].iter() {
                let input = random_bits(&mut rng, len);
                let difficulty = family.default_difficulty();
                let folded = FoldingReference.digest(family, &input, difficulty);
                let reference = DigestReference.digest(family, &input, difficulty);
                assert_eq!(folded, reference, "{} with {} bits", family, len);
            }
        }
    }

    #[test]
    fn circuits_agree_with_native_at_every_difficulty() {
        let mut rng = StdRng::seed_from_u64(11);
        for family in HashFamily::iter() {
            let range = family.difficulty_range();
            // Identity and complement accept any difficulty.
            let difficulties: Vec<usize> = if *range.end() <= 80 {
                range.collect()
            } else {
                vec![0, 1, 17, usize::max_value()]
            };
            let lengths: &[usize] = if family.is_cryptographic() {
                &[24, 480]
            } else {
                &[1, 2, 13, 40]
            };

            for &len in lengths {
                let input = random_bits(&mut rng, len);
                for &difficulty in difficulties.iter() {
                    let folded = FoldingReference.digest(family, &input, difficulty);
                    let native = NativeReference.digest(family, &input, difficulty);
                    assert!(native.is_ok());
                    assert_eq!(
                        folded, native,
                        "{} with {} bits at difficulty {}",
                        family, len, difficulty
                    );
                }
            }
        }
    }

    #[test]
    fn truncation_changes_the_digest() {
        let input = vec![true; 64];
        for family in HashFamily::iter().filter(|family| family.is_cryptographic()) {
            let full = DigestReference.digest(family, &input, family.default_difficulty());
            let truncated = DigestReference.digest(family, &input, family.default_difficulty() - 1);
            assert_ne!(full.unwrap(), truncated.unwrap(), "{}", family);
        }
    }

    #[test]
    fn invalid_difficulty() {
        assert!(DigestReference.digest(HashFamily::Md5, &[], 65).is_err());
        assert!(FoldingReference.digest(HashFamily::Sha256, &[], 0).is_err());
        assert!(NativeReference.digest(HashFamily::LossyPseudo, &[true], 65).is_err());
    }
}
