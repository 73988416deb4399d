//! Symbolic hash functions.
//!
//! Each hash family drives the round structure of its algorithm using only the operators of
//! [`SymBitVec`], so the digest it returns is backed by a circuit over the free bits of the
//! input. The `difficulty` parameter bounds the number of rounds executed; rounds past it are
//! never built.
//!
//! Inputs and digests use the byte layout of [`SymBitVec`]: bit `8 * k + i` is bit `i` of byte
//! `k`, and digests are produced in their standard byte order.
use std::ops::RangeInclusive;

use strum::{EnumIter, EnumString};
use thiserror::Error;

use preimage_circuit::{Circuit, CircuitError, SymBitVec};

pub mod md5;
pub mod ripemd160;
pub mod sha256;
pub mod synthetic;

mod words;

pub use md5::Md5;
pub use ripemd160::Ripemd160;
pub use sha256::Sha256;
pub use synthetic::{Complement, Identity, LossyPseudo, NonLossyPseudo};

/// Possible errors while building a hash circuit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error(
        "Invalid difficulty {} for {}, expected a value in {}..={}",
        difficulty,
        family,
        min,
        max
    )]
    InvalidDifficulty {
        family: HashFamily,
        difficulty: usize,
        min: usize,
        max: usize,
    },
    #[error("{} needs a whole number of bytes as input, got {} bits", family, bits)]
    UnalignedInput { family: HashFamily, bits: usize },
    #[error("{} needs a non-empty input", family)]
    EmptyInput { family: HashFamily },
    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

/// A hash function that can be evaluated symbolically.
///
/// Implementations are stateless. For the same input vector and difficulty they build the same
/// circuit structure, so repeated calls against one [`Circuit`] share all their gates.
pub trait SymHash {
    /// The family implemented.
    fn family(&self) -> HashFamily;

    /// Width of the digest for an input of `input_bits` bits.
    fn output_width(&self, input_bits: usize) -> usize;

    /// Accepted difficulties.
    fn difficulty_range(&self) -> RangeInclusive<usize>;

    /// The difficulty running the complete algorithm.
    fn default_difficulty(&self) -> usize {
        *self.difficulty_range().end()
    }

    /// Build the circuit computing the digest of `input` with `difficulty` rounds.
    fn hash(
        &self,
        circuit: &mut Circuit,
        input: &SymBitVec,
        difficulty: usize,
    ) -> Result<SymBitVec, HashError>;

    /// Fails with [`HashError::InvalidDifficulty`] when `difficulty` is out of range.
    fn check_difficulty(&self, difficulty: usize) -> Result<(), HashError> {
        let range = self.difficulty_range();
        if range.contains(&difficulty) {
            Ok(())
        } else {
            Err(HashError::InvalidDifficulty {
                family: self.family(),
                difficulty,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }
}

/// The supported hash families.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, EnumIter, EnumString, strum::Display)]
pub enum HashFamily {
    #[strum(to_string = "sha256", serialize = "sha-256")]
    Sha256,
    #[strum(to_string = "ripemd160", serialize = "ripemd-160")]
    Ripemd160,
    #[strum(to_string = "md5")]
    Md5,
    /// Output equals input.
    #[strum(to_string = "identity")]
    Identity,
    /// Output is the bitwise complement of the input.
    #[strum(to_string = "complement")]
    Complement,
    /// Mixing rounds followed by a reduction to half the input width.
    #[strum(to_string = "lossy-pseudo")]
    LossyPseudo,
    /// Invertible mixing rounds over the full input width.
    #[strum(to_string = "non-lossy-pseudo")]
    NonLossyPseudo,
}

impl HashFamily {
    /// Whether this is one of the standard cryptographic hashes.
    pub fn is_cryptographic(self) -> bool {
        match self {
            HashFamily::Sha256 | HashFamily::Ripemd160 | HashFamily::Md5 => true,
            _ => false,
        }
    }

    fn dispatch(self) -> &'static dyn SymHash {
        match self {
            HashFamily::Sha256 => &Sha256,
            HashFamily::Ripemd160 => &Ripemd160,
            HashFamily::Md5 => &Md5,
            HashFamily::Identity => &Identity,
            HashFamily::Complement => &Complement,
            HashFamily::LossyPseudo => &LossyPseudo,
            HashFamily::NonLossyPseudo => &NonLossyPseudo,
        }
    }
}

impl SymHash for HashFamily {
    fn family(&self) -> HashFamily {
        *self
    }

    fn output_width(&self, input_bits: usize) -> usize {
        self.dispatch().output_width(input_bits)
    }

    fn difficulty_range(&self) -> RangeInclusive<usize> {
        self.dispatch().difficulty_range()
    }

    fn default_difficulty(&self) -> usize {
        self.dispatch().default_difficulty()
    }

    fn hash(
        &self,
        circuit: &mut Circuit,
        input: &SymBitVec,
        difficulty: usize,
    ) -> Result<SymBitVec, HashError> {
        self.dispatch().hash(circuit, input, difficulty)
    }
}
