//! Tseitin encoding of symbolic hash circuits into CNF.
//!
//! [`encode`] turns the part of a [`Circuit`](preimage_circuit::Circuit) computing an output
//! vector into a [`CnfInstance`] whose models are exactly the input assignments producing a given
//! target. How XOR and OR gates are lowered is selected by an explicit [`EncoderConfig`].
use thiserror::Error;

pub mod config;
pub mod dimacs;
pub mod encoder;
pub mod instance;

pub use config::{EncoderConfig, EncoderConfigUpdate};
pub use encoder::{encode, encode_bytes, EncodeStats, FaultReason};
pub use instance::CnfInstance;

/// Possible errors while encoding a circuit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Cannot encode bit {}: {}", bit, reason)]
    EncodingFault { bit: usize, reason: FaultReason },
    #[error(
        "Target has {} bits but the output has {} bits",
        target,
        output
    )]
    TargetWidth { output: usize, target: usize },
}
