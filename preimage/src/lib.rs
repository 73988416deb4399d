//! Finding hash preimages with a SAT solver.
//!
//! An [`Attack`] builds the symbolic circuit of a hash family, encodes it as CNF with the digest
//! pinned to a target, solves the formula and reads a preimage off the model. Every preimage is
//! verified against an independent computation of the hash before it is returned.
//!
//! No preimage and running out of time are regular [`AttackOutcome`]s. Only malformed requests,
//! solver failures and a preimage failing verification are errors.
use std::fmt;

use thiserror::Error;

use preimage_circuit::CircuitError;
use preimage_cnf::{EncodeError, EncoderConfig};
use preimage_hash::{HashError, HashFamily};

pub mod attack;
pub mod config;
pub mod extract;
pub mod reference;
pub mod solver;

pub use attack::{sweep, Attack, AttackOutcome, Report, TargetSource};
pub use config::{Config, ConfigUpdate, SolveConfig, SolverBackend};
pub use extract::Preimage;
pub use preimage_hash::SymHash;
pub use solver::{running_varisat_workers, SolveOutcome, SolverError};

/// Possible errors of an attack session.
#[derive(Debug, Error)]
pub enum PreimageError {
    #[error(transparent)]
    Circuit(#[from] CircuitError),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("Recovered input does not hash to the target: {0}")]
    InternalEncodingFault(Box<EncodingFaultContext>),
}

impl From<std::io::Error> for PreimageError {
    fn from(err: std::io::Error) -> PreimageError {
        PreimageError::Solver(SolverError::Io(err))
    }
}

/// Everything needed to reproduce a preimage that failed verification.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EncodingFaultContext {
    pub family: HashFamily,
    pub difficulty: usize,
    pub encoder: EncoderConfig,
    pub var_count: usize,
    pub clause_count: usize,
    /// Recovered input in hex.
    pub input: String,
    /// Digest of the recovered input in hex.
    pub digest: String,
    /// Requested digest in hex.
    pub target: String,
}

impl fmt::Display for EncodingFaultContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} difficulty={} native_xor={} native_or={} vars={} clauses={} input={} digest={} \
             target={}",
            self.family,
            self.difficulty,
            self.encoder.native_xor,
            self.encoder.native_or,
            self.var_count,
            self.clause_count,
            self.input,
            self.digest,
            self.target,
        )
    }
}
