//! Symbolic bit vectors recorded as a shared boolean circuit.
//!
//! Every operation on a [`SymBitVec`] is recorded in a [`Circuit`]. The circuit is an append-only
//! arena of [`Node`]s with structural deduplication, so identical gates built from different call
//! sites share a single [`Bit`]. Operations on known constants are folded immediately and never
//! allocate a node.
//!
//! The gate vocabulary is closed: constants, inputs, NOT, AND, OR and XOR. Arithmetic is built from
//! these gates, which keeps the CNF encoding of a circuit small and uniform.

use thiserror::Error;

pub mod bit;
pub mod bitvec;
pub mod circuit;

mod ops;

pub use bit::{Bit, Node, NodeKind};
pub use bitvec::SymBitVec;
pub use circuit::{Circuit, CircuitStats};

/// Possible errors while building symbolic bit vectors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CircuitError {
    #[error("Width mismatch: operands have {} and {} bits", left, right)]
    WidthMismatch { left: usize, right: usize },
    #[error("Invalid shift amount {} for a vector of {} bits", amount, width)]
    InvalidShiftAmount { amount: usize, width: usize },
    #[error("Range {}..{} is out of bounds for a vector of {} bits", start, end, width)]
    SliceOutOfRange {
        start: usize,
        end: usize,
        width: usize,
    },
    #[error("Expected values for {} inputs but got {}", expected, found)]
    AssignmentLength { expected: usize, found: usize },
    #[error("Bit {} does not belong to this circuit", bit)]
    UnknownBit { bit: usize },
    #[error("Vector of {} bits is not constant", width)]
    NotConstant { width: usize },
}
