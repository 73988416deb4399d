//! Tseitin encoding of a circuit.
use std::{fmt, mem};

use log::debug;
use partial_ref::{part, partial, IntoPartialRefMut, PartialRef, PartialRefTarget};

use varisat_formula::{CnfFormula, ExtendFormula, Lit, Var};

use preimage_circuit::{Bit, Circuit, Node, NodeKind, SymBitVec};

use crate::config::EncoderConfig;
use crate::instance::CnfInstance;
use crate::EncodeError;

/// Why a bit could not be encoded.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FaultReason {
    /// The bit does not belong to the circuit.
    UnknownBit,
    /// An input bit was reached that has no variable.
    UnassignedInput,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FaultReason::UnknownBit => write!(f, "bit is not part of the circuit"),
            FaultReason::UnassignedInput => write!(f, "input bit has no variable"),
        }
    }
}

/// Clause and variable counts of an encoding.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct EncodeStats {
    /// Clauses emitted per node kind, indexed by [`NodeKind::index`].
    pub clauses: [usize; 6],
    /// Variables standing for circuit bits.
    pub bit_vars: usize,
    /// Variables introduced by rewriting XOR or OR gates.
    pub aux_vars: usize,
    /// Unit clauses pinning the output.
    pub output_clauses: usize,
}

impl EncodeStats {
    /// Clauses emitted for gates of the given kind.
    pub fn clause_count(&self, kind: NodeKind) -> usize {
        self.clauses[kind.index()]
    }

    /// Total number of clauses.
    pub fn total_clauses(&self) -> usize {
        self.clauses.iter().sum::<usize>() + self.output_clauses
    }
}

impl fmt::Display for EncodeStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} vars ({} aux), {} clauses",
            self.bit_vars + self.aux_vars,
            self.aux_vars,
            self.total_clauses()
        )?;
        for &kind in NodeKind::ALL.iter() {
            let count = self.clause_count(kind);
            if count > 0 {
                write!(f, ", {} {}", count, kind)?;
            }
        }
        write!(f, ", {} output", self.output_clauses)
    }
}

/// Two-way mapping between circuit bits and variables.
#[derive(Default)]
pub struct BitVars {
    /// Variable of each bit, indexed by bit.
    bit_var: Vec<Option<Var>>,
    /// Bit of each variable, `None` for auxiliary variables.
    var_bit: Vec<Option<Bit>>,
}

impl BitVars {
    /// The variable assigned to a bit.
    pub fn var(&self, bit: Bit) -> Option<Var> {
        self.bit_var.get(bit.index()).cloned().flatten()
    }

    /// The bit a variable stands for.
    pub fn bit(&self, var: Var) -> Option<Bit> {
        self.var_bit.get(var.index()).cloned().flatten()
    }

    /// Number of allocated variables.
    pub fn var_count(&self) -> usize {
        self.var_bit.len()
    }

    fn set_bit_count(&mut self, count: usize) {
        self.bit_var.resize(count, None);
    }

    fn new_var(&mut self, bit: Option<Bit>) -> Var {
        let var = Var::from_index(self.var_bit.len());
        self.var_bit.push(bit);
        if let Some(bit) = bit {
            self.bit_var[bit.index()] = Some(var);
        }
        var
    }
}

/// Part declarations for the [`EncodeContext`] struct.
mod parts {
    use super::*;

    part!(pub BitVarsP: BitVars);
    part!(pub ConfigP: EncoderConfig);
    part!(pub FormulaP: CnfFormula);
    part!(pub StatsP: EncodeStats);
}

use parts::*;

/// State of a single encoding pass.
#[derive(PartialRefTarget, Default)]
struct EncodeContext {
    #[part = "BitVarsP"]
    bit_vars: BitVars,
    #[part = "ConfigP"]
    config: EncoderConfig,
    #[part = "FormulaP"]
    formula: CnfFormula,
    #[part = "StatsP"]
    stats: EncodeStats,
}

/// Encodes the circuit computing `output` and pins the output to `target`.
///
/// Variables are allocated for all inputs of the circuit first, in input order, so that the
/// first `circuit.inputs().len()` variables always hold the preimage. Then every bit reachable
/// from the output is encoded exactly once, operands before the gates using them. Constant bits
/// become a variable fixed by a unit clause.
///
/// The result only depends on the circuit, the output bits, the target and the configuration.
pub fn encode(
    circuit: &Circuit,
    output: &SymBitVec,
    target: &[bool],
    config: &EncoderConfig,
) -> Result<CnfInstance, EncodeError> {
    if target.len() != output.width() {
        return Err(EncodeError::TargetWidth {
            output: output.width(),
            target: target.len(),
        });
    }

    let mut ctx = EncodeContext {
        config: *config,
        ..EncodeContext::default()
    };
    let mut ctx = ctx.into_partial_ref_mut();

    ctx.part_mut(BitVarsP).set_bit_count(circuit.len());

    let input_vars: Vec<Var> = circuit
        .inputs()
        .iter()
        .map(|&bit| ctx.part_mut(BitVarsP).new_var(Some(bit)))
        .collect();
    ctx.part_mut(StatsP).bit_vars += input_vars.len();

    let mut output_vars = Vec::with_capacity(output.width());
    for &bit in output.bits() {
        output_vars.push(encode_cone(ctx.borrow(), circuit, bit)?);
    }

    for (&var, &value) in output_vars.iter().zip(target.iter()) {
        ctx.part_mut(FormulaP).add_clause(&[var.lit(value)]);
    }
    ctx.part_mut(StatsP).output_clauses += output_vars.len();

    let bit_vars = mem::take(ctx.part_mut(BitVarsP));
    let mut formula = mem::take(ctx.part_mut(FormulaP));
    // Inputs outside the cone of the output appear in no clause.
    formula.set_var_count(bit_vars.var_count());
    let stats = mem::take(ctx.part_mut(StatsP));

    debug!("encoded: {}", stats);

    Ok(CnfInstance::new(
        formula,
        bit_vars,
        input_vars,
        output_vars,
        target.to_vec(),
        stats,
        *config,
    ))
}

/// Encodes a target given as bytes, using the byte layout of [`SymBitVec`].
pub fn encode_bytes(
    circuit: &Circuit,
    output: &SymBitVec,
    target: &[u8],
    config: &EncoderConfig,
) -> Result<CnfInstance, EncodeError> {
    let expected = (output.width() + 7) / 8;
    if target.len() != expected {
        return Err(EncodeError::TargetWidth {
            output: output.width(),
            target: target.len() * 8,
        });
    }
    let bits = preimage_circuit::bitvec::bytes_to_bits(target, output.width());
    encode(circuit, output, &bits, config)
}

/// Encodes all not yet encoded bits needed to compute `root`.
///
/// Uses an explicit stack so deep circuits do not overflow the call stack.
fn encode_cone(
    mut ctx: partial!(EncodeContext, mut BitVarsP, mut FormulaP, mut StatsP, ConfigP),
    circuit: &Circuit,
    root: Bit,
) -> Result<Var, EncodeError> {
    let mut stack = vec![(root, false)];

    while let Some((bit, operands_done)) = stack.pop() {
        if ctx.part(BitVarsP).var(bit).is_some() {
            continue;
        }
        let node = circuit.get(bit).ok_or(EncodeError::EncodingFault {
            bit: bit.index(),
            reason: FaultReason::UnknownBit,
        })?;
        let operands = node.operands();

        if operands_done || operands.is_empty() {
            encode_node(ctx.borrow(), bit, node)?;
        } else {
            stack.push((bit, true));
            for &operand in operands.iter().rev() {
                if ctx.part(BitVarsP).var(operand).is_none() {
                    stack.push((operand, false));
                }
            }
        }
    }

    ctx.part(BitVarsP)
        .var(root)
        .ok_or(EncodeError::EncodingFault {
            bit: root.index(),
            reason: FaultReason::UnknownBit,
        })
}

/// Emits the clauses defining a single bit whose operands are already encoded.
fn encode_node(
    mut ctx: partial!(EncodeContext, mut BitVarsP, mut FormulaP, mut StatsP, ConfigP),
    bit: Bit,
    node: Node,
) -> Result<(), EncodeError> {
    if let Node::Input(_) = node {
        return Err(EncodeError::EncodingFault {
            bit: bit.index(),
            reason: FaultReason::UnassignedInput,
        });
    }

    let bit_vars = ctx.part(BitVarsP);
    let operands = node
        .operands()
        .iter()
        .map(|&operand| {
            bit_vars
                .var(operand)
                .map(Var::positive)
                .ok_or(EncodeError::EncodingFault {
                    bit: operand.index(),
                    reason: FaultReason::UnknownBit,
                })
        })
        .collect::<Result<Vec<Lit>, _>>()?;

    let out = ctx.part_mut(BitVarsP).new_var(Some(bit)).positive();
    ctx.part_mut(StatsP).bit_vars += 1;

    let before = ctx.part(FormulaP).len();
    match node {
        Node::Const(value) => ctx.part_mut(FormulaP).add_clause(&[out ^ !value]),
        Node::Not(_) => emit_not(ctx.borrow(), out, operands[0]),
        Node::And(..) => emit_and(ctx.borrow(), out, operands[0], operands[1]),
        Node::Or(..) => emit_or(ctx.borrow(), out, operands[0], operands[1]),
        Node::Xor(..) => emit_xor(ctx.borrow(), out, operands[0], operands[1]),
        Node::Input(_) => unreachable!(),
    }
    let emitted = ctx.part(FormulaP).len() - before;
    ctx.part_mut(StatsP).clauses[node.kind().index()] += emitted;

    Ok(())
}

fn aux_lit(mut ctx: partial!(EncodeContext, mut BitVarsP, mut StatsP)) -> Lit {
    ctx.part_mut(StatsP).aux_vars += 1;
    ctx.part_mut(BitVarsP).new_var(None).positive()
}

/// `out <-> !a`
fn emit_not(mut ctx: partial!(EncodeContext, mut FormulaP), out: Lit, a: Lit) {
    let formula = ctx.part_mut(FormulaP);
    formula.add_clause(&[out, a]);
    formula.add_clause(&[!out, !a]);
}

/// `out <-> a & b`
fn emit_and(mut ctx: partial!(EncodeContext, mut FormulaP), out: Lit, a: Lit, b: Lit) {
    let formula = ctx.part_mut(FormulaP);
    formula.add_clause(&[!out, a]);
    formula.add_clause(&[!out, b]);
    formula.add_clause(&[out, !a, !b]);
}

/// `out <-> a | b`
fn emit_or(
    mut ctx: partial!(EncodeContext, mut BitVarsP, mut FormulaP, mut StatsP, ConfigP),
    out: Lit,
    a: Lit,
    b: Lit,
) {
    if ctx.part(ConfigP).native_or {
        let formula = ctx.part_mut(FormulaP);
        formula.add_clause(&[out, !a]);
        formula.add_clause(&[out, !b]);
        formula.add_clause(&[!out, a, b]);
    } else {
        // a | b = !(!a & !b)
        let not_a = aux_lit(ctx.borrow());
        let not_b = aux_lit(ctx.borrow());
        let both_false = aux_lit(ctx.borrow());
        emit_not(ctx.borrow(), not_a, a);
        emit_not(ctx.borrow(), not_b, b);
        emit_and(ctx.borrow(), both_false, not_a, not_b);
        emit_not(ctx.borrow(), out, both_false);
    }
}

/// `out <-> a ^ b`
fn emit_xor(
    mut ctx: partial!(EncodeContext, mut BitVarsP, mut FormulaP, mut StatsP, ConfigP),
    out: Lit,
    a: Lit,
    b: Lit,
) {
    if ctx.part(ConfigP).native_xor {
        let formula = ctx.part_mut(FormulaP);
        formula.add_clause(&[!out, a, b]);
        formula.add_clause(&[!out, !a, !b]);
        formula.add_clause(&[out, !a, b]);
        formula.add_clause(&[out, a, !b]);
    } else {
        // a ^ b = (a | b) & !(a & b)
        let any = aux_lit(ctx.borrow());
        let both = aux_lit(ctx.borrow());
        let not_both = aux_lit(ctx.borrow());
        emit_or(ctx.borrow(), any, a, b);
        emit_and(ctx.borrow(), both, a, b);
        emit_not(ctx.borrow(), not_both, both);
        emit_and(ctx.borrow(), out, any, not_both);
    }
}
