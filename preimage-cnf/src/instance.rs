//! Encoded CNF instances.
use varisat_formula::{CnfFormula, Lit, Var};

use preimage_circuit::Bit;

use crate::config::EncoderConfig;
use crate::encoder::{BitVars, EncodeStats};

/// A circuit encoded as CNF with its output pinned to a target.
///
/// Every variable either stands for exactly one circuit bit or is an auxiliary variable
/// introduced by rewriting a gate. The first [`input_vars`](CnfInstance::input_vars) variables
/// are the circuit inputs in allocation order.
pub struct CnfInstance {
    formula: CnfFormula,
    bit_vars: BitVars,
    input_vars: Vec<Var>,
    output_vars: Vec<Var>,
    target: Vec<bool>,
    stats: EncodeStats,
    config: EncoderConfig,
}

impl CnfInstance {
    pub(crate) fn new(
        formula: CnfFormula,
        bit_vars: BitVars,
        input_vars: Vec<Var>,
        output_vars: Vec<Var>,
        target: Vec<bool>,
        stats: EncodeStats,
        config: EncoderConfig,
    ) -> CnfInstance {
        CnfInstance {
            formula,
            bit_vars,
            input_vars,
            output_vars,
            target,
            stats,
            config,
        }
    }

    /// The clauses.
    pub fn formula(&self) -> &CnfFormula {
        &self.formula
    }

    /// Number of variables, including auxiliary ones.
    pub fn var_count(&self) -> usize {
        self.bit_vars.var_count()
    }

    /// Number of clauses, including the unit clauses pinning the output.
    pub fn clause_count(&self) -> usize {
        self.formula.len()
    }

    /// Variables of the circuit inputs, in allocation order.
    pub fn input_vars(&self) -> &[Var] {
        &self.input_vars
    }

    /// Variables of the output bits, least significant first.
    pub fn output_vars(&self) -> &[Var] {
        &self.output_vars
    }

    /// The value each output bit is pinned to.
    pub fn target(&self) -> &[bool] {
        &self.target
    }

    /// The variable of an encoded bit.
    pub fn var(&self, bit: Bit) -> Option<Var> {
        self.bit_vars.var(bit)
    }

    /// The bit a variable stands for, `None` for auxiliary variables.
    pub fn bit(&self, var: Var) -> Option<Bit> {
        self.bit_vars.bit(var)
    }

    pub fn stats(&self) -> &EncodeStats {
        &self.stats
    }

    /// The configuration used for encoding.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Values of the input variables under a model.
    ///
    /// Variables missing from the model read as false. A model lists each variable at most once
    /// with the polarity it is assigned.
    pub fn input_values(&self, model: &[Lit]) -> Vec<bool> {
        let mut values = vec![false; self.var_count()];
        for lit in model.iter() {
            if let Some(value) = values.get_mut(lit.index()) {
                *value = lit.is_positive();
            }
        }
        self.input_vars
            .iter()
            .map(|var| values[var.index()])
            .collect()
    }

    /// Whether a model satisfies every clause.
    pub fn satisfied_by(&self, model: &[Lit]) -> bool {
        let mut values = vec![None; self.var_count()];
        for lit in model.iter() {
            if let Some(value) = values.get_mut(lit.index()) {
                *value = Some(lit.is_positive());
            }
        }
        self.formula.iter().all(|clause| {
            clause
                .iter()
                .any(|lit| values.get(lit.index()).cloned().flatten() == Some(lit.is_positive()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use preimage_circuit::{Circuit, SymBitVec};

    use crate::encoder::encode;

    #[test]
    fn model_mapping() {
        let mut circuit = Circuit::new();
        let x = circuit.input_vec(3);
        let out = circuit.not(&x);
        let instance = encode(&circuit, &out, &[true, false, false], &EncoderConfig::default())
            .unwrap();

        assert_eq!(instance.var_count(), 6);
        assert_eq!(instance.output_vars().len(), 3);
        assert_eq!(instance.target(), &[true, false, false]);

        let model: Vec<Lit> = vec![
            Var::from_index(0).negative(),
            Var::from_index(1).positive(),
            Var::from_index(2).positive(),
            Var::from_index(3).positive(),
            Var::from_index(4).negative(),
            Var::from_index(5).negative(),
        ];
        assert!(instance.satisfied_by(&model));
        assert_eq!(instance.input_values(&model), vec![false, true, true]);

        let wrong: Vec<Lit> = model.iter().map(|&lit| !lit).collect();
        assert!(!instance.satisfied_by(&wrong));
        assert!(!instance.satisfied_by(&model[..3]));

        assert_eq!(instance.bit(Var::from_index(3)), Some(out.bit(0)));
        assert_eq!(instance.var(SymBitVec::zero(1).bit(0)), None);
    }
}
