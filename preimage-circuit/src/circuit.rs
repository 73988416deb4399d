//! The circuit store.
use std::fmt;

use log::debug;
use rustc_hash::FxHashMap;

use crate::bit::{Bit, Node, NodeKind};
use crate::CircuitError;

/// Append-only arena of circuit nodes with structural deduplication.
///
/// A circuit owns every bit created during one solving session. Bits are never removed, so a
/// [`Bit`] stays valid for the lifetime of its circuit. Independent sessions should use
/// independent circuits.
///
/// A circuit holds at most `Bit::max_bit().index() + 1` nodes. Allocating past that panics.
pub struct Circuit {
    nodes: Vec<Node>,
    /// Input bits in allocation order.
    inputs: Vec<Bit>,
    /// Hash-consing table from gate structure to its identity.
    unique: FxHashMap<Node, Bit>,
    /// Number of gate requests answered without a new node by constant folding.
    folded: usize,
    /// Number of gate requests answered by an existing structurally equal node.
    shared: usize,
}

impl Default for Circuit {
    fn default() -> Circuit {
        Circuit {
            nodes: vec![Node::Const(false), Node::Const(true)],
            inputs: vec![],
            unique: FxHashMap::default(),
            folded: 0,
            shared: 0,
        }
    }
}

impl Circuit {
    /// Create a circuit containing just the two constants.
    pub fn new() -> Circuit {
        Circuit::default()
    }

    /// Number of nodes, including the two constants.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the circuit contains nothing but the constants.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 2
    }

    /// The node recorded for a bit.
    ///
    /// Panics if the bit does not belong to this circuit.
    pub fn node(&self, bit: Bit) -> Node {
        self.nodes[bit.index()]
    }

    /// The node recorded for a bit, `None` if the bit does not belong to this circuit.
    pub fn get(&self, bit: Bit) -> Option<Node> {
        self.nodes.get(bit.index()).cloned()
    }

    /// Input bits in allocation order.
    pub fn inputs(&self) -> &[Bit] {
        &self.inputs
    }

    /// Allocate a fresh unconstrained input bit.
    pub fn new_input(&mut self) -> Bit {
        let bit = self.push(Node::Input(self.inputs.len()));
        self.inputs.push(bit);
        bit
    }

    /// Negation of a bit.
    pub fn not_gate(&mut self, a: Bit) -> Bit {
        if let Some(value) = a.const_value() {
            return self.fold(Bit::constant(!value));
        }
        if let Node::Not(inner) = self.node(a) {
            return self.fold(inner);
        }
        self.intern(Node::Not(a))
    }

    /// Conjunction of two bits.
    pub fn and_gate(&mut self, a: Bit, b: Bit) -> Bit {
        match (a.const_value(), b.const_value()) {
            (Some(false), _) | (_, Some(false)) => return self.fold(Bit::FALSE),
            (Some(true), _) => return self.fold(b),
            (_, Some(true)) => return self.fold(a),
            _ => (),
        }
        if a == b {
            return self.fold(a);
        }
        if self.complementary(a, b) {
            return self.fold(Bit::FALSE);
        }
        let (a, b) = ordered(a, b);
        self.intern(Node::And(a, b))
    }

    /// Disjunction of two bits.
    pub fn or_gate(&mut self, a: Bit, b: Bit) -> Bit {
        match (a.const_value(), b.const_value()) {
            (Some(true), _) | (_, Some(true)) => return self.fold(Bit::TRUE),
            (Some(false), _) => return self.fold(b),
            (_, Some(false)) => return self.fold(a),
            _ => (),
        }
        if a == b {
            return self.fold(a);
        }
        if self.complementary(a, b) {
            return self.fold(Bit::TRUE);
        }
        let (a, b) = ordered(a, b);
        self.intern(Node::Or(a, b))
    }

    /// Exclusive or of two bits.
    pub fn xor_gate(&mut self, a: Bit, b: Bit) -> Bit {
        match (a.const_value(), b.const_value()) {
            (Some(false), _) => return self.fold(b),
            (_, Some(false)) => return self.fold(a),
            (Some(true), _) => {
                self.folded += 1;
                return self.not_gate(b);
            }
            (_, Some(true)) => {
                self.folded += 1;
                return self.not_gate(a);
            }
            _ => (),
        }
        if a == b {
            return self.fold(Bit::FALSE);
        }
        if self.complementary(a, b) {
            return self.fold(Bit::TRUE);
        }
        let (a, b) = ordered(a, b);
        self.intern(Node::Xor(a, b))
    }

    /// Concretely evaluate bits under an assignment of all inputs.
    ///
    /// `input_values` is indexed like [`inputs`](Circuit::inputs).
    pub fn evaluate(&self, bits: &[Bit], input_values: &[bool]) -> Result<Vec<bool>, CircuitError> {
        if input_values.len() != self.inputs.len() {
            return Err(CircuitError::AssignmentLength {
                expected: self.inputs.len(),
                found: input_values.len(),
            });
        }

        let end = match bits.iter().map(|bit| bit.index()).max() {
            None => return Ok(vec![]),
            Some(max_index) if max_index >= self.nodes.len() => {
                return Err(CircuitError::UnknownBit { bit: max_index })
            }
            Some(max_index) => max_index + 1,
        };

        // Operands always precede the gates using them, so a single forward pass suffices.
        let mut values = Vec::with_capacity(end);
        for node in self.nodes[..end].iter() {
            let value = match *node {
                Node::Input(index) => input_values[index],
                gate => gate.eval(|operand| values[operand.index()]).unwrap_or(false),
            };
            values.push(value);
        }

        Ok(bits.iter().map(|bit| values[bit.index()]).collect())
    }

    /// Node counts and folding statistics.
    pub fn stats(&self) -> CircuitStats {
        let mut stats = CircuitStats {
            folded: self.folded,
            shared: self.shared,
            ..CircuitStats::default()
        };
        for node in self.nodes.iter() {
            stats.nodes[node.kind().index()] += 1;
        }
        stats
    }

    /// Log a summary of the circuit's size.
    pub fn log_stats(&self) {
        debug!("circuit: {}", self.stats());
    }

    fn complementary(&self, a: Bit, b: Bit) -> bool {
        self.node(a) == Node::Not(b) || self.node(b) == Node::Not(a)
    }

    fn fold(&mut self, bit: Bit) -> Bit {
        self.folded += 1;
        bit
    }

    fn intern(&mut self, node: Node) -> Bit {
        if let Some(&bit) = self.unique.get(&node) {
            self.shared += 1;
            return bit;
        }
        let bit = self.push(node);
        self.unique.insert(node, bit);
        bit
    }

    fn push(&mut self, node: Node) -> Bit {
        check_capacity(self.nodes.len());
        let bit = Bit::from_index(self.nodes.len());
        self.nodes.push(node);
        bit
    }
}

/// Panics unless a circuit of `len` nodes has room for one more.
fn check_capacity(len: usize) {
    assert!(
        len <= Bit::max_bit().index(),
        "circuit node limit of {} exceeded",
        Bit::max_bit().index() + 1
    );
}

fn ordered(a: Bit, b: Bit) -> (Bit, Bit) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Size statistics of a [`Circuit`].
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct CircuitStats {
    /// Node count per kind, indexed by [`NodeKind::index`].
    pub nodes: [usize; 6],
    /// Gate requests answered by constant folding.
    pub folded: usize,
    /// Gate requests answered by an existing node.
    pub shared: usize,
}

impl CircuitStats {
    /// Number of nodes of a given kind.
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes[kind.index()]
    }

    /// Number of gate nodes (NOT, AND, OR and XOR).
    pub fn gates(&self) -> usize {
        self.count(NodeKind::Not)
            + self.count(NodeKind::And)
            + self.count(NodeKind::Or)
            + self.count(NodeKind::Xor)
    }
}

impl fmt::Display for CircuitStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} gates", self.gates())?;
        for &kind in NodeKind::ALL.iter() {
            write!(f, ", {} {}", self.count(kind), kind)?;
        }
        write!(f, ", {} folded, {} shared", self.folded, self.shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "circuit node limit")]
    fn node_limit() {
        let last = Bit::max_bit().index();
        check_capacity(last);
        check_capacity(last + 1);
    }

    #[test]
    fn folding_allocates_nothing() {
        let mut circuit = Circuit::new();
        let a = circuit.new_input();
        let before = circuit.len();

        assert_eq!(circuit.and_gate(a, Bit::FALSE), Bit::FALSE);
        assert_eq!(circuit.and_gate(Bit::TRUE, a), a);
        assert_eq!(circuit.or_gate(a, Bit::TRUE), Bit::TRUE);
        assert_eq!(circuit.or_gate(Bit::FALSE, a), a);
        assert_eq!(circuit.xor_gate(a, a), Bit::FALSE);
        assert_eq!(circuit.xor_gate(a, Bit::FALSE), a);
        assert_eq!(circuit.and_gate(a, a), a);

        assert_eq!(circuit.len(), before);
        assert_eq!(circuit.stats().folded, 7);
    }

    #[test]
    fn double_negation() {
        let mut circuit = Circuit::new();
        let a = circuit.new_input();

        let not_a = circuit.not_gate(a);
        let len = circuit.len();
        assert_eq!(circuit.not_gate(not_a), a);
        assert_eq!(circuit.len(), len);

        assert_eq!(circuit.xor_gate(a, Bit::TRUE), not_a);
        assert_eq!(circuit.and_gate(a, not_a), Bit::FALSE);
        assert_eq!(circuit.or_gate(not_a, a), Bit::TRUE);
        assert_eq!(circuit.xor_gate(not_a, a), Bit::TRUE);
        assert_eq!(circuit.len(), len);
    }

    #[test]
    fn structural_sharing() {
        let mut circuit = Circuit::new();
        let a = circuit.new_input();
        let b = circuit.new_input();

        let first = circuit.and_gate(a, b);
        let second = circuit.and_gate(b, a);
        assert_eq!(first, second);

        let x = circuit.xor_gate(a, b);
        assert_ne!(x, first);
        assert_eq!(circuit.xor_gate(b, a), x);

        let stats = circuit.stats();
        assert_eq!(stats.count(NodeKind::And), 1);
        assert_eq!(stats.count(NodeKind::Xor), 1);
        assert_eq!(stats.count(NodeKind::Input), 2);
        assert_eq!(stats.shared, 2);
    }

    #[test]
    fn operands_precede_gates() {
        let mut circuit = Circuit::new();
        let a = circuit.new_input();
        let b = circuit.new_input();
        let c = circuit.new_input();
        let ab = circuit.or_gate(a, b);
        let out = circuit.xor_gate(ab, c);

        for index in 0..circuit.len() {
            let bit = Bit::from_index(index);
            for operand in circuit.node(bit).operands() {
                assert!(operand < bit);
            }
        }
        assert_eq!(circuit.node(out), Node::Xor(c, ab));
    }

    #[test]
    fn evaluate_gates() {
        let mut circuit = Circuit::new();
        let a = circuit.new_input();
        let b = circuit.new_input();
        let and = circuit.and_gate(a, b);
        let or = circuit.or_gate(a, b);
        let xor = circuit.xor_gate(a, b);
        let not = circuit.not_gate(a);

        let outputs = [and, or, xor, not, Bit::TRUE, Bit::FALSE];

        for &(va, vb) in [(false, false), (false, true), (true, false), (true, true)].iter() {
            let values = circuit.evaluate(&outputs, &[va, vb]).unwrap();
            assert_eq!(values, vec![va & vb, va | vb, va ^ vb, !va, true, false]);
        }
    }

    #[test]
    fn evaluate_checks_assignment_length() {
        let mut circuit = Circuit::new();
        let a = circuit.new_input();

        assert_eq!(
            circuit.evaluate(&[a], &[]),
            Err(CircuitError::AssignmentLength {
                expected: 1,
                found: 0
            })
        );
        assert_eq!(
            circuit.evaluate(&[Bit::from_index(99)], &[true]),
            Err(CircuitError::UnknownBit { bit: 99 })
        );
    }
}
