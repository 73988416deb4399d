//! Circuit bits and the nodes they name.
use std::fmt;

use smallvec::SmallVec;

/// The backing type used to represent bit identities.
pub type BitIdx = u32;

/// A node of a [`Circuit`](crate::circuit::Circuit), identified by its position in the arena.
///
/// Identities are 0-based and assigned in creation order. Every operand of a gate has a smaller
/// identity than the gate itself, so the circuit is acyclic by construction.
///
/// The identities 0 and 1 are reserved for the constants `false` and `true` in every circuit.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Bit {
    index: BitIdx,
}

impl Bit {
    /// The constant `false`.
    pub const FALSE: Bit = Bit { index: 0 };
    /// The constant `true`.
    pub const TRUE: Bit = Bit { index: 1 };

    /// Creates a bit from a 0-based index.
    ///
    /// The index may not represent a bit past `Bit::max_bit()`.
    #[inline]
    pub fn from_index(index: usize) -> Bit {
        debug_assert!(index <= Bit::max_bit().index());
        Bit {
            index: index as BitIdx,
        }
    }

    /// The constant bit with the given value.
    #[inline]
    pub fn constant(value: bool) -> Bit {
        if value {
            Bit::TRUE
        } else {
            Bit::FALSE
        }
    }

    /// The 0-based index of this bit.
    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// The bit with largest index that is supported.
    pub const fn max_bit() -> Bit {
        Bit {
            index: BitIdx::max_value() >> 4,
        }
    }

    /// Whether this is one of the two constant bits.
    #[inline]
    pub fn is_constant(self) -> bool {
        self.index < 2
    }

    /// The value of a constant bit, `None` for inputs and gates.
    #[inline]
    pub fn const_value(self) -> Option<bool> {
        match self.index {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }
}

impl fmt::Debug for Bit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.const_value() {
            Some(value) => write!(f, "{}", value as u8),
            None => write!(f, "b{}", self.index),
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The operation recorded for a bit.
///
/// Operands of commutative gates are stored in ascending order, which makes structurally equal
/// gates compare equal.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Node {
    Const(bool),
    /// The n-th free input of the circuit.
    Input(usize),
    Not(Bit),
    And(Bit, Bit),
    Or(Bit, Bit),
    Xor(Bit, Bit),
}

impl Node {
    /// The kind of this node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Const(_) => NodeKind::Const,
            Node::Input(_) => NodeKind::Input,
            Node::Not(_) => NodeKind::Not,
            Node::And(..) => NodeKind::And,
            Node::Or(..) => NodeKind::Or,
            Node::Xor(..) => NodeKind::Xor,
        }
    }

    /// Operands of a gate, empty for constants and inputs.
    pub fn operands(&self) -> SmallVec<[Bit; 2]> {
        let mut operands = SmallVec::new();
        match *self {
            Node::Const(_) | Node::Input(_) => (),
            Node::Not(a) => operands.push(a),
            Node::And(a, b) | Node::Or(a, b) | Node::Xor(a, b) => {
                operands.push(a);
                operands.push(b);
            }
        }
        operands
    }

    /// Evaluates a gate given the values of its operands.
    ///
    /// Returns `None` for inputs.
    #[inline]
    pub fn eval(&self, value: impl Fn(Bit) -> bool) -> Option<bool> {
        match *self {
            Node::Const(constant) => Some(constant),
            Node::Input(_) => None,
            Node::Not(a) => Some(!value(a)),
            Node::And(a, b) => Some(value(a) & value(b)),
            Node::Or(a, b) => Some(value(a) | value(b)),
            Node::Xor(a, b) => Some(value(a) ^ value(b)),
        }
    }
}

/// Kinds of circuit nodes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum NodeKind {
    Const,
    Input,
    Not,
    And,
    Or,
    Xor,
}

impl NodeKind {
    /// All node kinds, in the order used by [`NodeKind::index`].
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Const,
        NodeKind::Input,
        NodeKind::Not,
        NodeKind::And,
        NodeKind::Or,
        NodeKind::Xor,
    ];

    /// Position of this kind in [`NodeKind::ALL`], used to index per-kind counters.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower case name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Const => "const",
            NodeKind::Input => "input",
            NodeKind::Not => "not",
            NodeKind::And => "and",
            NodeKind::Or => "or",
            NodeKind::Xor => "xor",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_reserved() {
        assert_eq!(Bit::constant(false), Bit::FALSE);
        assert_eq!(Bit::constant(true), Bit::TRUE);
        assert_eq!(Bit::FALSE.const_value(), Some(false));
        assert_eq!(Bit::TRUE.const_value(), Some(true));
        assert_eq!(Bit::from_index(2).const_value(), None);
        assert!(!Bit::from_index(7).is_constant());
    }

    #[test]
    fn node_operands() {
        let a = Bit::from_index(2);
        let b = Bit::from_index(3);

        assert!(Node::Input(0).operands().is_empty());
        assert_eq!(&Node::Not(a).operands()[..], &[a]);
        assert_eq!(&Node::Xor(a, b).operands()[..], &[a, b]);
    }

    #[test]
    fn kind_indices_match_table() {
        for (index, kind) in NodeKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), index);
        }
    }
}
