//! Vector operators that record gates in a circuit.
use crate::bit::Bit;
use crate::bitvec::SymBitVec;
use crate::circuit::Circuit;
use crate::CircuitError;

impl Circuit {
    /// A vector of fresh unconstrained input bits.
    pub fn input_vec(&mut self, width: usize) -> SymBitVec {
        SymBitVec::from_bits((0..width).map(|_| self.new_input()).collect())
    }

    /// Elementwise negation.
    pub fn not(&mut self, a: &SymBitVec) -> SymBitVec {
        SymBitVec::from_bits(a.bits().iter().map(|&bit| self.not_gate(bit)).collect())
    }

    /// Elementwise conjunction.
    pub fn and(&mut self, a: &SymBitVec, b: &SymBitVec) -> Result<SymBitVec, CircuitError> {
        self.elementwise(a, b, Circuit::and_gate)
    }

    /// Elementwise disjunction.
    pub fn or(&mut self, a: &SymBitVec, b: &SymBitVec) -> Result<SymBitVec, CircuitError> {
        self.elementwise(a, b, Circuit::or_gate)
    }

    /// Elementwise exclusive or.
    pub fn xor(&mut self, a: &SymBitVec, b: &SymBitVec) -> Result<SymBitVec, CircuitError> {
        self.elementwise(a, b, Circuit::xor_gate)
    }

    /// Exclusive or of several vectors of equal width.
    pub fn xor_many(&mut self, parts: &[&SymBitVec]) -> Result<SymBitVec, CircuitError> {
        self.reduce(parts, Circuit::xor)
    }

    /// Unsigned addition modulo `2^width`, as a ripple carry network.
    pub fn add(&mut self, a: &SymBitVec, b: &SymBitVec) -> Result<SymBitVec, CircuitError> {
        if a.width() != b.width() {
            return Err(CircuitError::WidthMismatch {
                left: a.width(),
                right: b.width(),
            });
        }

        let width = a.width();
        let mut sum = Vec::with_capacity(width);
        let mut carry = Bit::FALSE;

        for (i, (&x, &y)) in a.bits().iter().zip(b.bits().iter()).enumerate() {
            let half = self.xor_gate(x, y);
            sum.push(self.xor_gate(half, carry));

            // The carry out of the most significant bit is discarded.
            if i + 1 < width {
                let generate = self.and_gate(x, y);
                let propagate = self.and_gate(carry, half);
                carry = self.or_gate(generate, propagate);
            }
        }

        Ok(SymBitVec::from_bits(sum))
    }

    /// Sum of several vectors of equal width, modulo `2^width`.
    pub fn add_many(&mut self, parts: &[&SymBitVec]) -> Result<SymBitVec, CircuitError> {
        self.reduce(parts, Circuit::add)
    }

    fn reduce(
        &mut self,
        parts: &[&SymBitVec],
        mut op: impl FnMut(&mut Circuit, &SymBitVec, &SymBitVec) -> Result<SymBitVec, CircuitError>,
    ) -> Result<SymBitVec, CircuitError> {
        let (first, rest) = match parts.split_first() {
            Some(split) => split,
            None => return Ok(SymBitVec::default()),
        };
        let mut acc = (*first).clone();
        for part in rest.iter() {
            acc = op(self, &acc, part)?;
        }
        Ok(acc)
    }

    /// Applies a gate elementwise, broadcasting a single bit operand.
    fn elementwise(
        &mut self,
        a: &SymBitVec,
        b: &SymBitVec,
        gate: impl Fn(&mut Circuit, Bit, Bit) -> Bit,
    ) -> Result<SymBitVec, CircuitError> {
        let bits = if a.width() == b.width() {
            a.bits()
                .iter()
                .zip(b.bits().iter())
                .map(|(&x, &y)| gate(self, x, y))
                .collect()
        } else if b.width() == 1 {
            let y = b.bit(0);
            a.bits().iter().map(|&x| gate(self, x, y)).collect()
        } else if a.width() == 1 {
            let x = a.bit(0);
            b.bits().iter().map(|&y| gate(self, x, y)).collect()
        } else {
            return Err(CircuitError::WidthMismatch {
                left: a.width(),
                right: b.width(),
            });
        };
        Ok(SymBitVec::from_bits(bits))
    }
}
