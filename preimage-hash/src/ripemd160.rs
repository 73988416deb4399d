//! Symbolic RIPEMD-160.
use std::ops::RangeInclusive;

use log::debug;

use preimage_circuit::{Circuit, SymBitVec};

use crate::words::{self, Endian, BLOCK_BITS};
use crate::{HashError, HashFamily, SymHash};

pub const IV: [u32; 5] = [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476, 0xc3d2e1f0];

pub const STEPS: usize = 80;

/// Additive constants of the left line, one per round of 16 steps.
pub const K_LEFT: [u32; 5] = [0x00000000, 0x5a827999, 0x6ed9eba1, 0x8f1bbcdc, 0xa953fd4e];
pub const K_RIGHT: [u32; 5] = [0x50a28be6, 0x5c4dd124, 0x6d703ef3, 0x7a6d76e9, 0x00000000];

/// Message word selected by each step of the left line.
pub const R_LEFT: [usize; 80] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, //
    7, 4, 13, 1, 10, 6, 15, 3, 12, 0, 9, 5, 2, 14, 11, 8, //
    3, 10, 14, 4, 9, 15, 8, 1, 2, 7, 0, 6, 13, 11, 5, 12, //
    1, 9, 11, 10, 0, 8, 12, 4, 13, 3, 7, 15, 14, 5, 6, 2, //
    4, 0, 5, 9, 7, 12, 2, 10, 14, 1, 3, 8, 11, 6, 15, 13,
];

/// Message word selected by each step of the right line.
pub const R_RIGHT: [usize; 80] = [
    5, 14, 7, 0, 9, 2, 11, 4, 13, 6, 15, 8, 1, 10, 3, 12, //
    6, 11, 3, 7, 0, 13, 5, 10, 14, 15, 8, 12, 4, 9, 1, 2, //
    15, 5, 1, 3, 7, 14, 6, 9, 11, 8, 12, 2, 10, 0, 4, 13, //
    8, 6, 4, 1, 3, 11, 15, 0, 5, 12, 2, 13, 9, 7, 10, 14, //
    12, 15, 10, 4, 1, 5, 8, 7, 6, 2, 13, 14, 0, 3, 9, 11,
];

/// Rotation amounts of the left line.
pub const S_LEFT: [usize; 80] = [
    11, 14, 15, 12, 5, 8, 7, 9, 11, 13, 14, 15, 6, 7, 9, 8, //
    7, 6, 8, 13, 11, 9, 7, 15, 7, 12, 15, 9, 11, 7, 13, 12, //
    11, 13, 6, 7, 14, 9, 13, 15, 14, 8, 13, 6, 5, 12, 7, 5, //
    11, 12, 14, 15, 14, 15, 9, 8, 9, 14, 5, 6, 8, 6, 5, 12, //
    9, 15, 5, 11, 6, 8, 13, 12, 5, 12, 13, 14, 11, 8, 5, 6,
];

/// Rotation amounts of the right line.
pub const S_RIGHT: [usize; 80] = [
    8, 9, 9, 11, 13, 15, 15, 5, 7, 7, 8, 11, 14, 14, 12, 6, //
    9, 13, 15, 7, 12, 8, 9, 11, 7, 7, 12, 7, 6, 15, 13, 11, //
    9, 7, 15, 11, 8, 6, 6, 14, 12, 13, 5, 14, 13, 13, 7, 5, //
    15, 5, 8, 11, 14, 14, 6, 14, 6, 9, 12, 9, 12, 5, 15, 8, //
    8, 5, 12, 9, 12, 5, 14, 6, 8, 13, 6, 5, 15, 13, 11, 11,
];

/// RIPEMD-160 with both lines truncated to `difficulty` steps.
#[derive(Copy, Clone, Default, Debug)]
pub struct Ripemd160;

impl SymHash for Ripemd160 {
    fn family(&self) -> HashFamily {
        HashFamily::Ripemd160
    }

    fn output_width(&self, _input_bits: usize) -> usize {
        160
    }

    fn difficulty_range(&self) -> RangeInclusive<usize> {
        1..=STEPS
    }

    fn hash(
        &self,
        circuit: &mut Circuit,
        input: &SymBitVec,
        difficulty: usize,
    ) -> Result<SymBitVec, HashError> {
        self.check_difficulty(difficulty)?;
        words::check_aligned(self.family(), input)?;

        let padded = words::md_padding(input, Endian::Little);
        debug!(
            "ripemd160: {} blocks, {} steps per line",
            padded.width() / BLOCK_BITS,
            difficulty
        );

        let mut state = words::constant_words(&IV);
        for block in padded.chunks(BLOCK_BITS) {
            state = compress(circuit, &state, &block, difficulty)?;
        }

        Ok(words::digest(&state, Endian::Little))
    }
}

/// The nonlinear function of one of the five rounds.
fn round_function(
    circuit: &mut Circuit,
    round: usize,
    x: &SymBitVec,
    y: &SymBitVec,
    z: &SymBitVec,
) -> Result<SymBitVec, HashError> {
    Ok(match round {
        0 => circuit.xor_many(&[x, y, z])?,
        1 => {
            let xy = circuit.and(x, y)?;
            let not_x = circuit.not(x);
            let xz = circuit.and(&not_x, z)?;
            circuit.or(&xy, &xz)?
        }
        2 => {
            let not_y = circuit.not(y);
            let x_or = circuit.or(x, &not_y)?;
            circuit.xor(&x_or, z)?
        }
        3 => {
            let xz = circuit.and(x, z)?;
            let not_z = circuit.not(z);
            let yz = circuit.and(y, &not_z)?;
            circuit.or(&xz, &yz)?
        }
        _ => {
            let not_z = circuit.not(z);
            let y_or = circuit.or(y, &not_z)?;
            circuit.xor(x, &y_or)?
        }
    })
}

/// Working registers of one line.
#[derive(Clone)]
struct Line {
    a: SymBitVec,
    b: SymBitVec,
    c: SymBitVec,
    d: SymBitVec,
    e: SymBitVec,
}

impl Line {
    fn new(state: &[SymBitVec]) -> Line {
        Line {
            a: state[0].clone(),
            b: state[1].clone(),
            c: state[2].clone(),
            d: state[3].clone(),
            e: state[4].clone(),
        }
    }

    fn step(
        &mut self,
        circuit: &mut Circuit,
        round: usize,
        word: &SymBitVec,
        constant: u32,
        shift: usize,
    ) -> Result<(), HashError> {
        let f = round_function(circuit, round, &self.b, &self.c, &self.d)?;
        let sum = circuit.add_many(&[&self.a, &f, word, &SymBitVec::from_u32(constant)])?;
        let t = circuit.add(&sum.rotl(shift)?, &self.e)?;

        self.a = std::mem::replace(&mut self.e, self.d.clone());
        self.d = self.c.rotl(10)?;
        self.c = std::mem::replace(&mut self.b, t);
        Ok(())
    }
}

fn compress(
    circuit: &mut Circuit,
    state: &[SymBitVec],
    block: &SymBitVec,
    steps: usize,
) -> Result<Vec<SymBitVec>, HashError> {
    let x = words::block_words(block, Endian::Little);

    let mut left = Line::new(state);
    let mut right = Line::new(state);

    for j in 0..steps {
        let round = j / 16;
        left.step(circuit, round, &x[R_LEFT[j]], K_LEFT[round], S_LEFT[j])?;
        right.step(circuit, 4 - round, &x[R_RIGHT[j]], K_RIGHT[round], S_RIGHT[j])?;
    }

    Ok(vec![
        circuit.add_many(&[&state[1], &left.c, &right.d])?,
        circuit.add_many(&[&state[2], &left.d, &right.e])?,
        circuit.add_many(&[&state[3], &left.e, &right.a])?,
        circuit.add_many(&[&state[4], &left.a, &right.b])?,
        circuit.add_many(&[&state[0], &left.b, &right.c])?,
    ])
}
