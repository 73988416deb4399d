//! Hashes computed on machine words, truncated the same way as the circuits.
use preimage_circuit::bitvec::{bits_to_bytes, bytes_to_bits};
use preimage_hash::synthetic::MAX_ROUNDS;
use preimage_hash::{md5, ripemd160, sha256, HashError, HashFamily, SymHash};

use super::ReferenceHash;

/// Evaluates every family directly on `u32` words and bit vectors.
///
/// Shares only the constant tables with the circuit builders. At full difficulty the cryptographic
/// hashes agree with the RustCrypto implementations.
#[derive(Copy, Clone, Default, Debug)]
pub struct NativeReference;

impl ReferenceHash for NativeReference {
    fn digest(
        &self,
        family: HashFamily,
        input: &[bool],
        difficulty: usize,
    ) -> Result<Vec<bool>, HashError> {
        family.check_difficulty(difficulty)?;
        if family.is_cryptographic() && input.len() % 8 != 0 {
            return Err(HashError::UnalignedInput {
                family,
                bits: input.len(),
            });
        }
        let pseudo = family == HashFamily::LossyPseudo || family == HashFamily::NonLossyPseudo;
        if pseudo && input.is_empty() {
            return Err(HashError::EmptyInput { family });
        }

        let message = bits_to_bytes(input);
        Ok(match family {
            HashFamily::Sha256 => bytes_to_bits(&sha256_digest(&message, difficulty), 256),
            HashFamily::Md5 => bytes_to_bits(&md5_digest(&message, difficulty), 128),
            HashFamily::Ripemd160 => bytes_to_bits(&ripemd160_digest(&message, difficulty), 160),
            HashFamily::Identity => input.to_vec(),
            HashFamily::Complement => input.iter().map(|&bit| !bit).collect(),
            HashFamily::LossyPseudo => lossy_pseudo(input, difficulty),
            HashFamily::NonLossyPseudo => non_lossy_pseudo(input, difficulty),
        })
    }
}

/// Merkle-Damgård strengthening: `0x80`, zeros and the bit length as a 64-bit integer.
fn pad(message: &[u8], big_endian: bool) -> Vec<u8> {
    let bit_len = (message.len() as u64) * 8;
    let mut padded = message.to_vec();
    padded.push(0x80);
    while padded.len() % 64 != 56 {
        padded.push(0);
    }
    if big_endian {
        padded.extend_from_slice(&bit_len.to_be_bytes());
    } else {
        padded.extend_from_slice(&bit_len.to_le_bytes());
    }
    padded
}

fn words_be(block: &[u8]) -> Vec<u32> {
    block
        .chunks(4)
        .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
        .collect()
}

fn words_le(block: &[u8]) -> Vec<u32> {
    block
        .chunks(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect()
}

fn sha256_digest(message: &[u8], rounds: usize) -> Vec<u8> {
    let mut state = sha256::IV;

    for block in pad(message, true).chunks(64) {
        let mut w = words_be(block);
        for t in 16..64 {
            let s0 = w[t - 15].rotate_right(7) ^ w[t - 15].rotate_right(18) ^ (w[t - 15] >> 3);
            let s1 = w[t - 2].rotate_right(17) ^ w[t - 2].rotate_right(19) ^ (w[t - 2] >> 10);
            let next = w[t - 16]
                .wrapping_add(s0)
                .wrapping_add(w[t - 7])
                .wrapping_add(s1);
            w.push(next);
        }

        let mut a = state[0];
        let mut b = state[1];
        let mut c = state[2];
        let mut d = state[3];
        let mut e = state[4];
        let mut f = state[5];
        let mut g = state[6];
        let mut h = state[7];

        for t in 0..rounds {
            let s1 = e.rotate_right(6) ^ e.rotate_right(11) ^ e.rotate_right(25);
            let ch = (e & f) ^ (!e & g);
            let temp1 = h
                .wrapping_add(s1)
                .wrapping_add(ch)
                .wrapping_add(sha256::K[t])
                .wrapping_add(w[t]);
            let s0 = a.rotate_right(2) ^ a.rotate_right(13) ^ a.rotate_right(22);
            let maj = (a & b) ^ (a & c) ^ (b & c);
            let temp2 = s0.wrapping_add(maj);

            h = g;
            g = f;
            f = e;
            e = d.wrapping_add(temp1);
            d = c;
            c = b;
            b = a;
            a = temp1.wrapping_add(temp2);
        }

        for (word, value) in state.iter_mut().zip([a, b, c, d, e, f, g, h].iter()) {
            *word = word.wrapping_add(*value);
        }
    }

    state.iter().flat_map(|word| word.to_be_bytes().to_vec()).collect()
}

fn md5_digest(message: &[u8], steps: usize) -> Vec<u8> {
    let mut state = md5::IV;

    for block in pad(message, false).chunks(64) {
        let m = words_le(block);
        let [mut a, mut b, mut c, mut d] = state;

        for step in 0..steps {
            let (f, g) = match step / 16 {
                0 => ((b & c) | (!b & d), step),
                1 => ((d & b) | (!d & c), (5 * step + 1) % 16),
                2 => (b ^ c ^ d, (3 * step + 5) % 16),
                _ => (c ^ (b | !d), (7 * step) % 16),
            };
            let shift = md5::SHIFTS[step / 16][step % 4] as u32;
            let rotated = a
                .wrapping_add(f)
                .wrapping_add(md5::K[step])
                .wrapping_add(m[g])
                .rotate_left(shift);

            a = d;
            d = c;
            c = b;
            b = b.wrapping_add(rotated);
        }

        state[0] = state[0].wrapping_add(a);
        state[1] = state[1].wrapping_add(b);
        state[2] = state[2].wrapping_add(c);
        state[3] = state[3].wrapping_add(d);
    }

    state.iter().flat_map(|word| word.to_le_bytes().to_vec()).collect()
}

fn ripemd_f(round: usize, x: u32, y: u32, z: u32) -> u32 {
    match round {
        0 => x ^ y ^ z,
        1 => (x & y) | (!x & z),
        2 => (x | !y) ^ z,
        3 => (x & z) | (y & !z),
        _ => x ^ (y | !z),
    }
}

/// One step of a RIPEMD-160 line on the registers `[a, b, c, d, e]`.
fn ripemd_step(line: &mut [u32; 5], round: usize, word: u32, constant: u32, shift: usize) {
    let [a, b, c, d, e] = *line;
    let t = a
        .wrapping_add(ripemd_f(round, b, c, d))
        .wrapping_add(word)
        .wrapping_add(constant)
        .rotate_left(shift as u32)
        .wrapping_add(e);
    *line = [e, t, b, c.rotate_left(10), d];
}

fn ripemd160_digest(message: &[u8], steps: usize) -> Vec<u8> {
    let mut state = ripemd160::IV;

    for block in pad(message, false).chunks(64) {
        let x = words_le(block);
        let mut left = state;
        let mut right = state;

        for j in 0..steps {
            let round = j / 16;
            ripemd_step(
                &mut left,
                round,
                x[ripemd160::R_LEFT[j]],
                ripemd160::K_LEFT[round],
                ripemd160::S_LEFT[j],
            );
            ripemd_step(
                &mut right,
                4 - round,
                x[ripemd160::R_RIGHT[j]],
                ripemd160::K_RIGHT[round],
                ripemd160::S_RIGHT[j],
            );
        }

        state = [
            state[1].wrapping_add(left[2]).wrapping_add(right[3]),
            state[2].wrapping_add(left[3]).wrapping_add(right[4]),
            state[3].wrapping_add(left[4]).wrapping_add(right[0]),
            state[4].wrapping_add(left[0]).wrapping_add(right[1]),
            state[0].wrapping_add(left[1]).wrapping_add(right[2]),
        ];
    }

    state.iter().flat_map(|word| word.to_le_bytes().to_vec()).collect()
}

/// Bit `j` of the round constant for `round`, taken from the SHA-256 round constants.
fn round_constant(round: usize, width: usize) -> Vec<bool> {
    (0..width)
        .map(|j| {
            let word = sha256::K[(round + j / 32) % MAX_ROUNDS];
            (word >> (j % 32)) & 1 == 1
        })
        .collect()
}

/// Sum modulo `2^n` of two `n` bit vectors, least significant bit first.
fn add(a: &[bool], b: &[bool]) -> Vec<bool> {
    let mut carry = false;
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let sum = x ^ y ^ carry;
            carry = (x && y) || (carry && (x ^ y));
            sum
        })
        .collect()
}

fn xor(a: &[bool], b: &[bool]) -> Vec<bool> {
    a.iter().zip(b.iter()).map(|(&x, &y)| x ^ y).collect()
}

/// Rotation towards the most significant bit.
fn rotl(x: &[bool], amount: usize) -> Vec<bool> {
    let n = x.len();
    (0..n).map(|i| x[(i + n - amount) % n]).collect()
}

fn shl(x: &[bool], amount: usize) -> Vec<bool> {
    (0..x.len()).map(|i| i >= amount && x[i - amount]).collect()
}

fn shr(x: &[bool], amount: usize) -> Vec<bool> {
    (0..x.len())
        .map(|i| i + amount < x.len() && x[i + amount])
        .collect()
}

fn lossy_pseudo(input: &[bool], rounds: usize) -> Vec<bool> {
    let h = (input.len() + 1) / 2;
    let mut right = input[h..].to_vec();
    right.resize(h, false);

    let mut state = input[..h].to_vec();
    for round in 0..rounds {
        let masked: Vec<bool> = state.iter().zip(right.iter()).map(|(&s, &r)| s && r).collect();
        let mixed = xor(&rotl(&state, 1 % h), &masked);
        state = add(&mixed, &round_constant(round, h));
    }

    xor(&state, &right)
}

fn non_lossy_pseudo(input: &[bool], rounds: usize) -> Vec<bool> {
    let n = input.len();
    let mut x = input.to_vec();
    for round in 0..rounds {
        if n > 1 {
            x = xor(&x, &shl(&x, 1));
        }
        x = add(&x, &round_constant(round, n));
        if n > 1 {
            x = xor(&x, &shr(&x, (n / 2).max(1)));
        }
        x = rotl(&x, 3 % n);
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use ::md5::Md5;
    use ripemd::Ripemd160;
    use sha2::{Digest, Sha256};

    fn bits(value: u64, width: usize) -> Vec<bool> {
        (0..width).map(|i| (value >> i) & 1 == 1).collect()
    }

    fn value(bits: &[bool]) -> u64 {
        bits.iter()
            .enumerate()
            .map(|(i, &bit)| (bit as u64) << i)
            .sum()
    }

    #[test]
    fn full_rounds_match_rustcrypto() {
        for &len in [0usize, 3, 55, 56, 64, 119].iter() {
            let message: Vec<u8> = (0..len).map(|i| (i * 37 + 11) as u8).collect();
            assert_eq!(
                sha256_digest(&message, sha256::ROUNDS),
                Sha256::digest(&message).to_vec(),
                "sha256 of {} bytes",
                len
            );
            assert_eq!(
                md5_digest(&message, preimage_hash::md5::STEPS),
                Md5::digest(&message).to_vec(),
                "md5 of {} bytes",
                len
            );
            assert_eq!(
                ripemd160_digest(&message, ripemd160::STEPS),
                Ripemd160::digest(&message).to_vec(),
                "ripemd160 of {} bytes",
                len
            );
        }
    }

    #[test]
    fn word_arithmetic() {
        assert_eq!(value(&add(&bits(0b1011, 4), &bits(0b0110, 4))), 0b0001);
        assert_eq!(value(&rotl(&bits(0b1001, 4), 1)), 0b0011);
        assert_eq!(value(&shl(&bits(0b1001, 4), 1)), 0b0010);
        assert_eq!(value(&shr(&bits(0b1001, 4), 1)), 0b0100);
        assert_eq!(value(&round_constant(0, 32)), u64::from(sha256::K[0]));
        assert_eq!(value(&round_constant(63, 40)) >> 32, u64::from(sha256::K[0] & 0xff));
    }

    #[test]
    fn synthetic_families() {
        let input = bits(0b1_0110_1001, 9);
        let native = |family, difficulty| NativeReference.digest(family, &input, difficulty);

        assert_eq!(native(HashFamily::Identity, 0).unwrap(), input);
        assert_eq!(value(&native(HashFamily::Complement, 5).unwrap()), 0b0_1001_0110);
        assert_eq!(native(HashFamily::NonLossyPseudo, 0).unwrap(), input);
        // Zero rounds leave `low ^ high` of the two halves.
        assert_eq!(value(&native(HashFamily::LossyPseudo, 0).unwrap()), 0b01001 ^ 0b01011);

        let outputs: HashSet<u64> = (0..1 << 6)
            .map(|v| {
                let digest = NativeReference.digest(HashFamily::NonLossyPseudo, &bits(v, 6), 7);
                value(&digest.unwrap())
            })
            .collect();
        assert_eq!(outputs.len(), 1 << 6);
    }

    #[test]
    fn malformed_requests() {
        assert_eq!(
            NativeReference.digest(HashFamily::Md5, &[true; 7], 4),
            Err(HashError::UnalignedInput {
                family: HashFamily::Md5,
                bits: 7
            })
        );
        assert_eq!(
            NativeReference.digest(HashFamily::NonLossyPseudo, &[], 4),
            Err(HashError::EmptyInput {
                family: HashFamily::NonLossyPseudo
            })
        );
        assert!(NativeReference.digest(HashFamily::Ripemd160, &[], 81).is_err());
        assert_eq!(NativeReference.digest(HashFamily::Complement, &[], 3), Ok(vec![]));
    }
}
