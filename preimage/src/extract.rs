//! Preimage extraction from solver models.
use std::fmt;

use varisat::Lit;

use preimage_circuit::bitvec::{bits_to_bytes, bytes_to_bits};
use preimage_cnf::CnfInstance;

/// A concrete hash input recovered from a model.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Preimage {
    bits: Vec<bool>,
}

impl Preimage {
    /// Reads the input variables of `instance` under `model`.
    pub fn extract(instance: &CnfInstance, model: &[Lit]) -> Preimage {
        Preimage {
            bits: instance.input_values(model),
        }
    }

    pub fn from_bits(bits: Vec<bool>) -> Preimage {
        Preimage { bits }
    }

    /// Input bits, least significant first.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// The input bytes. Unused high bits of the last byte are zero.
    pub fn bytes(&self) -> Vec<u8> {
        bits_to_bytes(&self.bits)
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.bytes())
    }
}

impl fmt::Display for Preimage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Lower case hex string of some bytes.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// Lower case hex string of bit values in the vector byte layout.
pub fn bits_to_hex(bits: &[bool]) -> String {
    to_hex(&bits_to_bytes(bits))
}

/// Parses a hex string into bytes, ignoring an optional `0x` prefix.
pub fn parse_hex(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Parses a hex string into `width` bits.
///
/// The string must have exactly the bytes needed for `width` bits and unused high bits must be
/// zero.
pub fn parse_hex_bits(hex: &str, width: usize) -> Option<Vec<bool>> {
    let bytes = parse_hex(hex)?;
    if bytes.len() != (width + 7) / 8 {
        return None;
    }
    let bits = bytes_to_bits(&bytes, width);
    if bits_to_bytes(&bits) != bytes {
        return None;
    }
    Some(bits)
}
