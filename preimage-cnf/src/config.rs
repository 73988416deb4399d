//! Encoder configuration.
use serde::Deserialize;

use preimage_macros::{DocDefault, DocHelp};

/// How gates are lowered into clauses.
///
/// Every combination produces an equisatisfiable formula with the same models on the circuit
/// variables. Only the number of clauses and auxiliary variables differs.
#[derive(DocDefault, DocHelp, Copy, Clone, PartialEq, Eq, Debug)]
pub struct EncoderConfig {
    /// Encode XOR gates with the four clause XOR pattern instead of rewriting them into OR, AND
    /// and NOT gates. (Default: true)
    pub native_xor: bool,

    /// Encode OR gates with their three defining clauses instead of rewriting them as a negated
    /// AND of negations. (Default: true)
    pub native_or: bool,
}

impl EncoderConfig {
    /// Applies a partial update.
    pub fn update(&mut self, update: &EncoderConfigUpdate) {
        if let Some(native_xor) = update.native_xor {
            self.native_xor = native_xor;
        }
        if let Some(native_or) = update.native_or {
            self.native_or = native_or;
        }
    }
}

/// A partial [`EncoderConfig`], as read from configuration files or options.
#[derive(Deserialize, Default, Clone, PartialEq, Eq, Debug)]
#[serde(deny_unknown_fields)]
pub struct EncoderConfigUpdate {
    pub native_xor: Option<bool>,
    pub native_or: Option<bool>,
}

impl EncoderConfigUpdate {
    /// An update that changes nothing.
    pub fn new() -> EncoderConfigUpdate {
        EncoderConfigUpdate::default()
    }

    /// Merges another update into this one, the values of `other` taking precedence.
    pub fn merge(&mut self, other: EncoderConfigUpdate) {
        self.native_xor = other.native_xor.or(self.native_xor);
        self.native_or = other.native_or.or(self.native_or);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let config = EncoderConfig::default();
        assert!(config.native_xor);
        assert!(config.native_or);

        let help = EncoderConfig::help();
        assert!(help.contains("native_xor = true"));
        assert!(help.contains("native_or = true"));
        assert!(!help.contains("(Default"));
    }

    #[test]
    fn updates() {
        let mut update = EncoderConfigUpdate::new();
        update.merge(toml::from_str("native_xor = false").unwrap());
        update.merge(toml::from_str("native_or = false").unwrap());
        update.merge(toml::from_str("native_xor = true").unwrap());

        let mut config = EncoderConfig::default();
        config.update(&update);
        assert_eq!(
            config,
            EncoderConfig {
                native_xor: true,
                native_or: false,
            }
        );

        assert!(toml::from_str::<EncoderConfigUpdate>("native_and = true").is_err());
    }
}
