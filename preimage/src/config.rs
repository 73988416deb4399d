//! Session configuration.
use std::time::Duration;

use serde::Deserialize;

use preimage_cnf::{EncoderConfig, EncoderConfigUpdate};
use preimage_macros::{DocDefault, DocHelp};

/// Configurable parameters of the solver adapter.
#[derive(DocDefault, DocHelp, Clone, PartialEq, Eq, Debug)]
pub struct SolveConfig {
    /// Time limit for a single solver run in milliseconds, 0 for no limit. (Default: 0)
    pub timeout_ms: u64,

    /// External solver executable reading a DIMACS CNF file. The built-in Varisat solver is used
    /// when empty. (Default: String::new())
    pub solver: String,

    /// Arguments passed to the external solver before the path of the CNF file. (Default: vec![])
    pub solver_args: Vec<String>,
}

/// The SAT solver used for a session.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SolverBackend {
    /// Varisat, running in process on a worker thread.
    Varisat,
    /// An external solver using the SAT competition output format.
    External { command: String, args: Vec<String> },
}

impl SolveConfig {
    /// The time limit for a solver run, if any.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    pub fn backend(&self) -> SolverBackend {
        if self.solver.is_empty() {
            SolverBackend::Varisat
        } else {
            SolverBackend::External {
                command: self.solver.clone(),
                args: self.solver_args.clone(),
            }
        }
    }

    /// Applies a partial update.
    pub fn update(&mut self, update: &SolveConfigUpdate) {
        if let Some(timeout_ms) = update.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(solver) = &update.solver {
            self.solver = solver.clone();
        }
        if let Some(solver_args) = &update.solver_args {
            self.solver_args = solver_args.clone();
        }
    }
}

/// A partial [`SolveConfig`].
#[derive(Deserialize, Default, Clone, PartialEq, Eq, Debug)]
#[serde(deny_unknown_fields)]
pub struct SolveConfigUpdate {
    pub timeout_ms: Option<u64>,
    pub solver: Option<String>,
    pub solver_args: Option<Vec<String>>,
}

impl SolveConfigUpdate {
    /// Merges another update into this one, the values of `other` taking precedence.
    pub fn merge(&mut self, other: SolveConfigUpdate) {
        self.timeout_ms = other.timeout_ms.or(self.timeout_ms);
        self.solver = other.solver.or_else(|| self.solver.take());
        self.solver_args = other.solver_args.or_else(|| self.solver_args.take());
    }
}

/// All parameters of an attack session.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Config {
    pub encoder: EncoderConfig,
    pub solve: SolveConfig,
}

impl Config {
    /// Listing of all options with their defaults.
    pub fn help() -> String {
        format!("{}{}", EncoderConfig::help(), SolveConfig::help())
    }

    /// Applies a partial update.
    pub fn update(&mut self, update: &ConfigUpdate) {
        let (encoder, solve) = update.split();
        self.encoder.update(&encoder);
        self.solve.update(&solve);
    }
}

/// A partial [`Config`] with all options in a single flat namespace.
///
/// This is the format of configuration files and of `key = value` options.
#[derive(Deserialize, Default, Clone, PartialEq, Eq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ConfigUpdate {
    pub native_xor: Option<bool>,
    pub native_or: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub solver: Option<String>,
    pub solver_args: Option<Vec<String>>,
}

impl ConfigUpdate {
    /// An update that changes nothing.
    pub fn new() -> ConfigUpdate {
        ConfigUpdate::default()
    }

    /// Merges another update into this one, the values of `other` taking precedence.
    pub fn merge(&mut self, other: ConfigUpdate) {
        let (mut encoder, mut solve) = self.split();
        let (other_encoder, other_solve) = other.split();
        encoder.merge(other_encoder);
        solve.merge(other_solve);

        *self = ConfigUpdate {
            native_xor: encoder.native_xor,
            native_or: encoder.native_or,
            timeout_ms: solve.timeout_ms,
            solver: solve.solver,
            solver_args: solve.solver_args,
        };
    }

    fn split(&self) -> (EncoderConfigUpdate, SolveConfigUpdate) {
        (
            EncoderConfigUpdate {
                native_xor: self.native_xor,
                native_or: self.native_or,
            },
            SolveConfigUpdate {
                timeout_ms: self.timeout_ms,
                solver: self.solver.clone(),
                solver_args: self.solver_args.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.solve.timeout(), None);
        assert_eq!(config.solve.backend(), SolverBackend::Varisat);
        assert!(config.encoder.native_xor && config.encoder.native_or);

        let help = Config::help();
        for option in ["native_xor", "native_or", "timeout_ms", "solver", "solver_args"].iter() {
            assert!(help.contains(&format!("{} = ", option)), "{}", option);
        }
    }

    #[test]
    fn file_and_options() {
        let mut update = ConfigUpdate::new();
        update.merge(
            toml::from_str(
                "native_xor = false\ntimeout_ms = 2500\nsolver = \"kissat\"\nsolver_args = [\"-q\"]",
            )
            .unwrap(),
        );
        update.merge(toml::from_str("timeout_ms = 100").unwrap());
        update.merge(toml::from_str("native_or = false").unwrap());

        let mut config = Config::default();
        config.update(&update);

        assert!(!config.encoder.native_xor);
        assert!(!config.encoder.native_or);
        assert_eq!(config.solve.timeout(), Some(Duration::from_millis(100)));
        assert_eq!(
            config.solve.backend(),
            SolverBackend::External {
                command: "kissat".to_owned(),
                args: vec!["-q".to_owned()],
            }
        );

        assert!(toml::from_str::<ConfigUpdate>("difficulty = 3").is_err());
    }
}
