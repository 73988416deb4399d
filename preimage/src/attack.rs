//! Attack sessions.
//!
//! An [`Attack`] owns the circuit of one hash family at one difficulty. Running it against a
//! target encodes, solves and verifies; sessions never share a circuit.
use std::fmt;
use std::io;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use preimage_circuit::{Circuit, SymBitVec};
use preimage_cnf::{dimacs::write_instance, encode, CnfInstance, EncoderConfig};
use preimage_hash::{HashFamily, SymHash};

use crate::config::Config;
use crate::extract::{bits_to_hex, Preimage};
use crate::reference::{DigestReference, ReferenceHash};
use crate::solver::{solve, SolveOutcome};
use crate::{EncodingFaultContext, PreimageError};

/// Size and timing of an attack run.
#[derive(Clone, Debug)]
pub struct Report {
    pub family: HashFamily,
    pub difficulty: usize,
    pub input_bits: usize,
    pub encoder: EncoderConfig,
    pub circuit_nodes: usize,
    pub var_count: usize,
    pub clause_count: usize,
    pub build_time: Duration,
    pub encode_time: Duration,
    pub solve_time: Duration,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} difficulty={} input_bits={} native_xor={} native_or={} nodes={} vars={} clauses={} \
             build={:.3}s encode={:.3}s solve={:.3}s",
            self.family,
            self.difficulty,
            self.input_bits,
            self.encoder.native_xor,
            self.encoder.native_or,
            self.circuit_nodes,
            self.var_count,
            self.clause_count,
            self.build_time.as_secs_f64(),
            self.encode_time.as_secs_f64(),
            self.solve_time.as_secs_f64(),
        )
    }
}

/// Result of an attack run.
#[derive(Clone, Debug)]
pub enum AttackOutcome {
    /// A verified preimage.
    Found { preimage: Preimage, report: Report },
    /// No input hashes to the target.
    Unsatisfiable(Report),
    /// The solver ran out of time.
    Unknown(Report),
}

impl AttackOutcome {
    pub fn report(&self) -> &Report {
        match self {
            AttackOutcome::Found { report, .. } => report,
            AttackOutcome::Unsatisfiable(report) | AttackOutcome::Unknown(report) => report,
        }
    }

    pub fn preimage(&self) -> Option<&Preimage> {
        match self {
            AttackOutcome::Found { preimage, .. } => Some(preimage),
            _ => None,
        }
    }
}

/// The circuit of a hash family at one difficulty over a free input.
pub struct Attack {
    family: HashFamily,
    difficulty: usize,
    circuit: Circuit,
    input: SymBitVec,
    output: SymBitVec,
    build_time: Duration,
}

impl Attack {
    /// Builds the circuit computing `family` on `input_bits` free bits.
    pub fn new(
        family: HashFamily,
        input_bits: usize,
        difficulty: usize,
    ) -> Result<Attack, PreimageError> {
        let start = Instant::now();
        let mut circuit = Circuit::new();
        let input = circuit.input_vec(input_bits);
        let output = family.hash(&mut circuit, &input, difficulty)?;
        let build_time = start.elapsed();

        info!(
            "built {} circuit with difficulty {} on {} input bits",
            family, difficulty, input_bits
        );
        circuit.log_stats();

        Ok(Attack {
            family,
            difficulty,
            circuit,
            input,
            output,
            build_time,
        })
    }

    pub fn family(&self) -> HashFamily {
        self.family
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn input_bits(&self) -> usize {
        self.input.width()
    }

    /// Width of the digest and of the targets accepted.
    pub fn output_width(&self) -> usize {
        self.output.width()
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Encodes the circuit with the output pinned to `target`.
    pub fn encode(
        &self,
        target: &[bool],
        encoder: &EncoderConfig,
    ) -> Result<CnfInstance, PreimageError> {
        Ok(encode(&self.circuit, &self.output, target, encoder)?)
    }

    /// Writes the encoding for `target` as DIMACS CNF.
    pub fn write_dimacs(
        &self,
        target: &[bool],
        encoder: &EncoderConfig,
        output: &mut impl io::Write,
    ) -> Result<(), PreimageError> {
        let instance = self.encode(target, encoder)?;
        let description = vec![
            format!(
                "{} difficulty={} input_bits={}",
                self.family,
                self.difficulty,
                self.input_bits()
            ),
            format!("target {}", bits_to_hex(target)),
        ];
        write_instance(output, &instance, &description)?;
        Ok(())
    }

    /// Searches an input hashing to `target`.
    ///
    /// A found preimage is checked against an independent computation of the hash. A mismatch
    /// means the encoding does not represent the circuit and fails with
    /// [`PreimageError::InternalEncodingFault`].
    pub fn run(&self, target: &[bool], config: &Config) -> Result<AttackOutcome, PreimageError> {
        let start = Instant::now();
        let instance = self.encode(target, &config.encoder)?;
        let encode_time = start.elapsed();

        let start = Instant::now();
        let outcome = solve(&instance, &config.solve)?;
        let solve_time = start.elapsed();

        let report = Report {
            family: self.family,
            difficulty: self.difficulty,
            input_bits: self.input_bits(),
            encoder: config.encoder,
            circuit_nodes: self.circuit.len(),
            var_count: instance.var_count(),
            clause_count: instance.clause_count(),
            build_time: self.build_time,
            encode_time,
            solve_time,
        };

        match outcome {
            SolveOutcome::Satisfiable(model) => {
                let preimage = Preimage::extract(&instance, &model);
                self.verify(&preimage, target, &report)?;
                info!("found preimage {}", preimage);
                Ok(AttackOutcome::Found { preimage, report })
            }
            SolveOutcome::Unsatisfiable => {
                info!("no preimage: {}", report);
                Ok(AttackOutcome::Unsatisfiable(report))
            }
            SolveOutcome::Unknown => {
                warn!("gave up: {}", report);
                Ok(AttackOutcome::Unknown(report))
            }
        }
    }

    /// Like [`run`](Attack::run) with the target given as bytes.
    pub fn run_bytes(&self, target: &[u8], config: &Config) -> Result<AttackOutcome, PreimageError> {
        let width = self.output_width();
        if target.len() != (width + 7) / 8 {
            return Err(preimage_cnf::EncodeError::TargetWidth {
                output: width,
                target: target.len() * 8,
            }
            .into());
        }
        let bits = preimage_circuit::bitvec::bytes_to_bits(target, width);
        self.run(&bits, config)
    }

    /// The digest of a concrete input at this session's difficulty.
    pub fn digest(&self, input: &[bool]) -> Result<Vec<bool>, PreimageError> {
        Ok(DigestReference.digest(self.family, input, self.difficulty)?)
    }

    fn verify(
        &self,
        preimage: &Preimage,
        target: &[bool],
        report: &Report,
    ) -> Result<(), PreimageError> {
        let digest = self.digest(preimage.bits())?;
        if digest == target {
            return Ok(());
        }
        Err(PreimageError::InternalEncodingFault(Box::new(
            EncodingFaultContext {
                family: self.family,
                difficulty: self.difficulty,
                encoder: report.encoder,
                var_count: report.var_count,
                clause_count: report.clause_count,
                input: preimage.to_hex(),
                digest: bits_to_hex(&digest),
                target: bits_to_hex(target),
            },
        )))
    }
}

/// Where a sweep takes its targets from.
#[derive(Clone, Debug)]
pub enum TargetSource {
    /// The same digest at every difficulty.
    Fixed(Vec<bool>),
    /// The digest of a fresh random input at each difficulty.
    Random(u64),
}

/// Runs independent attacks over a range of difficulties.
///
/// Every difficulty gets its own circuit. Unsatisfiable and unknown outcomes do not stop the
/// sweep.
///
/// With a time limit, Varisat runs that time out keep their worker thread busy while later
/// difficulties are attacked. An external solver ([`SolveConfig::solver`], `--solver` on the
/// command line) is killed when its time is up, which makes it the better choice for timed
/// sweeps.
///
/// [`SolveConfig::solver`]: crate::config::SolveConfig::solver
pub fn sweep(
    family: HashFamily,
    input_bits: usize,
    difficulties: RangeInclusive<usize>,
    targets: &TargetSource,
    config: &Config,
) -> Result<Vec<(usize, AttackOutcome)>, PreimageError> {
    family.check_difficulty(*difficulties.start())?;
    family.check_difficulty(*difficulties.end())?;

    let seed = match targets {
        TargetSource::Random(seed) => *seed,
        TargetSource::Fixed(_) => 0,
    };
    let mut rng = StdRng::seed_from_u64(seed);

    let mut results = vec![];
    for difficulty in difficulties {
        let attack = Attack::new(family, input_bits, difficulty)?;
        let target = match targets {
            TargetSource::Fixed(target) => target.clone(),
            TargetSource::Random(_) => {
                let input: Vec<bool> = (0..input_bits).map(|_| rng.gen()).collect();
                attack.digest(&input)?
            }
        };
        let outcome = attack.run(&target, config)?;
        info!("difficulty {}: {}", difficulty, outcome.report());
        results.push((difficulty, outcome));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_scenario() {
        let attack = Attack::new(HashFamily::Identity, 8, 0).unwrap();
        let outcome = attack.run_bytes(&[0b1011_0010], &Config::default()).unwrap();
        assert_eq!(outcome.preimage().unwrap().bytes(), vec![0b1011_0010]);
        assert_eq!(outcome.report().input_bits, 8);
    }

    #[test]
    fn target_width() {
        let attack = Attack::new(HashFamily::Complement, 12, 0).unwrap();
        assert_eq!(attack.output_width(), 12);
        assert!(attack.run_bytes(&[0], &Config::default()).is_err());
        assert!(attack.run(&[false; 11], &Config::default()).is_err());
    }

    #[test]
    fn dimacs_description() {
        let attack = Attack::new(HashFamily::Complement, 8, 0).unwrap();
        let mut out = vec![];
        attack
            .write_dimacs(&[false; 8], &EncoderConfig::default(), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("c complement difficulty=0 input_bits=8\nc target 00\n"));
    }
}
