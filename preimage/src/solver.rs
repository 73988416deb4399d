//! Solver adapter.
//!
//! Runs a [`CnfInstance`] through the configured [`SolverBackend`] with an optional time limit.
//! Running out of time is reported as [`SolveOutcome::Unknown`], not as an error.
use std::io::{self, Read, Seek, SeekFrom};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use log::{debug, info, warn};
use thiserror::Error;
use varisat::{ExtendFormula, Lit, Solver};
use wait_timeout::ChildExt;

use preimage_cnf::{dimacs::write_instance, CnfInstance};

use crate::config::{SolveConfig, SolverBackend};

/// Verdict of a solver run.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SolveOutcome {
    /// A model, listing each variable once.
    Satisfiable(Vec<Lit>),
    Unsatisfiable,
    /// The time limit was hit or the solver gave up.
    Unknown,
}

/// Possible errors while running a solver.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Varisat failed: {}", message)]
    Varisat { message: String },
    #[error("Could not run solver {:?}: {}", command, source)]
    Spawn { command: String, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Unexpected solver output: {:?}", line)]
    Protocol { line: String },
    #[error("Solver worker thread stopped without a result")]
    WorkerLost,
}

/// Solves an instance with the backend and time limit of `config`.
pub fn solve(instance: &CnfInstance, config: &SolveConfig) -> Result<SolveOutcome, SolverError> {
    info!(
        "solving {} variables and {} clauses",
        instance.var_count(),
        instance.clause_count()
    );
    let outcome = match config.backend() {
        SolverBackend::Varisat => solve_varisat(instance, config.timeout())?,
        SolverBackend::External { command, args } => {
            solve_external(instance, &command, &args, config.timeout())?
        }
    };
    info!("solver verdict: {}", verdict_name(&outcome));
    Ok(outcome)
}

fn verdict_name(outcome: &SolveOutcome) -> &'static str {
    match outcome {
        SolveOutcome::Satisfiable(_) => "satisfiable",
        SolveOutcome::Unsatisfiable => "unsatisfiable",
        SolveOutcome::Unknown => "unknown",
    }
}

static RUNNING_WORKERS: AtomicUsize = AtomicUsize::new(0);

/// Number of Varisat worker threads that have not finished yet.
///
/// This includes workers abandoned after their time limit passed.
pub fn running_varisat_workers() -> usize {
    RUNNING_WORKERS.load(Ordering::SeqCst)
}

/// Counts a worker as running until dropped.
struct WorkerGuard {
    count: &'static AtomicUsize,
}

impl WorkerGuard {
    fn new(count: &'static AtomicUsize) -> WorkerGuard {
        count.fetch_add(1, Ordering::SeqCst);
        WorkerGuard { count }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs Varisat on a worker thread.
///
/// Varisat cannot be interrupted, so when the time limit passes the worker is left to finish on
/// its own and its result is dropped. It keeps a CPU busy until then, see
/// [`running_varisat_workers`].
fn solve_varisat(
    instance: &CnfInstance,
    timeout: Option<Duration>,
) -> Result<SolveOutcome, SolverError> {
    let clauses: Vec<Vec<Lit>> = instance
        .formula()
        .iter()
        .map(|clause| clause.to_vec())
        .collect();
    let var_count = instance.var_count();

    let (sender, receiver) = bounded(1);
    let guard = WorkerGuard::new(&RUNNING_WORKERS);

    thread::Builder::new()
        .name("varisat".to_owned())
        .spawn(move || {
            let _guard = guard;
            let mut solver = Solver::new();
            for clause in clauses.iter() {
                solver.add_clause(clause);
            }
            let result = match solver.solve() {
                Ok(true) => Ok(SolveOutcome::Satisfiable(
                    complete_model(solver.model().unwrap_or_default(), var_count),
                )),
                Ok(false) => Ok(SolveOutcome::Unsatisfiable),
                Err(err) => Err(SolverError::Varisat {
                    message: err.to_string(),
                }),
            };
            // The receiver is gone after a timeout.
            let _ = sender.send(result);
        })?;

    match timeout {
        None => receiver.recv().map_err(|_| SolverError::WorkerLost)?,
        Some(timeout) => match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "varisat did not finish within {:?}, {} worker(s) still running",
                    timeout,
                    running_varisat_workers()
                );
                Ok(SolveOutcome::Unknown)
            }
            Err(RecvTimeoutError::Disconnected) => Err(SolverError::WorkerLost),
        },
    }
}

/// Runs an external solver on a temporary DIMACS file.
///
/// The solver output goes to a temporary file as well, so a chatty solver never blocks on a full
/// pipe while we wait for it to exit.
fn solve_external(
    instance: &CnfInstance,
    command: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<SolveOutcome, SolverError> {
    let mut cnf_file = tempfile::Builder::new()
        .prefix("preimage-")
        .suffix(".cnf")
        .tempfile()?;
    write_instance(cnf_file.as_file_mut(), instance, &[])?;
    cnf_file.as_file_mut().sync_all()?;

    let mut output_file = tempfile::tempfile()?;

    debug!("running {} {:?} {:?}", command, args, cnf_file.path());

    let mut child = Command::new(command)
        .args(args)
        .arg(cnf_file.path())
        .stdin(Stdio::null())
        .stdout(Stdio::from(output_file.try_clone()?))
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| SolverError::Spawn {
            command: command.to_owned(),
            source,
        })?;

    let status = match timeout {
        None => child.wait()?,
        Some(timeout) => match child.wait_timeout(timeout)? {
            Some(status) => status,
            None => {
                warn!("{} did not finish within {:?}", command, timeout);
                child.kill()?;
                child.wait()?;
                return Ok(SolveOutcome::Unknown);
            }
        },
    };

    let mut output = String::new();
    output_file.seek(SeekFrom::Start(0))?;
    output_file.read_to_string(&mut output)?;

    parse_competition_output(&output, status.code(), instance.var_count())
}

/// Parses the output of a solver using the SAT competition format.
///
/// The `s` line decides the verdict, the exit code (10 or 20) is only used when it is missing.
/// Values lines are collected into a model; variables they do not mention are set to false.
pub fn parse_competition_output(
    output: &str,
    exit_code: Option<i32>,
    var_count: usize,
) -> Result<SolveOutcome, SolverError> {
    let mut status = None;
    let mut model = vec![];
    let mut model_done = false;

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        } else if let Some(rest) = line.strip_prefix("s ") {
            status = Some(match rest.trim() {
                "SATISFIABLE" => true,
                "UNSATISFIABLE" => false,
                "UNKNOWN" => return Ok(SolveOutcome::Unknown),
                _ => {
                    return Err(SolverError::Protocol {
                        line: line.to_owned(),
                    })
                }
            });
        } else if let Some(rest) = line.strip_prefix('v') {
            for number in rest.split_whitespace() {
                let number: isize = number.parse().map_err(|_| SolverError::Protocol {
                    line: line.to_owned(),
                })?;
                if number == 0 {
                    model_done = true;
                } else if number.unsigned_abs() > var_count {
                    return Err(SolverError::Protocol {
                        line: line.to_owned(),
                    });
                } else {
                    model.push(Lit::from_dimacs(number));
                }
            }
        } else {
            return Err(SolverError::Protocol {
                line: line.to_owned(),
            });
        }
    }

    let status = match (status, exit_code) {
        (Some(status), _) => status,
        (None, Some(10)) => true,
        (None, Some(20)) => false,
        (None, _) => return Ok(SolveOutcome::Unknown),
    };

    if !status {
        return Ok(SolveOutcome::Unsatisfiable);
    }
    if model.is_empty() && var_count > 0 {
        return Err(SolverError::Protocol {
            line: "s SATISFIABLE without values".to_owned(),
        });
    }
    if !model_done {
        debug!("values list is not terminated by 0");
    }
    Ok(SolveOutcome::Satisfiable(complete_model(model, var_count)))
}

/// Adds negative literals for the variables a model leaves out.
fn complete_model(model: Vec<Lit>, var_count: usize) -> Vec<Lit> {
    let mut values: Vec<Option<Lit>> = vec![None; var_count];
    for lit in model {
        if let Some(value) = values.get_mut(lit.index()) {
            *value = Some(lit);
        }
    }
    values
        .into_iter()
        .enumerate()
        .map(|(index, lit)| lit.unwrap_or_else(|| varisat::Var::from_index(index).negative()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use preimage_circuit::Circuit;
    use preimage_cnf::{encode, EncoderConfig};

    #[test]
    fn worker_guard_counts() {
        static COUNT: AtomicUsize = AtomicUsize::new(0);

        let first = WorkerGuard::new(&COUNT);
        let second = WorkerGuard::new(&COUNT);
        assert_eq!(COUNT.load(Ordering::SeqCst), 2);
        drop(first);
        assert_eq!(COUNT.load(Ordering::SeqCst), 1);

        let worker = thread::spawn(move || {
            let _guard = second;
            panic!("worker failed");
        });
        assert!(worker.join().is_err());
        assert_eq!(COUNT.load(Ordering::SeqCst), 0);
    }

    fn lits(numbers: &[isize]) -> Vec<Lit> {
        numbers.iter().map(|&number| Lit::from_dimacs(number)).collect()
    }

    #[test]
    fn competition_output() {
        let output = "c some solver\ns SATISFIABLE\nv 1 -2\nv 3 0\n";
        assert_eq!(
            parse_competition_output(output, Some(10), 3).unwrap(),
            SolveOutcome::Satisfiable(lits(&[1, -2, 3]))
        );

        assert_eq!(
            parse_competition_output("v -3 0\ns SATISFIABLE\n", None, 3).unwrap(),
            SolveOutcome::Satisfiable(lits(&[-1, -2, -3]))
        );

        assert_eq!(
            parse_competition_output("s UNSATISFIABLE\n", Some(20), 3).unwrap(),
            SolveOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_competition_output("", Some(20), 3).unwrap(),
            SolveOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_competition_output("s UNKNOWN\n", Some(0), 3).unwrap(),
            SolveOutcome::Unknown
        );
        assert_eq!(
            parse_competition_output("", None, 3).unwrap(),
            SolveOutcome::Unknown
        );

        for bad in ["s MAYBE\n", "s SATISFIABLE\nv 4 0\n", "s SATISFIABLE\n", "v x 0\n"].iter() {
            assert!(
                parse_competition_output(bad, Some(10), 3).is_err(),
                "{:?}",
                bad
            );
        }
    }

    fn xor_instance(target: bool) -> CnfInstance {
        let mut circuit = Circuit::new();
        let a = circuit.new_input();
        let b = circuit.new_input();
        let x = circuit.xor_gate(a, b);
        let output = preimage_circuit::SymBitVec::from_bits(vec![x, a]);
        encode(&circuit, &output, &[target, true], &EncoderConfig::default()).unwrap()
    }

    #[test]
    fn varisat_backend() {
        let instance = xor_instance(true);
        let config = SolveConfig {
            timeout_ms: 60_000,
            ..SolveConfig::default()
        };
        match solve(&instance, &config).unwrap() {
            SolveOutcome::Satisfiable(model) => {
                assert_eq!(model.len(), instance.var_count());
                assert!(instance.satisfied_by(&model));
                assert_eq!(instance.input_values(&model), vec![true, false]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let mut circuit = Circuit::new();
        let a = circuit.new_input();
        let not_a = circuit.not_gate(a);
        let both = circuit.and_gate(a, not_a);
        let output = preimage_circuit::SymBitVec::from_bits(vec![both]);
        let instance = encode(&circuit, &output, &[true], &EncoderConfig::default()).unwrap();
        assert_eq!(
            solve(&instance, &SolveConfig::default()).unwrap(),
            SolveOutcome::Unsatisfiable
        );
    }

    #[cfg(unix)]
    fn fake_solver(script: &str) -> SolveConfig {
        SolveConfig {
            timeout_ms: 0,
            solver: "sh".to_owned(),
            solver_args: vec!["-c".to_owned(), script.to_owned(), "fake-solver".to_owned()],
        }
    }

    #[cfg(unix)]
    #[test]
    fn external_backend() {
        let instance = xor_instance(true);

        // The CNF path is passed as the first positional argument.
        let config = fake_solver("grep -q '^p cnf' \"$1\" && echo 's SATISFIABLE' && echo 'v 1 -2 3 0'; exit 10");
        match solve(&instance, &config).unwrap() {
            SolveOutcome::Satisfiable(model) => {
                assert_eq!(instance.input_values(&model), vec![true, false]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let config = fake_solver("echo 's UNSATISFIABLE'; exit 20");
        assert_eq!(
            solve(&instance, &config).unwrap(),
            SolveOutcome::Unsatisfiable
        );

        let mut config = fake_solver("sleep 5; echo 's UNSATISFIABLE'");
        config.timeout_ms = 100;
        assert_eq!(solve(&instance, &config).unwrap(), SolveOutcome::Unknown);

        let config = SolveConfig {
            solver: "/nonexistent/preimage-solver".to_owned(),
            ..SolveConfig::default()
        };
        match solve(&instance, &config) {
            Err(SolverError::Spawn { .. }) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
