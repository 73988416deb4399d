//! DIMACS CNF export of encoded instances.
use std::io;

use varisat_dimacs::{write_dimacs_clauses, write_dimacs_header, DimacsHeader};
use varisat_formula::Var;

use crate::instance::CnfInstance;

/// Writes an instance as DIMACS CNF.
///
/// The header is preceded by comment lines: the given `description` lines, the encoder
/// configuration and the DIMACS numbers of the input and output variables, both least
/// significant bit first. They allow mapping a model produced by another solver back to a
/// preimage.
pub fn write_instance(
    target: &mut impl io::Write,
    instance: &CnfInstance,
    description: &[String],
) -> io::Result<()> {
    for line in description.iter() {
        writeln!(target, "c {}", line)?;
    }
    let config = instance.config();
    writeln!(
        target,
        "c encoder native_xor={} native_or={}",
        config.native_xor, config.native_or
    )?;
    write_var_list(target, "inputs", instance.input_vars())?;
    write_var_list(target, "outputs", instance.output_vars())?;

    write_dimacs_header(
        &mut *target,
        DimacsHeader {
            var_count: instance.var_count(),
            clause_count: instance.clause_count(),
        },
    )?;
    write_dimacs_clauses(&mut *target, instance.formula().iter())
}

fn write_var_list(target: &mut impl io::Write, name: &str, vars: &[Var]) -> io::Result<()> {
    write!(target, "c {}", name)?;
    for var in vars.iter() {
        write!(target, " {}", var.to_dimacs())?;
    }
    writeln!(target)
}

/// Reads the input variable list back from the comments written by [`write_instance`].
///
/// Returns `None` if there is no such comment or it lists anything but variable numbers.
pub fn parse_input_vars(dimacs: &str) -> Option<Vec<Var>> {
    let line = dimacs
        .lines()
        .take_while(|line| line.starts_with('c'))
        .find(|line| line.starts_with("c inputs"))?;
    let max = Var::max_var().to_dimacs();
    line["c inputs".len()..]
        .split_whitespace()
        .map(|number| {
            number
                .parse::<isize>()
                .ok()
                .filter(|&number| number > 0 && number <= max)
                .map(Var::from_dimacs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use anyhow::Error;
    use varisat_dimacs::DimacsParser;

    use preimage_circuit::Circuit;

    use crate::config::EncoderConfig;
    use crate::encoder::encode_bytes;

    #[test]
    fn roundtrip_through_file() -> Result<(), Error> {
        let mut circuit = Circuit::new();
        let x = circuit.input_vec(8);
        let y = circuit.input_vec(8);
        let sum = circuit.add(&x, &y)?;

        let config = EncoderConfig {
            native_xor: false,
            native_or: true,
        };
        let instance = encode_bytes(&circuit, &sum, &[0x42], &config)?;

        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("sum.cnf");
        let mut file = fs::File::create(&path)?;
        write_instance(&mut file, &instance, &["add 8".to_owned()])?;
        drop(file);

        let contents = fs::read_to_string(&path)?;
        assert!(contents.starts_with("c add 8\nc encoder native_xor=false native_or=true\n"));

        let parsed = DimacsParser::parse(contents.as_bytes())?;
        assert_eq!(&parsed, instance.formula());
        assert_eq!(parse_input_vars(&contents), Some(instance.input_vars().to_vec()));

        Ok(())
    }

    #[test]
    fn malformed_input_lists() {
        let header = |line: &str| format!("c test\n{}\np cnf 3 0\n", line);

        assert_eq!(
            parse_input_vars(&header("c inputs 1 3")),
            Some(vec![Var::from_index(0), Var::from_index(2)])
        );
        assert_eq!(parse_input_vars(&header("c inputs")), Some(vec![]));

        assert_eq!(parse_input_vars(&header("c inputs 0 -3")), None);
        assert_eq!(parse_input_vars(&header("c inputs 2 -1")), None);
        assert_eq!(parse_input_vars(&header("c inputs x")), None);
        assert_eq!(parse_input_vars(&header("c inputs 99999999999999")), None);
        assert_eq!(parse_input_vars(&header("c outputs 1")), None);
        assert_eq!(parse_input_vars("p cnf 1 0\nc inputs 1\n"), None);
    }
}
