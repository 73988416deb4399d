use anyhow::{anyhow, Error};
use clap::{value_t, App, ArgMatches, SubCommand};
use log::info;

use preimage::extract::{bits_to_hex, parse_hex_bits};
use preimage::reference::{DigestReference, ReferenceHash};

use super::{banner, difficulty_arg, hash_arg, init_logging, parse_difficulty, parse_family};

pub fn digest_args() -> App<'static, 'static> {
    SubCommand::with_name("--digest")
        .about("Compute the digest of an input, possibly with fewer rounds")
        .arg(hash_arg())
        .arg(difficulty_arg())
        .arg_from_usage("<INPUT> 'The input in hex'")
        .arg_from_usage(
            "[input-bits] --input-bits=[N] 'Use only this many bits of the input (all if omitted)'",
        )
}

pub fn digest_main(matches: &ArgMatches) -> Result<i32, Error> {
    init_logging();
    banner();

    let family = parse_family(matches)?;
    let difficulty = parse_difficulty(matches, family)?;

    let hex = matches.value_of("INPUT").unwrap_or_default();
    let input_bits = if matches.is_present("input-bits") {
        value_t!(matches, "input-bits", usize)?
    } else {
        hex.trim().trim_start_matches("0x").len() * 4
    };
    let input = parse_hex_bits(hex, input_bits)
        .ok_or_else(|| anyhow!("Input '{}' does not have {} bits", hex, input_bits))?;

    info!(
        "{} digest with difficulty {} of {} input bits",
        family, difficulty, input_bits
    );

    let digest = DigestReference.digest(family, &input, difficulty)?;
    println!("v {}", bits_to_hex(&digest));
    Ok(0)
}
