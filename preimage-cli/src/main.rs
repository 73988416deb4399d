use std::env;
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::ops::RangeInclusive;

use anyhow::{anyhow, bail, Error};
use clap::{value_t, values_t, App, AppSettings, Arg, ArgMatches};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};
use rand::{rngs::StdRng, Rng, SeedableRng};
use strum::IntoEnumIterator;

use preimage::extract::{bits_to_hex, parse_hex, parse_hex_bits};
use preimage::{sweep, Attack, AttackOutcome, Config, ConfigUpdate, TargetSource};
use preimage_hash::{HashFamily, SymHash};

mod digest;

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("PREIMAGE_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is preimage {}", env!("PREIMAGE_VERSION"));
    info!(
        "  {} build - {}",
        env!("PREIMAGE_PROFILE"),
        env!("PREIMAGE_RUSTC_VERSION")
    );
}

fn hash_arg() -> Arg<'static, 'static> {
    Arg::from_usage("[hash] --hash=[FAMILY] 'The hash family to attack'")
        .long_help(
            "The hash family to attack: sha256, ripemd160, md5, identity, complement, \
             lossy-pseudo or non-lossy-pseudo.",
        )
        .default_value("sha256")
}

fn difficulty_arg() -> Arg<'static, 'static> {
    Arg::from_usage(
        "[difficulty] --difficulty=[N] 'Number of rounds to execute (full algorithm if omitted)'",
    )
}

/// The hash family selected on the command line.
fn parse_family(matches: &ArgMatches) -> Result<HashFamily, Error> {
    let name = matches.value_of("hash").unwrap_or("sha256");
    name.parse().map_err(|_| {
        let names: Vec<String> = HashFamily::iter().map(|family| family.to_string()).collect();
        anyhow!(
            "Unknown hash family '{}', expected one of {}",
            name,
            names.join(", ")
        )
    })
}

/// The difficulty selected on the command line.
fn parse_difficulty(matches: &ArgMatches, family: HashFamily) -> Result<usize, Error> {
    if matches.is_present("difficulty") {
        Ok(value_t!(matches, "difficulty", usize)?)
    } else {
        Ok(family.default_difficulty())
    }
}

/// Parses `FROM..TO` or `FROM..=TO`, both ends included.
fn parse_range(range: &str) -> Result<RangeInclusive<usize>, Error> {
    let parts: Vec<&str> = range.splitn(2, "..").collect();
    if parts.len() != 2 {
        bail!("Expected a difficulty range FROM..TO, got '{}'", range);
    }
    let start: usize = parts[0].trim().parse()?;
    let end: usize = parts[1].trim().trim_start_matches('=').parse()?;
    if start > end {
        bail!("Empty difficulty range '{}'", range);
    }
    Ok(start..=end)
}

/// Parses a target digest of `width` bits.
fn parse_target(hex: &str, width: usize) -> Result<Vec<bool>, Error> {
    parse_hex_bits(hex, width).ok_or_else(|| {
        anyhow!(
            "Target must be {} hex digits for a {} bit digest",
            (width + 7) / 8 * 2,
            width
        )
    })
}

fn load_config(matches: &ArgMatches) -> Result<Config, Error> {
    let mut config_update = ConfigUpdate::new();

    if let Some(config_path) = matches.value_of("config-file") {
        let mut config_contents = String::new();
        fs::File::open(config_path)?.read_to_string(&mut config_contents)?;

        config_update.merge(toml::from_str(&config_contents)?);
    }

    for config_option in values_t!(matches, "config-option", String).unwrap_or_default() {
        config_update.merge(toml::from_str(&config_option)?);
    }

    if matches.is_present("timeout") {
        let seconds = value_t!(matches, "timeout", f64)?;
        if seconds.is_nan() || seconds < 0.0 {
            bail!("Invalid timeout {}", seconds);
        }
        config_update.timeout_ms = Some((seconds * 1000.0).ceil() as u64);
    }

    if let Some(solver) = matches.value_of("solver") {
        config_update.solver = Some(solver.to_owned());
    }

    let mut config = Config::default();
    config.update(&config_update);
    Ok(config)
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("preimage")
        .version(env!("PREIMAGE_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::ArgsNegateSubcommands)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(hash_arg())
        .arg(difficulty_arg())
        .arg_from_usage(
            "[input-bits] --input-bits=[N] 'Number of free input bits (defaults to 32 or the \
             size of --input)'",
        )
        .arg(
            Arg::from_usage("[target] --target=[HEX] 'The digest to find a preimage for'")
                .conflicts_with("input"),
        )
        .arg_from_usage(
            "[input] --input=[HEX] 'Attack the digest of this input (a random input if neither \
             --target nor --input is given)'",
        )
        .arg_from_usage("[seed] --seed=[N] 'Seed for random inputs'")
        .arg_from_usage("[config-file] --config=[FILE] 'Read parameters from configuration file'")
        .arg(
            Arg::from_usage("[config-option] -C --config-option")
                .value_name("OPTION>=<VALUE")
                .help(
                    "Specify a single config option, see 'preimage -C help' for a list of options.",
                )
                .multiple(true)
                .number_of_values(1),
        )
        .arg_from_usage("[timeout] --timeout=[SECS] 'Give up after this many seconds'")
        .arg_from_usage(
            "[solver] --solver=[CMD] 'Use an external DIMACS solver instead of Varisat'",
        )
        .arg_from_usage(
            "[dimacs] --dimacs=[FILE] 'Write the CNF encoding to a file instead of solving it'",
        )
        .arg(
            Arg::from_usage(
                "[sweep] --sweep=[RANGE] 'Attack each difficulty in FROM..TO with a fresh target'",
            )
            .conflicts_with_all(&["difficulty", "dimacs"]),
        )
        .subcommand(digest::digest_args())
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("--digest") {
        return digest::digest_main(matches);
    }

    if values_t!(matches, "config-option", String)
        .unwrap_or_default()
        .iter()
        .any(|option| option == "help")
    {
        print!("{}", Config::help());
        return Ok(0);
    }

    init_logging();
    banner();

    let config = load_config(&matches)?;
    let family = parse_family(&matches)?;

    let input_hex = matches.value_of("input");

    let input_bits = if matches.is_present("input-bits") {
        value_t!(matches, "input-bits", usize)?
    } else if let Some(hex) = input_hex {
        parse_hex(hex)
            .ok_or_else(|| anyhow!("Invalid hex input '{}'", hex))?
            .len()
            * 8
    } else {
        32
    };

    let input = match input_hex {
        Some(hex) => Some(parse_hex_bits(hex, input_bits).ok_or_else(|| {
            anyhow!("Input '{}' does not have {} bits", hex, input_bits)
        })?),
        None => None,
    };

    let seed = if matches.is_present("seed") {
        value_t!(matches, "seed", u64)?
    } else {
        rand::thread_rng().gen()
    };

    if let Some(range) = matches.value_of("sweep") {
        let targets = match (matches.value_of("target"), input) {
            (Some(hex), _) => TargetSource::Fixed(parse_target(hex, family.output_width(input_bits))?),
            (None, Some(_)) => {
                bail!("--sweep derives a target per difficulty and cannot be combined with --input")
            }
            (None, None) => TargetSource::Random(seed),
        };
        return sweep_main(family, input_bits, parse_range(range)?, &targets, &config);
    }

    let difficulty = parse_difficulty(&matches, family)?;
    let attack = Attack::new(family, input_bits, difficulty)?;

    let target = match (matches.value_of("target"), input) {
        (Some(hex), _) => parse_target(hex, attack.output_width())?,
        (None, Some(input)) => attack.digest(&input)?,
        (None, None) => {
            let mut rng = StdRng::seed_from_u64(seed);
            let input: Vec<bool> = (0..input_bits).map(|_| rng.gen()).collect();
            info!("Random input {} (seed {})", bits_to_hex(&input), seed);
            attack.digest(&input)?
        }
    };

    info!("Target {}", bits_to_hex(&target));

    if let Some(path) = matches.value_of("dimacs") {
        info!("Writing CNF to file '{}'", path);
        let mut file = BufWriter::new(fs::File::create(path)?);
        attack.write_dimacs(&target, &config.encoder, &mut file)?;
        file.flush()?;
        return Ok(0);
    }

    let outcome = attack.run(&target, &config)?;
    info!("{}", outcome.report());
    Ok(print_outcome(&outcome))
}

fn print_outcome(outcome: &AttackOutcome) -> i32 {
    match outcome {
        AttackOutcome::Found { preimage, .. } => {
            println!("s SATISFIABLE");
            println!("v {}", preimage);
            10
        }
        AttackOutcome::Unsatisfiable(_) => {
            println!("s UNSATISFIABLE");
            20
        }
        AttackOutcome::Unknown(_) => {
            println!("s UNKNOWN");
            0
        }
    }
}

fn sweep_main(
    family: HashFamily,
    input_bits: usize,
    difficulties: RangeInclusive<usize>,
    targets: &TargetSource,
    config: &Config,
) -> Result<i32, Error> {
    info!(
        "Sweeping {} difficulties {}..={}",
        family,
        difficulties.start(),
        difficulties.end()
    );

    for (difficulty, outcome) in sweep(family, input_bits, difficulties, targets, config)? {
        let verdict = match &outcome {
            AttackOutcome::Found { preimage, .. } => format!("found {}", preimage),
            AttackOutcome::Unsatisfiable(_) => "unsatisfiable".to_owned(),
            AttackOutcome::Unknown(_) => "unknown".to_owned(),
        };
        info!("difficulty {}: {} ({})", difficulty, verdict, outcome.report());
    }
    Ok(0)
}
