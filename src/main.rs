use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gabes::circuit::Circuit;
use gabes::error::{GabesError, Result};
use gabes::scheme::SchemeKind;
use gabes::transport::Channel;
use gabes::{evaluator, garbler, rng};

/// Two-party secure function evaluation over garbled boolean circuits.
#[derive(Parser, Debug)]
#[command(name = "gabes")]
#[command(about = "Jointly compute a boolean circuit without revealing your input bits")]
#[command(version)]
struct Args {
    /// Run as the garbler (connects to the evaluator).
    #[arg(short = 'g', long)]
    garbler: bool,

    /// Run as the evaluator (accepts the garbler's connection).
    #[arg(short = 'e', long)]
    evaluator: bool,

    /// This party's input bits, as a string of '0' and '1' digits.
    #[arg(short = 'b', long)]
    bits: String,

    /// Identifiers of the input wires this party feeds, one per bit.
    #[arg(short = 'i', long, num_args = 1..)]
    ids: Vec<String>,

    /// Circuit file (garbler only).
    #[arg(short = 'c', long)]
    circuit: Option<PathBuf>,

    /// Peer address as HOST:PORT.
    #[arg(short = 'a', long)]
    address: String,

    /// Garbling scheme; both parties must agree out of band.
    #[arg(short = 's', long, value_enum, default_value_t = SchemeKind::Classical)]
    scheme: SchemeKind,

    /// Write the garbler's input-wire label table as JSON (debugging).
    #[arg(long, value_name = "FILE")]
    dump_labels: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Clap renders its own message; the exit code is ours.
            let _ = err.print();
            return ExitCode::from(1);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(args: Args) -> Result<()> {
    if args.garbler == args.evaluator {
        return Err(GabesError::Usage(
            "select exactly one role: --garbler or --evaluator".to_string(),
        ));
    }

    let bits = parse_bits(&args.bits)?;
    if args.ids.len() != bits.len() {
        return Err(GabesError::Usage(format!(
            "{} wire identifiers for {} input bits",
            args.ids.len(),
            bits.len()
        )));
    }

    let mut rng = rng::new_rng()?;

    let output = if args.garbler {
        let circuit_path = args.circuit.as_ref().ok_or_else(|| {
            GabesError::Usage("the garbler requires a circuit file (-c)".to_string())
        })?;
        let text = std::fs::read_to_string(circuit_path).map_err(|e| {
            GabesError::Usage(format!("could not read {}: {e}", circuit_path.display()))
        })?;
        let circuit = Circuit::parse(&text)?;

        let mut channel = Channel::connect(&args.address)?;
        if let Some(dump_path) = &args.dump_labels {
            let garbling = garbler::garble(&mut rng, args.scheme, &circuit)?;
            garbling.save_labels_json(dump_path)?;
            garbler::run_garbled(
                &mut channel,
                &mut rng,
                args.scheme,
                &garbling,
                &circuit.input_identifiers(),
                &args.ids,
                &bits,
            )?
        } else {
            garbler::run(
                &mut channel,
                &mut rng,
                args.scheme,
                &circuit,
                &args.ids,
                &bits,
            )?
        }
    } else {
        if args.circuit.is_some() {
            return Err(GabesError::Usage(
                "only the garbler takes a circuit file".to_string(),
            ));
        }
        if args.dump_labels.is_some() {
            return Err(GabesError::Usage(
                "only the garbler can dump labels".to_string(),
            ));
        }

        let mut channel = Channel::accept(&args.address)?;
        evaluator::run(&mut channel, &mut rng, args.scheme, &args.ids, &bits)?
    };

    println!("output: {}", output as u8);
    Ok(())
}

fn parse_bits(bits: &str) -> Result<Vec<bool>> {
    if bits.is_empty() {
        return Err(GabesError::Usage("the input bitstring is empty".to_string()));
    }

    bits.chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => Err(GabesError::Usage(format!(
                "input bits must be '0' or '1', got '{other}'"
            ))),
        })
        .collect()
}
