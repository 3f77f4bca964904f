use anyhow::{Context, Result};
use clap::{App, Arg};
use log::LevelFilter;
use simplelog::{Config, TermLogger, TerminalMode};
use sol2liquid::{translate_with, TranslateOptions};
use std::fs;
use std::path::Path;

fn log_level(verbosity: u64) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> Result<()> {
    let matches = App::new("sol2liquid")
        .version("0.1.0")
        .author("Solidity to LiquidHaskell Translator")
        .about("Converts Solidity smart contracts to LiquidHaskell")
        .arg(
            Arg::with_name("INPUT")
                .help("Input Solidity file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("DIR")
                .help("Output directory for the Haskell module")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("module")
                .long("module")
                .value_name("NAME")
                .help("Module name (defaults to the first contract's name)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("stdout")
                .long("stdout")
                .help("Print the module instead of writing a file"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Increase log verbosity (-v, -vv, -vvv)"),
        )
        .get_matches();

    if let Err(err) = TermLogger::init(
        log_level(matches.occurrences_of("verbose")),
        Config::default(),
        TerminalMode::Stderr,
    ) {
        eprintln!("Logging disabled: {}", err);
    }

    let input_file = matches.value_of("INPUT").context("Missing input file")?;
    let output_dir = matches
        .value_of("output")
        .map(String::from)
        .unwrap_or_else(|| String::from("."));
    let mut options = TranslateOptions::default();
    if let Some(name) = matches.value_of("module") {
        options = options.with_module_name(name);
    }

    // Read input file
    let source = fs::read_to_string(input_file)
        .with_context(|| format!("Failed to read input file: {}", input_file))?;

    let module = translate_with(&source, &options)
        .with_context(|| format!("Failed to translate {}", input_file))?;

    if matches.is_present("stdout") {
        print!("{}", module.text);
        return Ok(());
    }

    let output_file = Path::new(&output_dir).join(format!("{}.hs", module.name));
    fs::write(&output_file, &module.text)
        .with_context(|| format!("Failed to write output file: {}", output_file.display()))?;

    println!(
        "Successfully converted {} ({}) to {}",
        input_file,
        module.contracts.join(", "),
        output_file.display()
    );
    Ok(())
}
