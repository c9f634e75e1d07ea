//! cmdlog: drive a bounded command history from the command line.
//!
//! Reads a byte stream (a file, stdin, or generated sample commands), writes
//! it into a [`CommandHistory`](cmdlog_core::CommandHistory) in randomly sized
//! fragments, reads back what the history retained in fixed-size chunks, and
//! checks that it is exactly the tail of the input.
//!
//! Usage:
//!   cmdlog                                  # sample input, random fragmenting
//!   cmdlog --seed 42 --print-config         # reproducible run
//!   cmdlog --in commands.txt --out -        # last 10 commands to stdout
//!   cmdlog --in - --capacity 3 < input.txt

mod config;
mod input_gen;
mod run;

use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cmdlog: {}", e);
            return ExitCode::from(2);
        }
    };

    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("cmdlog: a global tracing subscriber was already installed");
    }

    match execute(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run once; returns whether the retained history verified.
fn execute(config: &Config) -> Result<bool> {
    if config.print_config {
        print_config(config, &mut io::stdout().lock(), &mut io::stderr().lock())
            .context("failed to print configuration")?;
    }

    let input = load_input(config)?;
    info!(bytes = input.len(), "input loaded");

    let report = run::run(config, &input)?;
    store_output(config, &report.output)?;

    if config.print_metrics && !config.output_is_stdout() {
        report.metrics.print_summary();
    }

    let verified = report.verify(&input, config.history.capacity);
    if verified {
        info!(
            records = report.retained,
            bytes = report.output.len(),
            unterminated = report.unterminated,
            "retained history verified"
        );
    } else {
        error!("retained history does not match the tail of the input");
    }
    Ok(verified)
}

/// The config banner must not end up inside history written to stdout.
fn print_config<O: Write, E: Write>(
    config: &Config,
    stdout: &mut O,
    stderr: &mut E,
) -> io::Result<()> {
    if config.output_is_stdout() {
        config.print(stderr)
    } else {
        config.print(stdout)
    }
}

fn load_input(config: &Config) -> Result<Vec<u8>> {
    match &config.input_file {
        None => Ok(input_gen::generate_sample_data(
            config.seed,
            config.sample_lines,
            config.history.delimiter,
        )),
        Some(path) if path.as_os_str() == "-" => {
            let mut data = Vec::new();
            io::stdin()
                .read_to_end(&mut data)
                .context("failed to read stdin")?;
            Ok(data)
        }
        Some(path) => {
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
    }
}

fn store_output(config: &Config, output: &[u8]) -> Result<()> {
    if config.output_is_stdout() {
        let mut stdout = io::stdout().lock();
        stdout.write_all(output).context("failed to write stdout")?;
        stdout.flush().context("failed to flush stdout")?;
    } else {
        fs::write(&config.output_file, output)
            .with_context(|| format!("failed to write {}", config.output_file.display()))?;
    }
    Ok(())
}
