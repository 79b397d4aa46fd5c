//! cats-scaling: run the thread-scaling sweep against the CATS engine

use cats_scaling::error::{dump_captured_output, exit_code};
use cats_scaling::Cli;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            dump_captured_output(&error, &mut std::io::stderr());
            eprintln!("Error: {error:#}");
            ExitCode::from(exit_code(&error) as u8)
        }
    }
}
