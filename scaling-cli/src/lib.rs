//! cats-scaling CLI library
//!
//! This library provides the command-line driver for the CATS thread-scaling
//! sweep.

pub mod cli;
pub mod error;
pub mod progress;

pub use cli::Cli;
pub use error::{CliError, CliResult};
