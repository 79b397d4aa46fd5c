//! Error types for the scaling harness
//!
//! Every variant is fatal for the sweep it occurs in. The caller decides what
//! to salvage (see [`crate::sweep::SweepFailure`]).

use crate::types::SweepConfiguration;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors raised while generating inputs, driving the engine, or writing results
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The engine binary is missing, not executable, or failed to start
    #[error("failed to launch engine '{}': {source}", .program.display())]
    ProcessLaunch {
        /// Program that was spawned
        program: PathBuf,
        /// Underlying spawn error
        source: io::Error,
    },

    /// The engine report did not contain a usable timing line
    #[error("unexpected engine output: {reason} ({} line(s) captured)", .lines.len())]
    OutputFormat {
        /// What was wrong with the report
        reason: String,
        /// Every captured stdout line, in order, for the diagnostic dump
        lines: Vec<String>,
    },

    /// The generated input file could not be written
    #[error("failed to write input file '{}': {source}", .path.display())]
    InputWrite {
        /// Destination of the input file
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// The engine did not finish within the per-invocation limit
    #[error("engine run with {threads} thread(s) exceeded {}s and was killed", .limit.as_secs())]
    Timeout {
        /// Thread count of the killed invocation
        threads: usize,
        /// Configured limit
        limit: Duration,
    },

    /// The sweep was cancelled while an engine run was in flight
    #[error("sweep cancelled")]
    Cancelled,

    /// Copying the engine binary into the work directory failed
    #[error("failed to stage engine from '{}': {source}", .from.display())]
    Stage {
        /// Source binary path
        from: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// A measurement of zero seconds cannot be normalized
    #[error("engine reported zero elapsed time for {0}")]
    ZeroElapsed(SweepConfiguration),

    /// Invalid harness configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Results report could not be written
    #[error("failed to write report '{}': {reason}", .path.display())]
    Report {
        /// Destination of the report
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Chart rendering failed
    #[error("chart rendering failed: {0}")]
    Chart(String),
}

impl HarnessError {
    /// Captured engine output attached to this error, if any
    pub fn captured_lines(&self) -> Option<&[String]> {
        match self {
            Self::OutputFormat { lines, .. } => Some(lines),
            _ => None,
        }
    }
}
