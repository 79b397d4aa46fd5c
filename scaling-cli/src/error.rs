//! Error handling for the CLI application

use cats_scaling_core::HarnessError;
use std::fmt;
use std::io::Write;

/// Exit code for a sweep interrupted by the user
pub const EXIT_CANCELLED: i32 = 130;

/// Exit code for every other fatal error
pub const EXIT_FAILURE: i32 = 1;

/// Custom error type for CLI-specific errors
#[derive(Debug)]
pub enum CliError {
    /// Configuration file or flags are invalid
    ConfigError(String),
    /// The sweep stopped before every configuration was measured
    SweepAborted(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            CliError::SweepAborted(msg) => write!(f, "Sweep aborted: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, anyhow::Error>;

/// Process exit code for a fatal error
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<HarnessError>() {
        Some(HarnessError::Cancelled) => EXIT_CANCELLED,
        _ => EXIT_FAILURE,
    }
}

/// Write every captured engine line verbatim, if the error carries any
///
/// Returns the number of lines written.
pub fn dump_captured_output<W: Write>(error: &anyhow::Error, out: &mut W) -> usize {
    let Some(lines) = error
        .downcast_ref::<HarnessError>()
        .and_then(HarnessError::captured_lines)
    else {
        return 0;
    };

    let _ = writeln!(out, "---- engine output ({} line(s)) ----", lines.len());
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out, "---- end of engine output ----");
    let _ = out.flush();
    lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_config_error_display() {
        let error = CliError::ConfigError("trials must be at least 1".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: trials must be at least 1"
        );
    }

    #[test]
    fn test_sweep_aborted_display() {
        let error = CliError::SweepAborted("1 of 3 sizes measured".to_string());
        assert_eq!(error.to_string(), "Sweep aborted: 1 of 3 sizes measured");
    }

    #[test]
    fn test_exit_codes() {
        let cancelled = anyhow::Error::new(HarnessError::Cancelled);
        assert_eq!(exit_code(&cancelled), EXIT_CANCELLED);

        let other = anyhow::anyhow!("boom");
        assert_eq!(exit_code(&other), EXIT_FAILURE);
    }

    #[test]
    fn test_dump_through_context() {
        let error: anyhow::Error = Err::<(), _>(HarnessError::OutputFormat {
            reason: "no timing line".to_string(),
            lines: vec!["first".to_string(), "  second  ".to_string()],
        })
        .context("measuring 1000 cells")
        .unwrap_err();

        let mut out = Vec::new();
        assert_eq!(dump_captured_output(&error, &mut out), 2);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\nfirst\n  second  \n"));
    }

    #[test]
    fn test_dump_without_captured_lines() {
        let error = anyhow::Error::new(HarnessError::Cancelled);
        let mut out = Vec::new();
        assert_eq!(dump_captured_output(&error, &mut out), 0);
        assert!(out.is_empty());
    }
}
