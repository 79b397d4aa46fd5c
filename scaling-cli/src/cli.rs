//! Command-line arguments and the sweep command

use crate::error::{CliError, CliResult};
use crate::progress::ProgressReporter;
use anyhow::Context;
use cats_scaling_core::{
    stage_engine, CancelFlag, HarnessConfig, SpeedupChart, SweepController, SweepReport,
};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

/// Measure how the CATS engine scales with worker threads
///
/// Without arguments the built-in sweep runs: three road lengths, one to four
/// threads, one trial each.
#[derive(Debug, Parser)]
#[command(name = "cats-scaling", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Engine executable (overrides the configuration)
    #[arg(long, value_name = "PATH")]
    pub engine: Option<PathBuf>,

    /// Directory the engine runs in (overrides the configuration)
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Engine runs averaged per configuration
    #[arg(short, long, value_name = "N")]
    pub trials: Option<usize>,

    /// Do not open the chart after the sweep
    #[arg(long)]
    pub no_display: bool,

    /// Do not write the chart file
    #[arg(long)]
    pub no_chart: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Execute the sweep
    pub fn execute(&self) -> CliResult<()> {
        self.init_logging();

        let config = self.effective_config()?;
        log::debug!("Configuration: {:?}", config);

        if self.print_config {
            print!("{}", config.to_toml()?);
            return Ok(());
        }

        if let Some(from) = &config.engine.stage_from {
            stage_engine(from, &config.engine.work_dir, &config.engine.program)
                .context("staging the engine binary")?;
        }

        let cancel = CancelFlag::new();
        let handler_flag = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || handler_flag.cancel()) {
            log::warn!("could not install Ctrl-C handler: {}", e);
        }

        run_sweep(&config, cancel, self.quiet)
    }

    /// Configuration file, then environment, then flags
    pub fn effective_config(&self) -> CliResult<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path)
                .map_err(|e| CliError::ConfigError(e.to_string()))?,
            None => HarnessConfig::default(),
        };
        config
            .apply_env()
            .map_err(|e| CliError::ConfigError(e.to_string()))?;

        if let Some(engine) = &self.engine {
            config.engine.program = engine.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            config.engine.work_dir = work_dir.clone();
        }
        if let Some(trials) = self.trials {
            config.sweep.trials = trials;
        }
        if self.no_display {
            config.output.display = false;
        }
        if self.no_chart {
            config.output.write_chart = false;
        }

        config
            .validate()
            .map_err(|e| CliError::ConfigError(e.to_string()))?;
        Ok(config)
    }

    /// Initialize logging based on verbosity level
    fn init_logging(&self) {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        if !self.quiet {
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or(log_level),
            )
            .try_init();
        }
    }
}

/// Run the configured sweep, persist its results, and render the chart
pub fn run_sweep(config: &HarnessConfig, cancel: CancelFlag, quiet: bool) -> CliResult<()> {
    let started_at = Utc::now();
    let plan = config.plan();
    let controller = SweepController::new(plan.clone(), config.aggregator()?);
    let template = config.input_template()?;
    let mut engine = config.engine_process(cancel);
    let mut reporter = ProgressReporter::stdout(plan.configuration_count() as u64, quiet);

    log::info!(
        "Sweeping {} size(s) x {} thread count(s) with {}",
        plan.sizes.len(),
        plan.threads.len(),
        engine.resolved_program().display()
    );

    let outcome = controller.run(&template, &config.engine.work_dir, &mut engine, &mut reporter);
    let trials = controller.aggregator().trials();

    let series = match outcome {
        Ok(series) => {
            reporter.finish();
            series
        }
        Err(failure) => {
            reporter.abandon();
            if let Some(path) = config.output.results_path() {
                let partial_path = SweepReport::partial_path(path);
                let report = SweepReport::partial(
                    started_at,
                    config.engine.program.clone(),
                    trials,
                    plan.threads.clone(),
                    &failure,
                );
                match report.save(&partial_path) {
                    Ok(()) => eprintln!("Partial results saved to {}", partial_path.display()),
                    Err(e) => log::error!("could not save partial results: {}", e),
                }
            }

            let summary = format!(
                "{} of {} problem size(s) completed",
                failure.completed.len(),
                plan.sizes.len()
            );
            return Err(anyhow::Error::new(failure.error).context(CliError::SweepAborted(summary)));
        }
    };

    if let Some(path) = config.output.results_path() {
        SweepReport::complete(
            started_at,
            config.engine.program.clone(),
            trials,
            plan.threads.clone(),
            series.clone(),
        )
        .save(path)?;
    }

    let chart = SpeedupChart::build(&series, &plan.threads);
    if let Some(path) = config.chart_renderer().render(&chart)? {
        if !quiet {
            eprintln!("Chart written to {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_arguments_is_builtin_sweep() {
        let cli = Cli::try_parse_from(["cats-scaling"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.print_config);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "cats-scaling",
            "--engine",
            "/opt/cats",
            "--work-dir",
            "/tmp/run",
            "--trials",
            "3",
            "--no-display",
            "--no-chart",
        ])
        .unwrap();

        let config = cli.effective_config().unwrap();
        assert_eq!(config.engine.program, PathBuf::from("/opt/cats"));
        assert_eq!(config.engine.work_dir, PathBuf::from("/tmp/run"));
        assert_eq!(config.sweep.trials, 3);
        assert!(!config.output.display);
        assert!(config.output.chart_path().is_none());
    }

    #[test]
    fn test_zero_trials_rejected() {
        let cli = Cli::try_parse_from(["cats-scaling", "--trials", "0"]).unwrap();
        let err = cli.effective_config().unwrap_err();
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_verbose_count() {
        let cli = Cli::try_parse_from(["cats-scaling", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
