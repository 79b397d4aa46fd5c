//! Progress reporting module

use cats_scaling_core::{AggregatedMeasurement, ProblemSize, SpeedupSeries, SweepObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

/// Prints every averaged measurement and drives a progress bar
///
/// Measurements go to stdout as `<threads> <mean seconds>` lines; the bar lives
/// on stderr and is hidden in quiet mode.
pub struct ProgressReporter<W: Write> {
    progress_bar: Option<ProgressBar>,
    out: W,
}

impl ProgressReporter<io::Stdout> {
    /// Reporter writing measurements to stdout
    pub fn stdout(total_configurations: u64, quiet: bool) -> Self {
        Self::new(io::stdout(), total_configurations, quiet)
    }
}

impl<W: Write> ProgressReporter<W> {
    /// Create a new progress reporter
    pub fn new(out: W, total_configurations: u64, quiet: bool) -> Self {
        let progress_bar = (!quiet).then(|| {
            let pb = ProgressBar::new(total_configurations);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} runs {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        Self { progress_bar, out }
    }

    /// Finish progress reporting
    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message("Complete");
        }
    }

    /// Stop the bar without marking the sweep complete
    pub fn abandon(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.abandon_with_message("Aborted");
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: String) {
        let out = &mut self.out;
        let write = |out: &mut W| {
            if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
                log::warn!("could not print measurement: {}", e);
            }
        };
        match &self.progress_bar {
            Some(pb) => pb.suspend(|| write(out)),
            None => write(out),
        }
    }
}

impl<W: Write> SweepObserver for ProgressReporter<W> {
    fn size_started(&mut self, size: &ProblemSize) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("{} cells", size.cells));
        }
    }

    fn measurement(&mut self, measurement: &AggregatedMeasurement) {
        self.emit(format!(
            "{} {}",
            measurement.configuration.threads, measurement.mean_seconds
        ));
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
        }
    }

    fn size_finished(&mut self, series: &SpeedupSeries) {
        log::info!(
            "{} cells: speedups {:?}",
            series.cells,
            series.speedups()
        );
    }
}
