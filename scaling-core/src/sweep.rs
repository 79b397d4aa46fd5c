//! Sweep orchestration and speedup normalization
//!
//! Problem sizes run one after another, and within a size every thread count
//! runs one after another. Nothing here is parallel: concurrent engine runs
//! would contend for the cores being measured.

use crate::aggregate::TrialAggregator;
use crate::engine::TimingSource;
use crate::error::{HarnessError, HarnessResult};
use crate::input::InputTemplate;
use crate::types::{
    AggregatedMeasurement, ProblemSize, SeriesStyle, SweepConfiguration, ThreadCounts,
    DEFAULT_PROBLEM_SIZES,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Problem sizes and thread counts of one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    pub sizes: Vec<ProblemSize>,
    pub threads: ThreadCounts,
}

impl Default for SweepPlan {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_PROBLEM_SIZES.to_vec(),
            threads: ThreadCounts::default(),
        }
    }
}

impl SweepPlan {
    /// Total number of aggregated measurements in the sweep
    pub fn configuration_count(&self) -> usize {
        self.sizes.len() * self.threads.len()
    }
}

/// Speedup at one thread count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedupPoint {
    pub threads: usize,
    pub speedup: f64,
    pub mean_seconds: f64,
}

/// Speedup curve of one problem size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedupSeries {
    pub cells: u64,
    pub style: SeriesStyle,
    pub points: Vec<SpeedupPoint>,
}

impl SpeedupSeries {
    /// Normalize averaged timings against the single-thread entry
    ///
    /// `measurements` must be in thread-count order and start at one thread.
    pub fn from_timings(
        size: ProblemSize,
        measurements: &[AggregatedMeasurement],
    ) -> HarnessResult<Self> {
        let baseline = match measurements.first() {
            Some(m) if m.configuration.threads == 1 => m,
            _ => {
                return Err(HarnessError::Config(format!(
                    "no single-thread baseline for {} cells",
                    size.cells
                )))
            }
        };

        if let Some(zero) = measurements.iter().find(|m| m.mean_seconds <= 0.0) {
            return Err(HarnessError::ZeroElapsed(zero.configuration));
        }

        let points = measurements
            .iter()
            .map(|m| SpeedupPoint {
                threads: m.configuration.threads,
                speedup: baseline.mean_seconds / m.mean_seconds,
                mean_seconds: m.mean_seconds,
            })
            .collect();

        Ok(Self {
            cells: size.cells,
            style: size.style,
            points,
        })
    }

    pub fn speedups(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.speedup).collect()
    }
}

/// Receives progress notifications while a sweep runs
pub trait SweepObserver {
    fn size_started(&mut self, _size: &ProblemSize) {}

    fn measurement(&mut self, _measurement: &AggregatedMeasurement) {}

    fn size_finished(&mut self, _series: &SpeedupSeries) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default)]
pub struct NoopObserver;

impl SweepObserver for NoopObserver {}

/// Measurements of a problem size that did not finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSize {
    pub size: ProblemSize,
    pub measurements: Vec<AggregatedMeasurement>,
}

/// A fatal sweep error together with everything measured before it
#[derive(Debug, Error)]
#[error("sweep aborted after {} completed problem size(s)", .completed.len())]
pub struct SweepFailure {
    #[source]
    pub error: HarnessError,
    pub completed: Vec<SpeedupSeries>,
    pub pending: Option<PendingSize>,
}

/// Drives input generation and measurement over a [`SweepPlan`]
#[derive(Debug, Clone)]
pub struct SweepController {
    plan: SweepPlan,
    aggregator: TrialAggregator,
}

impl SweepController {
    pub fn new(plan: SweepPlan, aggregator: TrialAggregator) -> Self {
        Self { plan, aggregator }
    }

    pub fn plan(&self) -> &SweepPlan {
        &self.plan
    }

    pub fn aggregator(&self) -> &TrialAggregator {
        &self.aggregator
    }

    /// Run the whole sweep
    ///
    /// The input file for each size is written into `work_dir` before any of
    /// that size's measurements start.
    pub fn run<S, O>(
        &self,
        template: &InputTemplate,
        work_dir: &Path,
        source: &mut S,
        observer: &mut O,
    ) -> Result<Vec<SpeedupSeries>, SweepFailure>
    where
        S: TimingSource + ?Sized,
        O: SweepObserver + ?Sized,
    {
        let mut completed = Vec::with_capacity(self.plan.sizes.len());

        for size in &self.plan.sizes {
            log::info!("sweeping {} cells", size.cells);
            observer.size_started(size);

            let mut measurements = Vec::with_capacity(self.plan.threads.len());
            let outcome = self.run_size(template, work_dir, source, observer, size, &mut measurements);

            match outcome {
                Ok(series) => {
                    observer.size_finished(&series);
                    completed.push(series);
                }
                Err(error) => {
                    let pending = (!measurements.is_empty()).then(|| PendingSize {
                        size: *size,
                        measurements,
                    });
                    return Err(SweepFailure {
                        error,
                        completed,
                        pending,
                    });
                }
            }
        }

        Ok(completed)
    }

    fn run_size<S, O>(
        &self,
        template: &InputTemplate,
        work_dir: &Path,
        source: &mut S,
        observer: &mut O,
        size: &ProblemSize,
        measurements: &mut Vec<AggregatedMeasurement>,
    ) -> HarnessResult<SpeedupSeries>
    where
        S: TimingSource + ?Sized,
        O: SweepObserver + ?Sized,
    {
        template.write(work_dir, size.cells)?;

        for threads in self.plan.threads.iter() {
            let configuration = SweepConfiguration {
                cells: size.cells,
                threads,
            };
            let measurement = self.aggregator.aggregate(source, configuration)?;
            log::info!("{}: mean {}s", configuration, measurement.mean_seconds);
            observer.measurement(&measurement);
            measurements.push(measurement);
        }

        SpeedupSeries::from_timings(*size, measurements)
    }
}
