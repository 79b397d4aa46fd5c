//! Thread-scaling measurement harness for the CATS traffic simulation engine
//!
//! The harness sweeps problem size × thread count, runs the external engine
//! once per trial, averages the reported elapsed times, normalizes them into
//! speedup curves, and renders those curves as a log-log chart.
//!
//! ```rust,ignore
//! use cats_scaling_core::{HarnessConfig, NoopObserver, SpeedupChart, SweepController};
//!
//! let config = HarnessConfig::default();
//! let controller = SweepController::new(config.plan(), config.aggregator()?);
//! let mut engine = config.engine_process(Default::default());
//! let series = controller.run(
//!     &config.input_template()?,
//!     &config.engine.work_dir,
//!     &mut engine,
//!     &mut NoopObserver,
//! )?;
//! config
//!     .chart_renderer()
//!     .render(&SpeedupChart::build(&series, &config.sweep.threads))?;
//! ```

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod report;
pub mod sweep;
pub mod types;

pub use aggregate::TrialAggregator;
pub use chart::{ChartRenderer, SpeedupChart};
pub use config::HarnessConfig;
pub use engine::{parse_elapsed, stage_engine, CancelFlag, EngineProcess, TimingSource};
pub use error::{HarnessError, HarnessResult};
pub use input::InputTemplate;
pub use report::SweepReport;
pub use sweep::{
    NoopObserver, SpeedupPoint, SpeedupSeries, SweepController, SweepFailure, SweepObserver,
    SweepPlan,
};
pub use types::{AggregatedMeasurement, ProblemSize, SweepConfiguration, ThreadCounts};
