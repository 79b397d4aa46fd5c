//! Harness configuration
//!
//! Every section has defaults, so an empty file (or no file at all) reproduces
//! the built-in sweep. Environment variables override the file for the knobs
//! most often tweaked between runs.

use crate::aggregate::TrialAggregator;
use crate::chart::{ChartRenderer, DEFAULT_CHART_FILE, DEFAULT_CHART_SIZE};
use crate::engine::{
    CancelFlag, EngineProcess, DEFAULT_ENGINE_PROGRAM, DEFAULT_TIMEOUT, DEFAULT_TIMING_LABEL,
};
use crate::error::{HarnessError, HarnessResult};
use crate::input::{InputTemplate, DEFAULT_CONSTANT_FIELDS, DEFAULT_INPUT_FILE};
use crate::report::DEFAULT_REPORT_FILE;
use crate::sweep::SweepPlan;
use crate::types::{ProblemSize, ThreadCounts, DEFAULT_PROBLEM_SIZES};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the trial count
pub const TRIALS_ENV: &str = "CATS_SCALING_TRIALS";

/// Environment variable overriding the per-run timeout in seconds
pub const TIMEOUT_ENV: &str = "CATS_SCALING_TIMEOUT_SECS";

/// Top-level harness configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct HarnessConfig {
    /// How the engine is invoked
    #[serde(default)]
    pub engine: EngineConfig,

    /// What is swept
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Constant input fields
    #[serde(default)]
    pub input: InputConfig,

    /// Where results go
    #[serde(default)]
    pub output: OutputConfig,
}

/// Engine invocation settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable; relative paths with a directory resolve against `work_dir`
    pub program: PathBuf,

    /// Directory the engine runs in and reads its input from
    pub work_dir: PathBuf,

    /// Name of the generated input file inside `work_dir`
    pub input_file: String,

    /// Label of the report line carrying the elapsed time
    pub timing_label: String,

    /// Per-invocation limit in seconds (0 = no limit)
    pub timeout_secs: u64,

    /// Freshly built engine to copy into `work_dir` before the sweep
    pub stage_from: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_ENGINE_PROGRAM),
            work_dir: PathBuf::from("."),
            input_file: DEFAULT_INPUT_FILE.to_string(),
            timing_label: DEFAULT_TIMING_LABEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            stage_from: None,
        }
    }
}

/// Sweep dimensions
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SweepConfig {
    pub sizes: Vec<ProblemSize>,
    pub threads: ThreadCounts,
    /// Engine runs averaged per configuration
    pub trials: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_PROBLEM_SIZES.to_vec(),
            threads: ThreadCounts::default(),
            trials: 1,
        }
    }
}

/// Input file constants
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    /// The ten fields around the problem size, in file order
    pub constants: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            constants: DEFAULT_CONSTANT_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Output artifacts
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Chart file
    pub chart: PathBuf,

    /// Write the chart file
    pub write_chart: bool,

    /// JSON results file
    pub results: PathBuf,

    /// Write the JSON results file
    pub write_results: bool,

    /// Open the chart in a viewer after the sweep
    pub display: bool,

    /// Edge length of the square chart in pixels
    pub chart_size: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            chart: PathBuf::from(DEFAULT_CHART_FILE),
            write_chart: true,
            results: PathBuf::from(DEFAULT_REPORT_FILE),
            write_results: true,
            display: true,
            chart_size: DEFAULT_CHART_SIZE,
        }
    }
}

impl OutputConfig {
    /// Chart path, if the chart is written
    pub fn chart_path(&self) -> Option<&Path> {
        self.write_chart.then_some(self.chart.as_path())
    }

    /// Results path, if results are written
    pub fn results_path(&self) -> Option<&Path> {
        self.write_results.then_some(self.results.as_path())
    }
}

impl HarnessConfig {
    /// Load a TOML configuration file
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|e| HarnessError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse and validate TOML configuration text
    pub fn from_toml(content: &str) -> HarnessResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> HarnessResult<String> {
        toml::to_string_pretty(self).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Apply `CATS_SCALING_*` environment overrides
    pub fn apply_env(&mut self) -> HarnessResult<()> {
        self.apply_overrides(env::var(TRIALS_ENV).ok(), env::var(TIMEOUT_ENV).ok())
    }

    fn apply_overrides(
        &mut self,
        trials: Option<String>,
        timeout_secs: Option<String>,
    ) -> HarnessResult<()> {
        if let Some(value) = trials {
            self.sweep.trials = value.trim().parse().map_err(|_| {
                HarnessError::Config(format!("{TRIALS_ENV} must be a positive integer, got {value:?}"))
            })?;
        }
        if let Some(value) = timeout_secs {
            self.engine.timeout_secs = value.trim().parse().map_err(|_| {
                HarnessError::Config(format!("{TIMEOUT_ENV} must be a number of seconds, got {value:?}"))
            })?;
        }
        self.validate()
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> HarnessResult<()> {
        if self.sweep.trials == 0 {
            return Err(HarnessError::Config("trials must be at least 1".to_string()));
        }
        if self.sweep.sizes.is_empty() {
            return Err(HarnessError::Config(
                "at least one problem size is required".to_string(),
            ));
        }
        if let Some(size) = self.sweep.sizes.iter().find(|s| s.cells == 0) {
            return Err(HarnessError::Config(format!(
                "problem size {} is not positive",
                size.cells
            )));
        }
        if self.engine.timing_label.trim().is_empty() {
            return Err(HarnessError::Config("timing_label must not be empty".to_string()));
        }
        self.input_template().map(|_| ())
    }

    pub fn plan(&self) -> SweepPlan {
        SweepPlan {
            sizes: self.sweep.sizes.clone(),
            threads: self.sweep.threads.clone(),
        }
    }

    pub fn aggregator(&self) -> HarnessResult<TrialAggregator> {
        NonZeroUsize::new(self.sweep.trials)
            .map(TrialAggregator::new)
            .ok_or_else(|| HarnessError::Config("trials must be at least 1".to_string()))
    }

    pub fn input_template(&self) -> HarnessResult<InputTemplate> {
        InputTemplate::new(self.input.constants.clone(), self.engine.input_file.clone())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.engine.timeout_secs > 0).then(|| Duration::from_secs(self.engine.timeout_secs))
    }

    /// Build the engine runner described by this configuration
    pub fn engine_process(&self, cancel: CancelFlag) -> EngineProcess {
        EngineProcess::new(self.engine.program.clone(), self.engine.work_dir.clone())
            .with_timing_label(self.engine.timing_label.clone())
            .with_timeout(self.timeout())
            .with_cancel_flag(cancel)
    }

    pub fn chart_renderer(&self) -> ChartRenderer {
        ChartRenderer::default()
            .with_output(self.output.chart_path().map(Path::to_path_buf))
            .with_display(self.output.display)
            .with_size(self.output.chart_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Marker, SeriesColor};

    #[test]
    fn test_empty_file_is_builtin_sweep() {
        let config = HarnessConfig::from_toml("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.plan(), SweepPlan::default());
        assert_eq!(config.aggregator().unwrap().trials(), 1);
        assert_eq!(config.timeout(), Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn test_partial_sections() {
        let config = HarnessConfig::from_toml(
            r#"
[engine]
program = "/opt/cats/bin/cats"
timeout_secs = 0

[sweep]
threads = [1, 2, 4, 8]
trials = 3
sizes = [
    { cells = 500, color = "black", marker = "circle" },
]
"#,
        )
        .unwrap();

        assert_eq!(config.engine.program, PathBuf::from("/opt/cats/bin/cats"));
        assert_eq!(config.engine.timing_label, DEFAULT_TIMING_LABEL);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.sweep.threads.as_slice(), &[1, 2, 4, 8]);
        assert_eq!(config.sweep.trials, 3);
        assert_eq!(config.sweep.sizes.len(), 1);
        assert_eq!(config.sweep.sizes[0].style.color, SeriesColor::Black);
        assert_eq!(config.sweep.sizes[0].style.marker, Marker::Circle);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_rejects_invalid_threads() {
        let err = HarnessConfig::from_toml("[sweep]\nthreads = [2, 4]").unwrap_err();
        assert!(err.to_string().contains("baseline"));
    }

    #[test]
    fn test_rejects_zero_trials() {
        assert!(HarnessConfig::from_toml("[sweep]\ntrials = 0").is_err());
    }

    #[test]
    fn test_rejects_wrong_constant_count() {
        let err = HarnessConfig::from_toml("[input]\nconstants = [\"1\", \"2\"]").unwrap_err();
        assert!(err.to_string().contains("10 constant fields"));
    }

    #[test]
    fn test_rejects_unknown_marker() {
        let toml = "[sweep]\nsizes = [{ cells = 10, color = \"red\", marker = \"star\" }]";
        assert!(HarnessConfig::from_toml(toml).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = HarnessConfig::default();
        config
            .apply_overrides(Some("5".to_string()), Some(" 90 ".to_string()))
            .unwrap();
        assert_eq!(config.sweep.trials, 5);
        assert_eq!(config.timeout(), Some(Duration::from_secs(90)));

        assert!(config.apply_overrides(Some("many".to_string()), None).is_err());
        assert!(config.apply_overrides(Some("0".to_string()), None).is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = HarnessConfig::default().to_toml().unwrap();
        assert!(text.contains("[engine]"));
        assert!(text.contains("total computation time"));
        assert_eq!(HarnessConfig::from_toml(&text).unwrap(), HarnessConfig::default());
    }

    #[test]
    fn test_disabled_outputs_survive_round_trip() {
        let mut config = HarnessConfig::default();
        config.output.write_chart = false;
        config.output.write_results = false;

        let reloaded = HarnessConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.output.chart_path(), None);
        assert_eq!(reloaded.output.results_path(), None);
        assert_eq!(
            HarnessConfig::default().output.chart_path(),
            Some(Path::new(DEFAULT_CHART_FILE))
        );
    }

    #[test]
    fn test_from_file_missing() {
        let err = HarnessConfig::from_file(Path::new("/nonexistent/cats.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
