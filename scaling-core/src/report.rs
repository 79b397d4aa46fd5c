//! JSON results of a sweep run

use crate::error::{HarnessError, HarnessResult};
use crate::sweep::{PendingSize, SpeedupSeries, SweepFailure};
use crate::types::ThreadCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default results file name
pub const DEFAULT_REPORT_FILE: &str = "speedup.json";

/// Results of one sweep, complete or interrupted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub engine: PathBuf,
    pub trials: usize,
    pub thread_counts: ThreadCounts,
    pub series: Vec<SpeedupSeries>,
    /// Measurements of the size that was running when the sweep failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingSize>,
    /// Failure message for interrupted sweeps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub complete: bool,
}

impl SweepReport {
    /// Report of a sweep that ran to completion
    pub fn complete(
        started_at: DateTime<Utc>,
        engine: PathBuf,
        trials: usize,
        thread_counts: ThreadCounts,
        series: Vec<SpeedupSeries>,
    ) -> Self {
        Self {
            started_at,
            engine,
            trials,
            thread_counts,
            series,
            pending: None,
            error: None,
            complete: true,
        }
    }

    /// Report of everything measured before `failure`
    pub fn partial(
        started_at: DateTime<Utc>,
        engine: PathBuf,
        trials: usize,
        thread_counts: ThreadCounts,
        failure: &SweepFailure,
    ) -> Self {
        Self {
            started_at,
            engine,
            trials,
            thread_counts,
            series: failure.completed.clone(),
            pending: failure.pending.clone(),
            error: Some(failure.error.to_string()),
            complete: false,
        }
    }

    /// Path of the partial report that accompanies `path`
    ///
    /// `speedup.json` becomes `speedup.partial.json`.
    pub fn partial_path(path: &Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "speedup".to_string());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "json".to_string());
        path.with_file_name(format!("{stem}.partial.{ext}"))
    }

    /// Write the report as pretty-printed JSON
    pub fn save(&self, path: &Path) -> HarnessResult<()> {
        let report_error = |reason: String| HarnessError::Report {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::create(path).map_err(|e| report_error(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| report_error(e.to_string()))?;
        writeln!(writer).map_err(|e| report_error(e.to_string()))?;
        writer.flush().map_err(|e| report_error(e.to_string()))?;

        log::info!("wrote results to {}", path.display());
        Ok(())
    }

    /// Read a report written by [`SweepReport::save`]
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let file = File::open(path).map_err(|e| HarnessError::Report {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_reader(file).map_err(|e| HarnessError::Report {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::SpeedupPoint;
    use crate::types::{AggregatedMeasurement, SweepConfiguration, DEFAULT_PROBLEM_SIZES};
    use tempfile::TempDir;

    fn series() -> Vec<SpeedupSeries> {
        vec![SpeedupSeries {
            cells: 1000,
            style: DEFAULT_PROBLEM_SIZES[0].style,
            points: vec![
                SpeedupPoint {
                    threads: 1,
                    speedup: 1.0,
                    mean_seconds: 2.0,
                },
                SpeedupPoint {
                    threads: 2,
                    speedup: 1.6,
                    mean_seconds: 1.25,
                },
            ],
        }]
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            SweepReport::partial_path(Path::new("out/speedup.json")),
            PathBuf::from("out/speedup.partial.json")
        );
        assert_eq!(
            SweepReport::partial_path(Path::new("results")),
            PathBuf::from("results.partial.json")
        );
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_REPORT_FILE);
        let report = SweepReport::complete(
            Utc::now(),
            PathBuf::from("./cats"),
            1,
            ThreadCounts::default(),
            series(),
        );

        report.save(&path).unwrap();
        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"complete\": true"));
        assert!(!json.contains("pending"));

        assert_eq!(SweepReport::load(&path).unwrap(), report);
    }

    #[test]
    fn test_partial_report_keeps_pending_measurements() {
        let failure = SweepFailure {
            error: HarnessError::Cancelled,
            completed: series(),
            pending: Some(PendingSize {
                size: DEFAULT_PROBLEM_SIZES[1],
                measurements: vec![AggregatedMeasurement {
                    configuration: SweepConfiguration {
                        cells: 10_000,
                        threads: 1,
                    },
                    mean_seconds: 9.5,
                    trials: 1,
                }],
            }),
        };

        let report = SweepReport::partial(
            Utc::now(),
            PathBuf::from("./cats"),
            1,
            ThreadCounts::default(),
            &failure,
        );
        assert!(!report.complete);
        assert_eq!(report.error.as_deref(), Some("sweep cancelled"));
        assert_eq!(report.series.len(), 1);
        assert_eq!(report.pending.as_ref().unwrap().measurements[0].mean_seconds, 9.5);
    }

    #[test]
    fn test_save_to_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("speedup.json");
        let report = SweepReport::complete(
            Utc::now(),
            PathBuf::from("./cats"),
            1,
            ThreadCounts::default(),
            Vec::new(),
        );
        assert!(matches!(
            report.save(&path),
            Err(HarnessError::Report { .. })
        ));
    }
}
