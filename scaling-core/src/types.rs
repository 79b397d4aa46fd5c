//! Sweep configuration types shared across the harness

use crate::error::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker drawn at every point of a speedup series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Diamond,
    Triangle,
    Circle,
}

/// Line and marker color of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesColor {
    Red,
    Green,
    Blue,
    Black,
}

/// Display style of one problem size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesStyle {
    pub color: SeriesColor,
    pub marker: Marker,
}

impl SeriesStyle {
    pub const fn new(color: SeriesColor, marker: Marker) -> Self {
        Self { color, marker }
    }
}

/// A problem size (road length in cells) together with its display style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSize {
    pub cells: u64,
    #[serde(flatten)]
    pub style: SeriesStyle,
}

impl ProblemSize {
    pub const fn new(cells: u64, style: SeriesStyle) -> Self {
        Self { cells, style }
    }
}

/// The compiled-in problem sizes, in sweep order
pub const DEFAULT_PROBLEM_SIZES: [ProblemSize; 3] = [
    ProblemSize::new(1_000, SeriesStyle::new(SeriesColor::Red, Marker::Diamond)),
    ProblemSize::new(10_000, SeriesStyle::new(SeriesColor::Green, Marker::Triangle)),
    ProblemSize::new(100_000, SeriesStyle::new(SeriesColor::Blue, Marker::Circle)),
];

/// The compiled-in thread counts, in sweep order
pub const DEFAULT_THREAD_COUNTS: [usize; 4] = [1, 2, 3, 4];

/// Ordered thread counts of a sweep
///
/// Always non-empty, strictly increasing, and starting at the single-thread
/// baseline that speedups are normalized against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct ThreadCounts(Vec<usize>);

impl ThreadCounts {
    /// Validate and wrap a thread-count sequence
    pub fn new(counts: Vec<usize>) -> HarnessResult<Self> {
        match counts.first() {
            None => {
                return Err(HarnessError::Config(
                    "thread counts must not be empty".to_string(),
                ))
            }
            Some(&first) if first != 1 => {
                return Err(HarnessError::Config(format!(
                    "thread counts must start at the 1-thread baseline, found {first}"
                )))
            }
            Some(_) => {}
        }

        if let Some(pair) = counts.windows(2).find(|w| w[0] >= w[1]) {
            return Err(HarnessError::Config(format!(
                "thread counts must be strictly increasing ({} then {})",
                pair[0], pair[1]
            )));
        }

        Ok(Self(counts))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Largest thread count of the sweep
    pub fn max(&self) -> usize {
        // Non-empty and increasing by construction
        self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl Default for ThreadCounts {
    fn default() -> Self {
        Self(DEFAULT_THREAD_COUNTS.to_vec())
    }
}

impl TryFrom<Vec<usize>> for ThreadCounts {
    type Error = HarnessError;

    fn try_from(counts: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(counts)
    }
}

impl From<ThreadCounts> for Vec<usize> {
    fn from(counts: ThreadCounts) -> Self {
        counts.0
    }
}

/// One point of the sweep: a problem size run with a thread count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfiguration {
    pub cells: u64,
    pub threads: usize,
}

impl fmt::Display for SweepConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cells / {} thread(s)", self.cells, self.threads)
    }
}

/// Mean elapsed time of one configuration over its trials
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMeasurement {
    pub configuration: SweepConfiguration,
    pub mean_seconds: f64,
    pub trials: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thread_counts_are_valid() {
        let counts = ThreadCounts::default();
        assert_eq!(counts.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(counts.max(), 4);
        assert!(ThreadCounts::new(DEFAULT_THREAD_COUNTS.to_vec()).is_ok());
    }

    #[test]
    fn test_thread_counts_reject_missing_baseline() {
        let err = ThreadCounts::new(vec![2, 4]).unwrap_err();
        assert!(err.to_string().contains("1-thread baseline"));
    }

    #[test]
    fn test_thread_counts_reject_unordered() {
        assert!(ThreadCounts::new(vec![1, 4, 2]).is_err());
        assert!(ThreadCounts::new(vec![1, 2, 2]).is_err());
        assert!(ThreadCounts::new(vec![]).is_err());
    }

    #[test]
    fn test_thread_counts_deserialize_validates() {
        #[derive(Deserialize)]
        struct Wrapper {
            threads: ThreadCounts,
        }

        let ok: Wrapper = toml::from_str("threads = [1, 2, 8]").unwrap();
        assert_eq!(ok.threads.max(), 8);

        let bad: Result<Wrapper, _> = toml::from_str("threads = [3, 2]");
        assert!(bad.is_err());
    }

    #[test]
    fn test_default_problem_sizes_have_distinct_styles() {
        let styles: Vec<_> = DEFAULT_PROBLEM_SIZES.iter().map(|p| p.style).collect();
        for (i, a) in styles.iter().enumerate() {
            for b in &styles[i + 1..] {
                assert_ne!(a, b);
            }
        }
        let cells: Vec<_> = DEFAULT_PROBLEM_SIZES.iter().map(|p| p.cells).collect();
        assert_eq!(cells, vec![1_000, 10_000, 100_000]);
    }
}
