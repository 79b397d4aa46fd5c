//! Trial averaging

use crate::engine::TimingSource;
use crate::error::HarnessResult;
use crate::types::{AggregatedMeasurement, SweepConfiguration};
use std::num::NonZeroUsize;

/// Repeats a measurement and reports the arithmetic mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialAggregator {
    trials: NonZeroUsize,
}

impl Default for TrialAggregator {
    fn default() -> Self {
        Self {
            trials: NonZeroUsize::MIN,
        }
    }
}

impl TrialAggregator {
    pub fn new(trials: NonZeroUsize) -> Self {
        Self { trials }
    }

    pub fn trials(&self) -> usize {
        self.trials.get()
    }

    /// Measure `configuration` once per trial and average the results
    ///
    /// The first failing trial aborts the aggregate.
    pub fn aggregate<S: TimingSource + ?Sized>(
        &self,
        source: &mut S,
        configuration: SweepConfiguration,
    ) -> HarnessResult<AggregatedMeasurement> {
        let mut total = 0.0;
        for trial in 1..=self.trials.get() {
            let seconds = source.measure(configuration.threads)?;
            log::debug!(
                "{}: trial {}/{} took {}s",
                configuration,
                trial,
                self.trials,
                seconds
            );
            total += seconds;
        }

        Ok(AggregatedMeasurement {
            configuration,
            mean_seconds: total / self.trials.get() as f64,
            trials: self.trials.get(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;

    /// Replays a fixed list of timings
    struct Scripted {
        timings: Vec<HarnessResult<f64>>,
        calls: Vec<usize>,
    }

    impl TimingSource for Scripted {
        fn measure(&mut self, threads: usize) -> HarnessResult<f64> {
            self.calls.push(threads);
            self.timings.remove(0)
        }
    }

    fn config(threads: usize) -> SweepConfiguration {
        SweepConfiguration {
            cells: 1000,
            threads,
        }
    }

    #[test]
    fn test_default_is_single_trial() {
        let aggregator = TrialAggregator::default();
        assert_eq!(aggregator.trials(), 1);

        let mut source = Scripted {
            timings: vec![Ok(2.5)],
            calls: Vec::new(),
        };
        let measurement = aggregator.aggregate(&mut source, config(2)).unwrap();
        assert_eq!(measurement.mean_seconds, 2.5);
        assert_eq!(measurement.trials, 1);
        assert_eq!(source.calls, vec![2]);
    }

    #[test]
    fn test_mean_over_trials() {
        let aggregator = TrialAggregator::new(NonZeroUsize::new(4).unwrap());
        let mut source = Scripted {
            timings: vec![Ok(1.0), Ok(2.0), Ok(3.0), Ok(6.0)],
            calls: Vec::new(),
        };

        let measurement = aggregator.aggregate(&mut source, config(3)).unwrap();
        assert_eq!(measurement.mean_seconds, 3.0);
        assert_eq!(measurement.configuration, config(3));
        assert_eq!(source.calls, vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_single_failure_fails_aggregate() {
        let aggregator = TrialAggregator::new(NonZeroUsize::new(3).unwrap());
        let mut source = Scripted {
            timings: vec![
                Ok(1.0),
                Err(HarnessError::Cancelled),
                Ok(1.0),
            ],
            calls: Vec::new(),
        };

        let err = aggregator.aggregate(&mut source, config(1)).unwrap_err();
        assert!(matches!(err, HarnessError::Cancelled));
        assert_eq!(source.calls.len(), 2);
    }

    proptest::proptest! {
        #[test]
        fn prop_mean_is_positive_for_positive_trials(
            timings in proptest::collection::vec(1e-6f64..1e6, 1..8)
        ) {
            let aggregator = TrialAggregator::new(NonZeroUsize::new(timings.len()).unwrap());
            let mut source = Scripted {
                timings: timings.iter().copied().map(Ok).collect(),
                calls: Vec::new(),
            };
            let measurement = aggregator.aggregate(&mut source, config(1)).unwrap();
            let min = timings.iter().copied().fold(f64::INFINITY, f64::min);
            let max = timings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            proptest::prop_assert!(measurement.mean_seconds > 0.0);
            proptest::prop_assert!(measurement.mean_seconds >= min * (1.0 - 1e-12));
            proptest::prop_assert!(measurement.mean_seconds <= max * (1.0 + 1e-12));
        }
    }
}
