//! Measurement primitive
//!
//! Times a routine the way benchmark.js-style harnesses do: one probe call
//! calibrates how many iterations make up a sample, then samples are collected
//! until both the minimum sample count and the time budget are satisfied. Each
//! sample is the mean seconds per iteration of its batch.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Student-t critical values for a two-tailed 95% confidence interval, indexed by
/// degrees of freedom (1..=30).
const T_TABLE: [f64; 30] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.16,
    2.145, 2.131, 2.12, 2.11, 2.101, 2.093, 2.086, 2.08, 2.074, 2.069, 2.064, 2.06, 2.056, 2.052,
    2.048, 2.045, 2.042,
];

/// Critical value used once degrees of freedom exceed the table.
const T_INFINITY: f64 = 1.96;

/// Sampling tunables, read from the `measure` section of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeasureOptions {
    /// Minimum number of samples per test.
    pub min_samples: usize,
    /// Time budget per test, in seconds.
    pub max_time: f64,
    /// Target duration of one sample, in seconds.
    pub min_time: f64,
    /// Upper bound on iterations per sample.
    pub max_iterations: u64,
}

impl Default for MeasureOptions {
    fn default() -> Self {
        Self {
            min_samples: 5,
            max_time: 1.0,
            min_time: 0.05,
            max_iterations: 1_000_000,
        }
    }
}

/// Statistical summary of a sample, all times in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub mean: f64,
    pub deviation: f64,
    pub variance: f64,
    /// Standard error of the mean.
    pub sem: f64,
    /// Margin of error at 95% confidence.
    pub moe: f64,
    /// Relative margin of error, in percent.
    pub rme: f64,
    pub sample: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub stats: Stats,
    /// Operations per second.
    pub hz: f64,
    /// Iterations per sample.
    pub count: u64,
    /// Wall time spent measuring, in seconds.
    pub elapsed: f64,
}

impl Measurement {
    /// Ranking scalar: mean plus margin of error. Lower is faster.
    pub fn speed(&self) -> f64 {
        self.stats.mean + self.stats.moe
    }
}

pub fn t_critical(degrees_of_freedom: usize) -> f64 {
    match degrees_of_freedom {
        0 => T_TABLE[0],
        df if df <= T_TABLE.len() => T_TABLE[df - 1],
        _ => T_INFINITY,
    }
}

/// Summarizes per-iteration timings.
pub fn summarize(sample: &[f64]) -> Stats {
    if sample.is_empty() {
        return Stats::default();
    }
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = if sample.len() < 2 {
        0.0
    } else {
        sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
    };
    let deviation = variance.sqrt();
    let sem = deviation / n.sqrt();
    let moe = sem * t_critical(sample.len() - 1);
    let rme = if mean > 0.0 { moe / mean * 100.0 } else { 0.0 };
    Stats {
        mean,
        deviation,
        variance,
        sem,
        moe,
        rme,
        sample: sample.to_vec(),
    }
}

/// Collects timed samples of a routine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sampler {
    options: MeasureOptions,
}

impl Sampler {
    pub fn new(options: MeasureOptions) -> Self {
        Self { options }
    }

    /// Measures `routine`. The first error it returns aborts measurement.
    pub fn measure<E, F>(&self, mut routine: F) -> Result<Measurement, E>
    where
        F: FnMut() -> Result<(), E>,
    {
        let started = Instant::now();

        let probe = Instant::now();
        std::hint::black_box(routine()?);
        let count = self.iterations_per_sample(probe.elapsed().as_secs_f64());

        let min_samples = self.options.min_samples.max(1);
        let mut sample = Vec::with_capacity(min_samples);
        loop {
            let batch = Instant::now();
            for _ in 0..count {
                std::hint::black_box(routine()?);
            }
            sample.push(batch.elapsed().as_secs_f64() / count as f64);

            if sample.len() >= min_samples && started.elapsed().as_secs_f64() >= self.options.max_time {
                break;
            }
        }

        let stats = summarize(&sample);
        let hz = if stats.mean > 0.0 { 1.0 / stats.mean } else { 0.0 };
        Ok(Measurement {
            stats,
            hz,
            count,
            elapsed: started.elapsed().as_secs_f64(),
        })
    }

    fn iterations_per_sample(&self, probe_seconds: f64) -> u64 {
        let cap = self.options.max_iterations.max(1);
        if probe_seconds <= 0.0 {
            return cap;
        }
        let wanted = (self.options.min_time / probe_seconds).ceil();
        if wanted.is_finite() && wanted >= 1.0 {
            (wanted as u64).min(cap)
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_options() -> MeasureOptions {
        MeasureOptions {
            min_samples: 3,
            max_time: 0.0,
            min_time: 0.0,
            max_iterations: 4,
        }
    }

    #[test]
    fn summarize_matches_hand_computed_values() {
        let stats = summarize(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.mean, 2.5);
        assert!((stats.variance - 5.0 / 3.0).abs() < 1e-12);
        assert!((stats.sem - stats.deviation / 2.0).abs() < 1e-12);
        assert!((stats.moe - stats.sem * 3.182).abs() < 1e-12);
        assert!((stats.rme - stats.moe / 2.5 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn single_sample_has_no_spread() {
        let stats = summarize(&[0.5]);
        assert_eq!(stats.mean, 0.5);
        assert_eq!(stats.moe, 0.0);
        assert_eq!(summarize(&[]), Stats::default());
    }

    #[test]
    fn t_table_bounds() {
        assert_eq!(t_critical(0), 12.706);
        assert_eq!(t_critical(1), 12.706);
        assert_eq!(t_critical(30), 2.042);
        assert_eq!(t_critical(31), 1.96);
    }

    #[test]
    fn sampler_respects_min_samples_and_iteration_cap() {
        let mut calls = 0u64;
        let measurement = Sampler::new(fast_options())
            .measure(|| {
                calls += 1;
                Ok::<(), ()>(())
            })
            .unwrap();
        assert_eq!(measurement.stats.sample.len(), 3);
        assert!(measurement.count >= 1 && measurement.count <= 4);
        assert_eq!(calls, 1 + 3 * measurement.count);
        assert!(measurement.speed() >= measurement.stats.mean);
    }

    #[test]
    fn sampler_stops_at_first_error() {
        let mut calls = 0;
        let result = Sampler::new(fast_options()).measure(|| {
            calls += 1;
            if calls == 2 {
                Err("boom")
            } else {
                Ok(())
            }
        });
        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls, 2);
    }
}
