//! Reporters render a completed [`Stack`].
//!
//! A reporter is invoked exactly once per run, after every Bench reached a
//! terminal state. It either writes its output somewhere (console, file) or
//! returns it as a string.

pub mod console;
pub mod html;
pub mod json;

pub use console::ConsoleReporter;
pub use html::HtmlReporter;
pub use json::JsonReporter;

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::errors::BarbellError;
use crate::model::{Suite, Test};
use crate::stack::Stack;
use crate::utils::{format_number, round};

pub trait Reporter: Send + Sync {
    fn name(&self) -> &str;

    /// Renders `stack`. A returned string is handed back to the caller.
    fn report(&self, stack: &Stack, config: &Config) -> Result<Option<String>, BarbellError>;
}

// ============================================================================
// OUTPUT FORMAT
// ============================================================================

/// Where a file-capable reporter sends its output (`reporterConfig.outputFormat`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    File,
    Return,
}

impl OutputFormat {
    pub fn from_config(config: &Config, default: OutputFormat) -> Result<Self, BarbellError> {
        match config.reporter_option("outputFormat") {
            None => Ok(default),
            Some("file") => Ok(OutputFormat::File),
            Some("return") => Ok(OutputFormat::Return),
            Some(other) => Err(BarbellError::InvalidConfig(format!(
                "unknown reporterConfig.outputFormat '{}' (expected \"file\" or \"return\")",
                other
            ))),
        }
    }
}

/// `<outputDir>/<outputFileName>`, with relative directories resolved against
/// the root directory.
pub fn output_path(config: &Config, default_file_name: &str) -> PathBuf {
    let dir = config
        .reporter_option("outputDir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("coverage").join("barbell"));
    let dir = if dir.is_absolute() {
        dir
    } else {
        config.root_dir.join(dir)
    };
    let file_name = config
        .reporter_option("outputFileName")
        .unwrap_or(default_file_name);
    dir.join(file_name)
}

/// Writes `content` to `path`, creating missing directories.
pub fn write_output(path: &Path, content: &str) -> Result<(), BarbellError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BarbellError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| BarbellError::io(path, e))
}

// ============================================================================
// RANKING
// ============================================================================

/// A test in report order.
#[derive(Debug, Clone)]
pub struct Ranked<'a> {
    pub test: &'a Test,
    /// 0-based position among measured tests, fastest first.
    pub rank: Option<usize>,
    /// Relative speed in `0.0..=1.0` (1.0 is the fastest), when more than one
    /// test was measured.
    pub relative: Option<f64>,
}

/// Orders a suite's tests for display: unmeasured tests (errored or skipped)
/// first in declaration order, then measured tests from fastest to slowest.
pub fn rank_tests(suite: &Suite) -> Vec<Ranked<'_>> {
    let mut measured: Vec<(&Test, f64)> = suite
        .tests
        .iter()
        .filter_map(|test| test.speed().map(|speed| (test, speed)))
        .collect();
    measured.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let fastest = measured.first().map(|(_, speed)| *speed);
    let slowest = measured.last().map(|(_, speed)| *speed);
    let compare = measured.len() > 1;

    let mut ranked: Vec<Ranked<'_>> = suite
        .tests
        .iter()
        .filter(|test| test.speed().is_none())
        .map(|test| Ranked {
            test,
            rank: None,
            relative: None,
        })
        .collect();
    ranked.extend(measured.iter().enumerate().map(|(rank, (test, speed))| {
        let relative = match (compare, fastest, slowest) {
            (true, Some(fastest), Some(slowest)) if slowest > fastest => {
                Some((slowest - speed) / (slowest - fastest))
            }
            (true, _, _) => Some(1.0),
            _ => None,
        };
        Ranked {
            test,
            rank: Some(rank),
            relative,
        }
    }));
    ranked
}

/// `1,234 ops/sec ± 1.25 % (20 runs sampled)`
pub fn describe_results(test: &Test) -> Option<String> {
    let measurement = test.results.measurement.as_ref()?;
    let hz = measurement.hz;
    let size = measurement.stats.sample.len();
    Some(format!(
        "{} ops/sec ± {:.2} % ({} run{} sampled)",
        format_number(round(hz, if hz < 100.0 { 2 } else { 0 })),
        measurement.stats.rme,
        size,
        if size == 1 { "" } else { "s" }
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{Measurement, Stats};
    use crate::model::Results;

    fn measured(index: usize, mean: f64) -> Test {
        let mut test = Test::new(index, format!("t{}", index), "suite", false);
        test.completed = true;
        test.results = Results::measured(Measurement {
            stats: Stats {
                mean,
                rme: 1.234,
                sample: vec![mean; 3],
                ..Default::default()
            },
            hz: 1.0 / mean,
            count: 1,
            elapsed: 0.0,
        });
        test
    }

    #[test]
    fn unmeasured_first_then_fastest() {
        let mut suite = Suite::new(1, "s", "bench", false);
        let mut errored = Test::new(2, "bad", "suite", false);
        errored.errored = true;
        suite.tests = vec![measured(1, 0.004), errored, measured(3, 0.001), measured(4, 0.002)];

        let ranked = rank_tests(&suite);
        let order: Vec<usize> = ranked.iter().map(|r| r.test.index).collect();
        assert_eq!(order, vec![2, 3, 4, 1]);
        assert_eq!(ranked[1].rank, Some(0));
        assert_eq!(ranked[1].relative, Some(1.0));
        assert_eq!(ranked[3].relative, Some(0.0));
        assert!((ranked[2].relative.unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn single_measured_test_has_no_bar() {
        let mut suite = Suite::new(1, "s", "bench", false);
        suite.tests = vec![measured(1, 0.5)];
        assert_eq!(rank_tests(&suite)[0].relative, None);
    }

    #[test]
    fn result_lines() {
        assert_eq!(
            describe_results(&measured(1, 0.0001)).unwrap(),
            "10,000 ops/sec ± 1.23 % (3 runs sampled)"
        );
        assert_eq!(
            describe_results(&measured(1, 0.3)).unwrap(),
            "3.33 ops/sec ± 1.23 % (3 runs sampled)"
        );
    }
}
