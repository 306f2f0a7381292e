//! The Bench → Suite → Test state tree.
//!
//! A Bench owns its Suites and each Suite owns its Tests, stored in declaration
//! order. Back-references are keys, never pointers: `Suite::bench` holds the
//! owning Bench's key and `Test::suite` the owning Suite's key.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::errors::BenchError;
use crate::measure::Measurement;
use crate::utils::tell_time;

/// Fresh unique key such as `suite-5f0c2a9e41b7d3c8`.
pub fn unique_key(prefix: &str) -> String {
    format!("{}-{:016x}", prefix, rand::random::<u64>())
}

/// Statistical output plus the derived speed (mean + margin of error).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub measurement: Option<Measurement>,
    pub speed: Option<f64>,
}

impl Results {
    pub fn measured(measurement: Measurement) -> Self {
        Self {
            speed: Some(measurement.speed()),
            measurement: Some(measurement),
        }
    }
}

// ============================================================================
// BENCH
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bench {
    pub key: String,
    pub name: String,
    pub path: PathBuf,
    pub relative_path: String,
    pub start_time: SystemTime,
    pub end_time: Option<SystemTime>,
    /// Suites that reached a terminal state so far.
    pub progress: usize,
    pub completed: bool,
    pub errored: bool,
    pub error: Option<BenchError>,
    pub suites: Vec<Suite>,
    pub results: Results,
}

impl Bench {
    pub fn new(path: &Path, root: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            key: unique_key("bench"),
            name,
            path: path.to_path_buf(),
            relative_path: relative_path(path, root),
            start_time: SystemTime::now(),
            end_time: None,
            progress: 0,
            completed: false,
            errored: false,
            error: None,
            suites: Vec::new(),
            results: Results::default(),
        }
    }

    /// Completed or errored.
    pub fn is_terminal(&self) -> bool {
        self.completed || self.errored
    }

    pub fn suite(&self, key: &str) -> Option<&Suite> {
        self.suites.iter().find(|s| s.key == key)
    }

    pub fn suite_mut(&mut self, key: &str) -> Option<&mut Suite> {
        self.suites.iter_mut().find(|s| s.key == key)
    }

    pub fn elapsed(&self) -> String {
        tell_time([Some(self.start_time), self.end_time])
    }

    /// Marks the file itself as failed.
    pub fn fail(&mut self, error: BenchError) {
        self.errored = true;
        self.error = Some(error);
        self.end_time = Some(SystemTime::now());
    }
}

/// `./`-prefixed path of `path` below `root`, or the full path when it is outside.
pub fn relative_path(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            format!("./{}", parts.join("/"))
        }
        Err(_) => path.display().to_string(),
    }
}

// ============================================================================
// SUITE
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suite {
    pub key: String,
    /// 1-based declaration index within the Bench.
    pub index: usize,
    pub name: String,
    /// Key of the owning Bench.
    pub bench: String,
    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
    /// Tests completed so far.
    pub progress: usize,
    pub skipped: bool,
    pub completed: bool,
    pub errored: bool,
    pub errors: Vec<BenchError>,
    pub tests: Vec<Test>,
    pub results: Results,
}

impl Suite {
    pub fn new(index: usize, name: impl Into<String>, bench: &str, skipped: bool) -> Self {
        Self {
            key: unique_key("suite"),
            index,
            name: name.into(),
            bench: bench.to_string(),
            start_time: None,
            end_time: None,
            progress: 0,
            skipped,
            completed: false,
            errored: false,
            errors: Vec::new(),
            tests: Vec::new(),
            results: Results::default(),
        }
    }

    pub fn label(&self) -> String {
        format!("Suite #{}: {}", self.index, self.name)
    }

    /// Completed, skipped or errored.
    pub fn is_terminal(&self) -> bool {
        self.completed || self.errored
    }

    pub fn test(&self, key: &str) -> Option<&Test> {
        self.tests.iter().find(|t| t.key == key)
    }

    pub fn elapsed(&self) -> String {
        tell_time([self.start_time, self.end_time])
    }

    /// Tests with meaningful results.
    pub fn measured_tests(&self) -> impl Iterator<Item = &Test> {
        self.tests.iter().filter(|t| t.is_measured())
    }

    /// The measured test with the lowest speed.
    pub fn fastest(&self) -> Option<&Test> {
        self.measured_tests().min_by(|a, b| {
            a.speed()
                .partial_cmp(&b.speed())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

// ============================================================================
// TEST
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub key: String,
    /// 1-based index within the Suite.
    pub index: usize,
    pub name: String,
    /// Key of the owning Suite.
    pub suite: String,
    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
    pub skipped: bool,
    pub completed: bool,
    pub errored: bool,
    pub error: Option<BenchError>,
    pub results: Results,
}

impl Test {
    pub fn new(index: usize, name: impl Into<String>, suite: &str, skipped: bool) -> Self {
        Self {
            key: unique_key("test"),
            index,
            name: name.into(),
            suite: suite.to_string(),
            start_time: None,
            end_time: None,
            skipped,
            completed: false,
            errored: false,
            error: None,
            results: Results::default(),
        }
    }

    pub fn label(&self) -> String {
        format!("Test #{}: {}", self.index, self.name)
    }

    /// Results are only meaningful for completed, non-errored, non-skipped tests.
    pub fn is_measured(&self) -> bool {
        self.completed && !self.errored && !self.skipped
    }

    pub fn speed(&self) -> Option<f64> {
        self.is_measured().then_some(self.results.speed).flatten()
    }

    pub fn elapsed(&self) -> String {
        tell_time([self.start_time, self.end_time])
    }
}
