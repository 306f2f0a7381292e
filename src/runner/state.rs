//! Run state for one bench file.
//!
//! [`BenchRun`] is the only writer of its Bench. It applies every state
//! transition (suite and test declaration, suite errors, measurement results),
//! emits the matching progress message and owns the single completion gate:
//! once registration has closed, the Bench completes when its suite progress
//! counter reaches the number of declared suites.

use std::collections::HashMap;
use std::time::SystemTime;
use tracing::warn;

use crate::ast::Span;
use crate::errors::{BenchError, ScriptError};
use crate::measure::Measurement;
use crate::model::{Results, Suite, Test};
use crate::progress::ProgressSender;
use crate::runtime::Value;
use crate::stack::{lock, BenchHandle};

/// A test body waiting to be measured.
#[derive(Clone)]
pub(crate) struct TestBody {
    pub callable: Value,
    pub span: Span,
}

pub(crate) struct BenchRun {
    handle: BenchHandle,
    sender: ProgressSender,
    stop_on_errors: bool,
    relative_path: String,
    /// File name, used to name the suite that wraps bare tests.
    pub file_name: String,
    /// Key of the suite whose registration callback is running.
    pub current: Option<String>,
    /// Set once the file has finished declaring suites.
    pub closed: bool,
    bodies: HashMap<String, TestBody>,
}

impl BenchRun {
    pub fn new(handle: BenchHandle, sender: ProgressSender, stop_on_errors: bool) -> Self {
        let (file_name, relative_path) = {
            let bench = lock(&handle);
            (bench.name.clone(), bench.relative_path.clone())
        };
        Self {
            handle,
            sender,
            stop_on_errors,
            relative_path,
            file_name,
            current: None,
            closed: false,
            bodies: HashMap::new(),
        }
    }

    fn message(&self, text: String) {
        self.sender.message(text);
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    /// Appends a new suite with the next index and returns its key.
    pub fn declare_suite(&mut self, name: &str, skipped: bool) -> String {
        let mut bench = lock(&self.handle);
        let index = bench.suites.len() + 1;
        let suite = Suite::new(index, name, &bench.key, skipped);
        let key = suite.key.clone();
        bench.suites.push(suite);
        key
    }

    /// Appends a test to the given suite. Tests of a skipped suite are skipped too.
    pub fn declare_test(&mut self, suite_key: &str, name: &str, body: TestBody, skipped: bool) {
        let mut bench = lock(&self.handle);
        let Some(suite) = bench.suite_mut(suite_key) else {
            return;
        };
        let index = suite.tests.len() + 1;
        let test = Test::new(index, name, &suite.key, suite.skipped || skipped);
        let message = if test.skipped {
            format!("Skipped Test #{}: {} in {}", index, name, suite.label())
        } else {
            self.bodies.insert(test.key.clone(), body);
            format!("Added Test #{}: {} to {}", index, name, suite.label())
        };
        suite.tests.push(test);
        drop(bench);
        self.message(message);
    }

    /// Called once a suite's registration callback returned normally.
    pub fn suite_declared(&mut self, suite_key: &str) {
        let mut bench = lock(&self.handle);
        let Some(suite) = bench.suite_mut(suite_key) else {
            return;
        };
        if suite.skipped {
            suite.completed = true;
            suite.end_time = Some(SystemTime::now());
            let message = format!("Skipped {}", suite.label());
            drop(bench);
            self.message(message);
            self.advance();
        } else {
            let message = format!("Added suite {}", suite.name);
            drop(bench);
            self.message(message);
        }
    }

    /// Records an error thrown by a suite's registration callback. The suite is
    /// terminal from here on. With fail-fast the stream fails and the error is
    /// handed back so the script aborts.
    pub fn suite_failed(&mut self, suite_key: &str, error: ScriptError) -> Result<(), ScriptError> {
        let mut bench = lock(&self.handle);
        let Some(suite) = bench.suite_mut(suite_key) else {
            return Ok(());
        };
        suite.errored = true;
        suite.errors.push(BenchError::Script(error.clone()));
        suite.end_time = Some(SystemTime::now());
        let label = suite.label();
        drop(bench);

        if self.stop_on_errors {
            tracing::error!(bench = %self.relative_path, suite = %label, error = %error, "suite failed");
            self.sender.fail(BenchError::Script(error.clone()));
            return Err(error);
        }
        warn!(bench = %self.relative_path, suite = %label, error = %error, "suite failed");
        self.message(format!("Error occurred when running {}", label));
        self.advance();
        Ok(())
    }

    /// Ends the registration phase. Returns `false` when the file declared no
    /// suites at all.
    pub fn close(&mut self) -> bool {
        self.closed = true;
        self.current = None;
        if lock(&self.handle).suites.is_empty() {
            return false;
        }
        self.check_completion();
        true
    }

    // ========================================================================
    // FILE-LEVEL OUTCOMES
    // ========================================================================

    /// The file declared no suites: the Bench is errored and completed.
    pub fn no_suites(&mut self) {
        let error = {
            let mut bench = lock(&self.handle);
            let error = BenchError::NoSuites {
                name: bench.name.clone(),
            };
            bench.completed = true;
            bench.errored = true;
            bench.error = Some(error.clone());
            bench.end_time = Some(SystemTime::now());
            error
        };
        self.finish_with_error(error.clone(), error.to_string());
    }

    /// Loading or running the file failed outside any suite callback.
    pub fn file_failed(&mut self, error: BenchError) {
        self.closed = true;
        self.current = None;
        let name = {
            let mut bench = lock(&self.handle);
            bench.fail(error.clone());
            bench.name.clone()
        };
        self.finish_with_error(error, format!("Error occurred in bench {}", name));
    }

    fn finish_with_error(&mut self, error: BenchError, message: String) {
        self.bodies.clear();
        if self.stop_on_errors {
            tracing::error!(bench = %self.relative_path, error = %error, "bench failed");
            self.sender.fail(error);
        } else {
            warn!(bench = %self.relative_path, error = %error, "bench failed");
            self.message(message);
            self.sender.complete();
        }
    }

    // ========================================================================
    // MEASUREMENT
    // ========================================================================

    /// Suites to measure, in declaration order, with the bodies of their
    /// non-skipped tests.
    pub fn take_schedule(&mut self) -> Vec<(String, Vec<(String, TestBody)>)> {
        let bench = lock(&self.handle);
        let schedule = bench
            .suites
            .iter()
            .filter(|suite| !suite.skipped && !suite.errored)
            .map(|suite| {
                let tests = suite
                    .tests
                    .iter()
                    .filter_map(|test| {
                        self.bodies
                            .get(&test.key)
                            .map(|body| (test.key.clone(), body.clone()))
                    })
                    .collect();
                (suite.key.clone(), tests)
            })
            .collect();
        drop(bench);
        self.bodies.clear();
        schedule
    }

    pub fn suite_started(&mut self, suite_key: &str) {
        let mut bench = lock(&self.handle);
        let Some(suite) = bench.suite_mut(suite_key) else {
            return;
        };
        suite.start_time = Some(SystemTime::now());
        let message = format!("Repping {}...", suite.label());
        drop(bench);
        self.message(message);
    }

    pub fn test_started(&mut self, suite_key: &str, test_key: &str) {
        let message = self.with_test(suite_key, test_key, |suite_label, test| {
            test.start_time = Some(SystemTime::now());
            format!("Repping {} ⇒ {}...", suite_label, test.label())
        });
        if let Some(message) = message {
            self.message(message);
        }
    }

    pub fn test_completed(&mut self, suite_key: &str, test_key: &str, measurement: Measurement) {
        let message = self.with_test(suite_key, test_key, |suite_label, test| {
            test.completed = true;
            test.end_time = Some(SystemTime::now());
            test.results = Results::measured(measurement);
            format!("Completed {} ⇒ {} ({})", suite_label, test.label(), test.elapsed())
        });
        if let Some(suite) = lock(&self.handle).suite_mut(suite_key) {
            suite.progress += 1;
        }
        if let Some(message) = message {
            self.message(message);
        }
    }

    /// Records a failed measurement. Returns `false` when the run must stop.
    pub fn test_failed(&mut self, suite_key: &str, test_key: &str, error: ScriptError) -> bool {
        let error = BenchError::Script(error);
        let message = self.with_test(suite_key, test_key, |suite_label, test| {
            test.errored = true;
            test.error = Some(error.clone());
            test.end_time = Some(SystemTime::now());
            format!("Error in {} ⇒ {}!", suite_label, test.label())
        });

        if self.stop_on_errors {
            tracing::error!(bench = %self.relative_path, error = %error, "test failed");
            self.sender.fail(error);
            return false;
        }
        warn!(bench = %self.relative_path, error = %error, "test failed");
        if let Some(message) = message {
            self.message(message);
        }
        true
    }

    pub fn suite_completed(&mut self, suite_key: &str) {
        let mut bench = lock(&self.handle);
        let Some(suite) = bench.suite_mut(suite_key) else {
            return;
        };
        suite.completed = true;
        suite.end_time = Some(SystemTime::now());
        suite.results.speed = suite.fastest().and_then(|test| test.speed());
        let message = format!("Completed {} ({})", suite.label(), suite.elapsed());
        drop(bench);
        self.message(message);
        self.advance();
    }

    fn with_test<R>(
        &self,
        suite_key: &str,
        test_key: &str,
        update: impl FnOnce(&str, &mut Test) -> R,
    ) -> Option<R> {
        let mut bench = lock(&self.handle);
        let suite = bench.suite_mut(suite_key)?;
        let label = suite.label();
        let test = suite.tests.iter_mut().find(|t| t.key == test_key)?;
        Some(update(&label, test))
    }

    // ========================================================================
    // COMPLETION GATE
    // ========================================================================

    /// One more suite reached a terminal state.
    fn advance(&mut self) {
        let progress = {
            let mut bench = lock(&self.handle);
            bench.progress += 1;
            bench.progress
        };
        self.sender.advanced(progress);
        if self.closed {
            self.check_completion();
        }
    }

    fn check_completion(&mut self) {
        let mut bench = lock(&self.handle);
        if bench.is_terminal() || bench.progress < bench.suites.len() {
            return;
        }
        bench.completed = true;
        bench.end_time = Some(SystemTime::now());
        bench.results.speed = bench
            .suites
            .iter()
            .filter_map(|suite| suite.results.speed)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let message = format!("Benched {} test suites ({})", bench.progress, bench.elapsed());
        drop(bench);
        self.message(message);
        self.sender.complete();
    }
}
