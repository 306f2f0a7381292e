//! Runners execute one bench file and report through a progress stream.
//!
//! The built-in [`SandboxedRunner`] loads the file into a fresh [`Sandbox`] on a
//! dedicated thread and runs it in three phases:
//!
//! 1. **Load**: read and parse the file. Failure marks the Bench errored.
//! 2. **Register**: evaluate the file with the registration DSL bound. Suite
//!    callbacks run synchronously; each registered test body is kept for later.
//! 3. **Measure**: every suite that is neither skipped nor errored is measured,
//!    its tests sequentially in declaration order.
//!
//! The stream always ends with exactly one terminal event.

mod dsl;
mod state;

pub use dsl::{SUITE_FORMS, TEST_FORMS};

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use tracing::debug;

use crate::config::Config;
use crate::errors::BenchError;
use crate::measure::Sampler;
use crate::model::Bench;
use crate::plugins::DEFAULT_RUNNER;
use crate::progress::{self, ProgressSender, ProgressStream};
use crate::runtime::{output, SharedOutput};
use crate::sandbox::{Sandbox, Script};
use crate::stack::{lock, BenchHandle, Stack};
use state::BenchRun;

/// Executes one bench file.
///
/// Implementations must insert the file's Bench into `stack` before returning and
/// must end the returned stream with exactly one terminal event.
pub trait Runner: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, path: &Path, stack: &Stack, config: &Arc<Config>) -> ProgressStream;
}

/// Deep recursion in bench scripts needs more than the default thread stack.
const RUNNER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// The built-in runner for `.bb` bench scripts.
#[derive(Debug, Clone)]
pub struct SandboxedRunner {
    output: fn() -> SharedOutput,
    max_depth: Option<usize>,
}

impl Default for SandboxedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxedRunner {
    /// Script `print` output goes to stdout.
    pub fn new() -> Self {
        Self {
            output: output::stdout,
            max_depth: None,
        }
    }

    /// Script `print` output is discarded.
    pub fn silent() -> Self {
        Self {
            output: output::null,
            max_depth: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

impl Runner for SandboxedRunner {
    fn name(&self) -> &str {
        DEFAULT_RUNNER
    }

    fn run(&self, path: &Path, stack: &Stack, config: &Arc<Config>) -> ProgressStream {
        let handle = stack.insert(Bench::new(path, &config.root_dir));
        let (sender, stream) = progress::channel(path);

        let job = Job {
            path: path.to_path_buf(),
            handle: Arc::clone(&handle),
            config: Arc::clone(config),
            sender: sender.clone(),
            output: self.output,
            max_depth: self.max_depth,
        };
        let spawned = thread::Builder::new()
            .name(format!("barbell-runner:{}", path.display()))
            .stack_size(RUNNER_STACK_SIZE)
            .spawn(move || job.execute());

        if let Err(error) = spawned {
            let error = BenchError::Plugin(format!("failed to start runner thread: {}", error));
            lock(&handle).fail(error.clone());
            sender.fail(error);
        }
        stream
    }
}

// ============================================================================
// EXECUTION
// ============================================================================

struct Job {
    path: PathBuf,
    handle: BenchHandle,
    config: Arc<Config>,
    sender: ProgressSender,
    output: fn() -> SharedOutput,
    max_depth: Option<usize>,
}

impl Job {
    fn execute(self) {
        let handle = Arc::clone(&self.handle);
        let sender = self.sender.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.phases()));
        if let Err(payload) = outcome {
            if !sender.is_terminated() {
                let error = BenchError::Panicked {
                    message: panic_message(payload.as_ref()),
                };
                lock(&handle).fail(error.clone());
                sender.fail(error);
            }
        }
    }

    fn phases(self) {
        let mut sandbox = Sandbox::new((self.output)());
        if let Some(depth) = self.max_depth {
            sandbox = sandbox.with_max_depth(depth);
        }
        let run = Rc::new(RefCell::new(BenchRun::new(
            Arc::clone(&self.handle),
            self.sender.clone(),
            self.config.stop_on_errors,
        )));

        debug!(path = %self.path.display(), "loading bench file");
        let mut script = match sandbox.load(&self.path) {
            Ok(script) => script,
            Err(error) => {
                run.borrow_mut().file_failed(error);
                return;
            }
        };

        dsl::bind(&script, &run);
        let registered = script.run();
        if self.sender.is_terminated() {
            // Fail-fast already ended the stream from inside a suite callback.
            return;
        }
        if let Err(error) = registered {
            run.borrow_mut().file_failed(BenchError::Script(error));
            return;
        }
        let declared = run.borrow_mut().close();
        if !declared {
            run.borrow_mut().no_suites();
            return;
        }

        measure_suites(&mut script, &run, Sampler::new(self.config.measure));
    }
}

fn measure_suites(script: &mut Script, run: &Rc<RefCell<BenchRun>>, sampler: Sampler) {
    let schedule = run.borrow_mut().take_schedule();
    for (suite_key, tests) in schedule {
        run.borrow_mut().suite_started(&suite_key);
        for (test_key, body) in tests {
            run.borrow_mut().test_started(&suite_key, &test_key);
            let measured = sampler.measure(|| script.call(&body.callable, body.span).map(|_| ()));
            match measured {
                Ok(measurement) => run
                    .borrow_mut()
                    .test_completed(&suite_key, &test_key, measurement),
                Err(error) => {
                    if !run.borrow_mut().test_failed(&suite_key, &test_key, error) {
                        return;
                    }
                }
            }
        }
        run.borrow_mut().suite_completed(&suite_key);
    }
}

/// The text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
