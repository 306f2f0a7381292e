//! The orchestrator: discovery, bounded-concurrency dispatch and reporting.
//!
//! Every discovered file is handed to the configured runner on a rayon pool
//! whose size is the concurrency ceiling. A pool worker stays with its file
//! until the runner's stream has reached its terminal event, so no more than
//! `concurrent` runs are ever in flight. Workers forward every event to the
//! calling thread, which logs progress, counts terminal events and decides
//! whether to halt. The reporter runs exactly once, after the last stream ended.

use crossbeam::channel;
use rayon::ThreadPoolBuilder;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::discovery;
use crate::errors::{BarbellError, BenchError};
use crate::model::relative_path;
use crate::progress::Progress;
use crate::runner::panic_message;
use crate::stack::{lock, Stack};
use crate::utils::tell_time;

/// The result of a successful run.
#[derive(Debug)]
pub struct Outcome {
    pub stack: Arc<Stack>,
    /// The string the reporter returned, if any.
    pub report: Option<String>,
    /// Total wall time, formatted.
    pub elapsed: String,
    pub files: Vec<PathBuf>,
}

/// Discovers the bench files for `config` and runs them.
pub fn run(config: Arc<Config>) -> Result<Outcome, BarbellError> {
    let files = discovery::discover(&config)?;
    if files.is_empty() {
        return Err(BarbellError::NoFilesFound {
            root: config.root_dir.clone(),
        });
    }
    run_files(config, files)
}

/// Runs an explicit list of files. Duplicate paths are run once.
pub fn run_files(config: Arc<Config>, files: Vec<PathBuf>) -> Result<Outcome, BarbellError> {
    let start = SystemTime::now();
    let files = crate::utils::filter_unique(files);
    if files.is_empty() {
        return Err(BarbellError::NoFilesFound {
            root: config.root_dir.clone(),
        });
    }

    let stack = Arc::new(Stack::new());
    dispatch(&config, &stack, &files)?;

    if stack.is_empty() {
        return Err(BarbellError::NoBenchesCreated);
    }

    debug!(reporter = config.reporter.name(), "reporting");
    let report = config.reporter.report(&stack, &config)?;
    let elapsed = tell_time([start, SystemTime::now()]);
    info!(benches = stack.len(), %elapsed, "run finished");

    Ok(Outcome {
        stack,
        report,
        elapsed,
        files,
    })
}

// ============================================================================
// DISPATCH
// ============================================================================

fn dispatch(config: &Arc<Config>, stack: &Arc<Stack>, files: &[PathBuf]) -> Result<(), BarbellError> {
    let threads = config.concurrent.max(1).min(files.len());
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("barbell-dispatch-{}", i))
        .build()
        .map_err(|e| BarbellError::Scheduler(e.to_string()))?;
    debug!(
        runner = config.runner.name(),
        files = files.len(),
        concurrent = threads,
        "dispatching benches"
    );

    let halted = Arc::new(AtomicBool::new(false));
    let (tx, rx) = channel::unbounded::<(PathBuf, Progress)>();
    for path in files {
        let path = path.clone();
        let tx = tx.clone();
        let config = Arc::clone(config);
        let stack = Arc::clone(stack);
        let halted = Arc::clone(&halted);
        pool.spawn(move || {
            if halted.load(Ordering::SeqCst) {
                return;
            }
            let mut finished = false;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                for event in config.runner.run(&path, &stack, &config) {
                    finished = event.is_terminal();
                    if tx.send((path.clone(), event)).is_err() {
                        return;
                    }
                }
            }));
            if let Err(payload) = outcome {
                if !finished {
                    let error = BenchError::Panicked {
                        message: panic_message(payload.as_ref()),
                    };
                    let _ = tx.send((path, Progress::Failed(error)));
                }
            }
        });
    }
    drop(tx);

    let mut remaining = files.len();
    for (path, event) in rx.iter() {
        let bench = relative_path(&path, &config.root_dir);
        match event {
            Progress::Message(text) => {
                info!(target: "barbell::progress", bench = %bench, "{}", text);
            }
            Progress::Advanced(progress) => {
                debug!(target: "barbell::progress", bench = %bench, progress, "suite finished");
            }
            Progress::Completed => {
                remaining -= 1;
                debug!(bench = %bench, remaining, "bench finished");
            }
            Progress::Failed(source) => {
                remaining -= 1;
                if config.stop_on_errors {
                    halted.store(true, Ordering::SeqCst);
                    error!(bench = %bench, error = %source, "stopping on error");
                    return Err(BarbellError::BenchFailed { path, source });
                }
                warn!(bench = %bench, error = %source, remaining, "bench failed");
            }
        }
    }

    if remaining > 0 {
        warn!(remaining, "benches ended without a terminal event");
    }
    Ok(())
}

/// `true` when every Bench in `stack` reached a terminal state.
pub fn all_terminal(stack: &Stack) -> bool {
    stack
        .paths()
        .iter()
        .filter_map(|path| stack.get(path))
        .all(|handle| lock(&handle).is_terminal())
}
