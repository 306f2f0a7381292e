//! Progress stream between one runner invocation and its consumer.
//!
//! A [`ProgressSender`] pushes events over a crossbeam channel and the matching
//! [`ProgressStream`] iterates them. The stream ends with exactly one terminal
//! event ([`Progress::Completed`] or [`Progress::Failed`]) on every path: once a
//! sender has signalled termination every further send is dropped, and a sender
//! that disappears without signalling surfaces as a `Failed` event.

use crossbeam::channel::{self, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::BenchError;

#[derive(Debug, Clone)]
pub enum Progress {
    /// Human-readable status line.
    Message(String),
    /// New value of the Bench's suite progress counter.
    Advanced(usize),
    Completed,
    Failed(BenchError),
}

impl Progress {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Progress::Completed | Progress::Failed(_))
    }
}

/// Creates a connected sender/stream pair for the bench at `path`.
pub fn channel(path: &Path) -> (ProgressSender, ProgressStream) {
    let (tx, rx) = channel::unbounded();
    let sender = ProgressSender {
        tx,
        terminated: Arc::new(AtomicBool::new(false)),
    };
    let stream = ProgressStream {
        rx,
        path: path.to_path_buf(),
        finished: false,
    };
    (sender, stream)
}

// ============================================================================
// SENDER
// ============================================================================

/// Producer half. Clones share the terminated flag.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Sender<Progress>,
    terminated: Arc<AtomicBool>,
}

impl ProgressSender {
    pub fn message(&self, text: impl Into<String>) {
        self.send(Progress::Message(text.into()));
    }

    pub fn advanced(&self, progress: usize) {
        self.send(Progress::Advanced(progress));
    }

    pub fn complete(&self) {
        self.terminate(Progress::Completed);
    }

    pub fn fail(&self, error: BenchError) {
        self.terminate(Progress::Failed(error));
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn send(&self, event: Progress) {
        if !self.is_terminated() {
            // A dropped stream means nobody is listening any more.
            let _ = self.tx.send(event);
        }
    }

    fn terminate(&self, event: Progress) {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(event);
        }
    }
}

// ============================================================================
// STREAM
// ============================================================================

/// Consumer half. Iteration blocks until the next event and stops after the
/// terminal one.
#[derive(Debug)]
pub struct ProgressStream {
    rx: Receiver<Progress>,
    path: PathBuf,
    finished: bool,
}

impl ProgressStream {
    /// A stream that has already failed, for runs that could not start.
    pub fn failed(path: &Path, error: BenchError) -> Self {
        let (sender, stream) = channel(path);
        sender.fail(error);
        stream
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drains the stream and returns its terminal outcome.
    pub fn wait(self) -> Result<(), BenchError> {
        for event in self {
            if let Progress::Failed(error) = event {
                return Err(error);
            }
        }
        Ok(())
    }
}

impl Iterator for ProgressStream {
    type Item = Progress;

    fn next(&mut self) -> Option<Progress> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(event) => {
                self.finished = event.is_terminal();
                Some(event)
            }
            Err(_) => {
                self.finished = true;
                Some(Progress::Failed(BenchError::Disconnected {
                    path: self.path.clone(),
                }))
            }
        }
    }
}
