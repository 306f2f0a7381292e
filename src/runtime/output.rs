//! Output sinks for `print`, so script output is injectable in tests.

use std::cell::RefCell;
use std::rc::Rc;

pub trait OutputSink {
    fn emit(&mut self, text: &str);
}

/// Shared handle passed through evaluation.
pub type SharedOutput = Rc<RefCell<dyn OutputSink>>;

/// Writes each emitted line to the process stdout.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Discards everything.
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _text: &str) {}
}

/// Collects emitted lines in memory.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    pub lines: Vec<String>,
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

pub fn stdout() -> SharedOutput {
    Rc::new(RefCell::new(StdoutSink))
}

pub fn null() -> SharedOutput {
    Rc::new(RefCell::new(NullSink))
}
