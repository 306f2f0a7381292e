//! Barbell: a benchmark-suite runner for sandboxed barbell scripts.
//!
//! Bench files declare suites and tests through a small registration DSL. The
//! [`orchestrator`] discovers them, runs each one through a [`runner::Runner`]
//! under a concurrency ceiling and hands the finished [`stack::Stack`] to a
//! [`reporter::Reporter`] exactly once.

pub use crate::errors::{BarbellError, BenchError, ScriptError};

pub mod ast;
pub mod atoms;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod measure;
pub mod model;
pub mod orchestrator;
pub mod plugins;
pub mod progress;
pub mod reporter;
pub mod runner;
pub mod runtime;
pub mod sandbox;
pub mod stack;
pub mod syntax;
pub mod utils;
