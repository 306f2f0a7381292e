//! Barbell Error Handling
//!
//! Three layers of errors live here:
//!
//! - [`ScriptError`]: parse and evaluation failures inside a bench script. Each one
//!   carries the script source and a labelled span so miette can render an excerpt.
//! - [`BenchError`]: the clonable error stored in the Bench/Suite/Test model and sent
//!   across the progress stream.
//! - [`BarbellError`]: fatal, process-level conditions (discovery, configuration,
//!   plugin resolution, fail-fast aborts).

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::ast::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source text of one script, kept around so errors can point into it.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    /// File the source was read from, when there is one.
    pub path: Option<PathBuf>,
    source: Arc<NamedSource<String>>,
}

impl SourceContext {
    /// Create a source context from real file content
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let source = Arc::new(NamedSource::new(name.clone(), content.into()));
        Self {
            name,
            path: None,
            source,
        }
    }

    /// Like [`SourceContext::from_file`], remembering where the file lives.
    pub fn from_path(path: &Path, content: impl Into<String>) -> Self {
        let mut context = Self::from_file(path.display().to_string(), content);
        context.path = Some(path.to_path_buf());
        context
    }

    /// Create a fallback when real source is unavailable
    pub fn fallback(context: &str) -> Self {
        Self::from_file("fallback", format!("; {}", context))
    }

    /// Shared handle for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::clone(&self.source)
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

// ============================================================================
// SCRIPT ERRORS
// ============================================================================

/// What went wrong while parsing or evaluating a script.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Parse errors
    Syntax { message: String },
    InvalidLiteral { literal_type: String, value: String },

    // Runtime errors
    UndefinedSymbol { symbol: String },
    TypeMismatch { expected: String, actual: String },
    ArityMismatch { expected: String, actual: usize },
    InvalidOperation { operation: String, reason: String },
    RecursionLimit,

    // Raised by scripts through `throw`
    Thrown { message: String },

    // Registration DSL misuse
    Registration { message: String },

    // `require` failures
    Load { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Runtime,
    User,
    Registration,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Syntax { .. } | Self::InvalidLiteral { .. } => ErrorCategory::Parse,
            Self::UndefinedSymbol { .. }
            | Self::TypeMismatch { .. }
            | Self::ArityMismatch { .. }
            | Self::InvalidOperation { .. }
            | Self::RecursionLimit
            | Self::Load { .. } => ErrorCategory::Runtime,
            Self::Thrown { .. } => ErrorCategory::User,
            Self::Registration { .. } => ErrorCategory::Registration,
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax",
            Self::InvalidLiteral { .. } => "invalid_literal",
            Self::UndefinedSymbol { .. } => "undefined_symbol",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::ArityMismatch { .. } => "arity_mismatch",
            Self::InvalidOperation { .. } => "invalid_operation",
            Self::RecursionLimit => "recursion_limit",
            Self::Thrown { .. } => "thrown",
            Self::Registration { .. } => "registration",
            Self::Load { .. } => "load",
        }
    }

    fn primary_label(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax error here",
            Self::InvalidLiteral { .. } => "invalid literal",
            Self::UndefinedSymbol { .. } => "undefined symbol",
            Self::TypeMismatch { .. } => "type mismatch",
            Self::ArityMismatch { .. } => "arity mismatch",
            Self::InvalidOperation { .. } => "invalid operation",
            Self::RecursionLimit => "recursion limit exceeded",
            Self::Thrown { .. } => "thrown here",
            Self::Registration { .. } => "registered here",
            Self::Load { .. } => "required here",
        }
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            Self::Registration { .. } => Some(
                "suite/test declarations must run while the bench file is being loaded",
            ),
            Self::RecursionLimit => Some("check for unbounded recursion in the benchmarked code"),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { message } => write!(f, "Parse error: {}", message),
            Self::InvalidLiteral {
                literal_type,
                value,
            } => write!(f, "Parse error: invalid {} '{}'", literal_type, value),
            Self::UndefinedSymbol { symbol } => {
                write!(f, "Runtime error: undefined symbol '{}'", symbol)
            }
            Self::TypeMismatch { expected, actual } => {
                write!(f, "Type error: expected {}, got {}", expected, actual)
            }
            Self::ArityMismatch { expected, actual } => write!(
                f,
                "Runtime error: incorrect arity, expected {}, got {}",
                expected, actual
            ),
            Self::InvalidOperation { operation, reason } => {
                write!(f, "Runtime error: invalid operation '{}': {}", operation, reason)
            }
            Self::RecursionLimit => write!(f, "Runtime error: recursion limit exceeded"),
            Self::Thrown { message } => write!(f, "{}", message),
            Self::Registration { message } => write!(f, "Registration error: {}", message),
            Self::Load { path, message } => {
                write!(f, "Failed to require '{}': {}", path, message)
            }
        }
    }
}

/// A parse or evaluation failure inside a bench script.
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub source: Arc<NamedSource<String>>,
    pub span: SourceSpan,
}

impl ScriptError {
    pub fn new(kind: ErrorKind, context: &SourceContext, span: Span) -> Self {
        Self {
            kind,
            source: context.to_named_source(),
            span: span.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl std::error::Error for ScriptError {}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl Diagnostic for ScriptError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("barbell::script::{}", self.kind.code_suffix())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_with_span(Some(self.kind.primary_label().into()), self.span);
        Some(Box::new(std::iter::once(label)))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source)
    }
}

/// Context-aware error creation
pub trait ErrorReporting {
    fn report(&self, kind: ErrorKind, span: Span) -> ScriptError;

    fn type_mismatch(&self, expected: &str, actual: &str, span: Span) -> ScriptError {
        self.report(
            ErrorKind::TypeMismatch {
                expected: expected.into(),
                actual: actual.into(),
            },
            span,
        )
    }

    fn undefined_symbol(&self, symbol: &str, span: Span) -> ScriptError {
        self.report(
            ErrorKind::UndefinedSymbol {
                symbol: symbol.into(),
            },
            span,
        )
    }

    fn arity_mismatch(&self, expected: &str, actual: usize, span: Span) -> ScriptError {
        self.report(
            ErrorKind::ArityMismatch {
                expected: expected.into(),
                actual,
            },
            span,
        )
    }

    fn invalid_operation(&self, operation: &str, reason: &str, span: Span) -> ScriptError {
        self.report(
            ErrorKind::InvalidOperation {
                operation: operation.into(),
                reason: reason.into(),
            },
            span,
        )
    }

    fn registration(&self, message: impl Into<String>, span: Span) -> ScriptError {
        self.report(
            ErrorKind::Registration {
                message: message.into(),
            },
            span,
        )
    }
}

impl ErrorReporting for SourceContext {
    fn report(&self, kind: ErrorKind, span: Span) -> ScriptError {
        ScriptError::new(kind, self, span)
    }
}

// ============================================================================
// MODEL ERRORS
// ============================================================================

/// An error recorded on a Bench, Suite or Test.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum BenchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Script(#[from] ScriptError),

    #[error("No test suites were found in {name}!")]
    #[diagnostic(code(barbell::bench::no_suites))]
    NoSuites { name: String },

    #[error("Failed to read '{}': {message}", path.display())]
    #[diagnostic(code(barbell::bench::io))]
    Io { path: PathBuf, message: String },

    #[error("{0}")]
    #[diagnostic(code(barbell::bench::plugin))]
    Plugin(String),

    #[error("Runner for '{}' stopped without signalling completion", path.display())]
    #[diagnostic(code(barbell::bench::disconnected))]
    Disconnected { path: PathBuf },

    #[error("Runner panicked: {message}")]
    #[diagnostic(code(barbell::bench::panicked))]
    Panicked { message: String },
}

impl Serialize for BenchError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// FATAL ERRORS
// ============================================================================

/// Process-level failures. Any of these ends a barbell run.
#[derive(Debug, Error, Diagnostic)]
pub enum BarbellError {
    #[error("No glob patterns were given to find benches!")]
    #[diagnostic(
        code(barbell::discovery::no_patterns),
        help("pass globs on the command line or set `testMatch`")
    )]
    NoGlobPatterns,

    #[error("No files containing benchmark suites or tests were found in {}", root.display())]
    #[diagnostic(
        code(barbell::discovery::no_files),
        help("check the `testMatch` and `exclude` patterns")
    )]
    NoFilesFound { root: PathBuf },

    #[error("No bench test suites were created!")]
    #[diagnostic(code(barbell::orchestrator::no_benches))]
    NoBenchesCreated,

    #[error("Failed to locate {identifier}!")]
    #[diagnostic(code(barbell::plugin::not_found))]
    ModuleNotFound { identifier: String },

    #[error("Plugin '{identifier}' cannot be used: {reason}")]
    #[diagnostic(code(barbell::plugin::invalid))]
    InvalidPlugin { identifier: String, reason: String },

    #[error("Configuration file not found: {}", path.display())]
    #[diagnostic(code(barbell::config::not_found))]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse configuration file {}: {message}", path.display())]
    #[diagnostic(code(barbell::config::parse))]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(barbell::config::invalid))]
    InvalidConfig(String),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    #[diagnostic(code(barbell::discovery::pattern))]
    InvalidPattern { pattern: String, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(code(barbell::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bench {} failed", path.display())]
    #[diagnostic(code(barbell::orchestrator::bench_failed))]
    BenchFailed {
        path: PathBuf,
        #[source]
        #[diagnostic_source]
        source: BenchError,
    },

    #[error("Reporter failed: {0}")]
    #[diagnostic(code(barbell::reporter))]
    Reporter(String),

    #[error("Plugin command '{}' failed: {message}", program.display())]
    #[diagnostic(code(barbell::plugin::command))]
    Command { program: PathBuf, message: String },

    #[error("JSON error: {0}")]
    #[diagnostic(code(barbell::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to build the scheduler: {0}")]
    #[diagnostic(code(barbell::orchestrator::scheduler))]
    Scheduler(String),
}

impl BarbellError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_error_displays_kind_and_points_at_span() {
        let context = SourceContext::from_file("a.bench.bb", "(foo 1 2)");
        let error = context.undefined_symbol("foo", Span { start: 1, end: 4 });

        assert_eq!(error.to_string(), "Runtime error: undefined symbol 'foo'");
        assert_eq!(error.span, SourceSpan::from((1, 3)));
        assert_eq!(error.category(), ErrorCategory::Runtime);
        let code = error.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("barbell::script::undefined_symbol"));
    }

    #[test]
    fn thrown_errors_display_the_raw_message() {
        let context = SourceContext::default();
        let error = context.report(
            ErrorKind::Thrown {
                message: "boom".into(),
            },
            Span::default(),
        );
        assert_eq!(error.to_string(), "boom");
        assert_eq!(error.category(), ErrorCategory::User);
    }

    #[test]
    fn bench_errors_serialize_as_their_message() {
        let error = BenchError::NoSuites {
            name: "a.bench.bb".into(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, "\"No test suites were found in a.bench.bb!\"");
    }

    #[test]
    fn bench_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BenchError>();
        assert_send_sync::<BarbellError>();
    }
}
