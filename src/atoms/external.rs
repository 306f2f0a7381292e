//! # External Interface Operations
//!
//! These atoms reach outside pure evaluation: output, errors, the clock,
//! randomness and loading other script files.
//!
//! ## Atoms Provided
//!
//! - **I/O**: `print`
//! - **Errors**: `throw` (alias `error`)
//! - **Clock**: `now`
//! - **Randomness**: `rand`
//! - **Modules**: `require`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::Span;
use crate::atoms::helpers::{extract_string, validate_arity};
use crate::atoms::{AtomRegistry, EagerAtomFn};
use crate::errors::{ErrorKind, ErrorReporting, ScriptError, SourceContext};
use crate::runtime::eval::ModuleState;
use crate::runtime::{evaluate_body, EvaluationContext, Scope, Value};
use crate::syntax::parse;

/// Extension tried when a required path names no existing file.
pub const SCRIPT_EXTENSION: &str = "bb";

/// Emits the display form of its arguments, space separated, to the output sink.
///
/// Usage: (print <value>...)
///
/// Example:
///   (print "hello" 42)
pub const ATOM_PRINT: EagerAtomFn = |args, ctx, _span| {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    ctx.output.borrow_mut().emit(&line);
    Ok(Value::Nil)
};

/// Raises an error with the given message.
///
/// Usage: (throw <message>)
///
/// Example:
///   (throw "not implemented")
pub const ATOM_THROW: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    Err(ctx.report(
        ErrorKind::Thrown {
            message: args[0].to_string(),
        },
        span,
    ))
};

/// Milliseconds since the Unix epoch.
///
/// Usage: (now)
pub const ATOM_NOW: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 0, ctx, span)?;
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0);
    Ok(Value::Number(millis))
};

/// Generates a pseudo-random number between 0.0 (inclusive) and 1.0 (exclusive).
///
/// Usage: (rand)
pub const ATOM_RAND: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 0, ctx, span)?;
    Ok(Value::Number(rand::random::<f64>()))
};

/// Loads another script and returns the value of its last expression.
///
/// The path is resolved against the directory of the requiring file; `.bb` is
/// appended when the literal path does not exist. Each file is evaluated once per
/// bench run, in a fresh scope that sees only the standard atoms.
///
/// Usage: (require <path>)
///
/// Example:
///   (define fib (require "./lib/fib"))
pub const ATOM_REQUIRE: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    let spec = extract_string(&args[0], ctx, span)?;
    let Some(path) = resolve_module_path(spec, ctx.source.path.as_deref()) else {
        return Err(load_error(ctx, spec, "no such file", span));
    };
    let key = path.canonicalize().unwrap_or_else(|_| path.clone());

    let state = ctx.modules.borrow().get(&key).cloned();
    match state {
        Some(ModuleState::Loaded(value)) => return Ok(value),
        Some(ModuleState::Loading) => {
            return Err(load_error(ctx, spec, "circular require", span));
        }
        None => {}
    }

    ctx.modules.borrow_mut().insert(key.clone(), ModuleState::Loading);
    match load_module(&path, spec, ctx, span) {
        Ok(value) => {
            ctx.modules
                .borrow_mut()
                .insert(key, ModuleState::Loaded(value.clone()));
            Ok(value)
        }
        Err(error) => {
            ctx.modules.borrow_mut().remove(&key);
            Err(error)
        }
    }
};

fn resolve_module_path(spec: &str, from: Option<&Path>) -> Option<PathBuf> {
    let base = match from.and_then(Path::parent) {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    let candidate = base.join(spec);
    if candidate.is_file() {
        return Some(candidate);
    }
    if candidate.extension().is_none() {
        let with_extension = candidate.with_extension(SCRIPT_EXTENSION);
        if with_extension.is_file() {
            return Some(with_extension);
        }
    }
    None
}

fn load_module(
    path: &Path,
    spec: &str,
    ctx: &mut EvaluationContext,
    span: Span,
) -> Result<Value, ScriptError> {
    let text = fs::read_to_string(path).map_err(|e| load_error(ctx, spec, &e.to_string(), span))?;
    let source = SourceContext::from_path(path, text.as_str());
    let nodes = parse(&text, &source)?;
    ctx.with_source(source, |ctx| evaluate_body(&nodes, &Scope::root(), ctx))
}

fn load_error(ctx: &EvaluationContext, spec: &str, message: &str, span: Span) -> ScriptError {
    ctx.report(
        ErrorKind::Load {
            path: spec.to_string(),
            message: message.to_string(),
        },
        span,
    )
}

pub fn register_external_atoms(registry: &mut AtomRegistry) {
    registry.register_eager("print", ATOM_PRINT);
    registry.register_eager("throw", ATOM_THROW);
    registry.register_eager("error", ATOM_THROW);
    registry.register_eager("now", ATOM_NOW);
    registry.register_eager("rand", ATOM_RAND);
    registry.register_eager("require", ATOM_REQUIRE);
}
