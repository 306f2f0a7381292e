//! The registration DSL bound into each bench script.
//!
//! `suite`, `describe` and `bench` register a suite; `test`, `it` and `rep`
//! register a test. Every form has a `.skip` variant, and the plain forms accept
//! an options map as their third argument (`{skip true}`).
//!
//! Usage:
//! ```lisp
//! (suite "sorting"
//!   (fn ()
//!     (test "builtin" (fn () (sort xs)))
//!     (test.skip "bubble" (fn () (bubble-sort xs)))))
//! ```
//!
//! The forms are closures over one [`BenchRun`], so they are bound into the
//! script's own scope and are invisible to files loaded with `require`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::Span;
use crate::atoms::helpers::{extract_callable, extract_string, validate_arity_range};
use crate::errors::{ErrorReporting, ScriptError};
use crate::runtime::{EvaluationContext, Value};
use crate::sandbox::Script;

use super::state::{BenchRun, TestBody};

pub(crate) type SharedRun = Rc<RefCell<BenchRun>>;

pub const SUITE_FORMS: [&str; 3] = ["suite", "describe", "bench"];
pub const TEST_FORMS: [&str; 3] = ["test", "it", "rep"];

/// Binds every DSL form into `script`.
pub(crate) fn bind(script: &Script, run: &SharedRun) {
    for name in SUITE_FORMS {
        for skip in [false, true] {
            let run = Rc::clone(run);
            let form = form_name(name, skip);
            script.bind(
                &form,
                Value::native(&form, move |args, ctx, span| {
                    add_suite(&run, args, ctx, span, skip)
                }),
            );
        }
    }
    for name in TEST_FORMS {
        for skip in [false, true] {
            let run = Rc::clone(run);
            let form = form_name(name, skip);
            script.bind(
                &form,
                Value::native(&form, move |args, ctx, span| add_test(&run, args, ctx, span, skip)),
            );
        }
    }
}

fn form_name(name: &str, skip: bool) -> String {
    if skip {
        format!("{}.skip", name)
    } else {
        name.to_string()
    }
}

/// Arguments shared by both registration forms: `(name callback options?)`.
struct Declaration {
    name: String,
    callback: Value,
    skip: bool,
}

fn parse_declaration(
    args: &[Value],
    ctx: &EvaluationContext,
    span: Span,
    force_skip: bool,
) -> Result<Declaration, ScriptError> {
    validate_arity_range(args.len(), 2, 3, ctx, span)?;
    let name = extract_string(&args[0], ctx, span)?.to_string();
    let callback = extract_callable(&args[1], ctx, span)?.clone();
    let skip = match args.get(2) {
        None | Some(Value::Nil) => false,
        Some(Value::Map(options)) => options.get("skip").is_some_and(Value::is_truthy),
        Some(other) => return Err(ctx.type_mismatch("options map", other.type_name(), span)),
    };
    Ok(Declaration {
        name,
        callback,
        skip: force_skip || skip,
    })
}

fn ensure_open(run: &BenchRun, form: &str, ctx: &EvaluationContext, span: Span) -> Result<(), ScriptError> {
    if run.closed {
        return Err(ctx.registration(
            format!("{}() can only be called while the bench file is loading", form),
            span,
        ));
    }
    Ok(())
}

// ============================================================================
// SUITE
// ============================================================================

fn add_suite(
    run: &SharedRun,
    args: &[Value],
    ctx: &mut EvaluationContext,
    span: Span,
    force_skip: bool,
) -> Result<Value, ScriptError> {
    let declaration = parse_declaration(args, ctx, span, force_skip)?;

    let key = {
        let mut state = run.borrow_mut();
        ensure_open(&state, "suite", ctx, span)?;
        if state.current.is_some() {
            return Err(ctx.registration("suites cannot be nested inside another suite", span));
        }
        let key = state.declare_suite(&declaration.name, declaration.skip);
        state.current = Some(key.clone());
        key
    };

    // The borrow is released here: the callback re-enters the DSL.
    let outcome = ctx.apply(&declaration.callback, &[], span);

    let mut state = run.borrow_mut();
    state.current = None;
    match outcome {
        Ok(_) => state.suite_declared(&key),
        Err(error) => state.suite_failed(&key, error)?,
    }
    Ok(Value::Nil)
}

// ============================================================================
// TEST
// ============================================================================

fn add_test(
    run: &SharedRun,
    args: &[Value],
    ctx: &mut EvaluationContext,
    span: Span,
    force_skip: bool,
) -> Result<Value, ScriptError> {
    let declaration = parse_declaration(args, ctx, span, force_skip)?;
    let body = TestBody {
        callable: declaration.callback,
        span,
    };

    let mut state = run.borrow_mut();
    ensure_open(&state, "test", ctx, span)?;
    match state.current.clone() {
        Some(suite_key) => {
            state.declare_test(&suite_key, &declaration.name, body, declaration.skip);
        }
        None => {
            // A bare test gets a suite of its own, named after the file.
            let file_name = state.file_name.clone();
            let suite_key = state.declare_suite(&file_name, false);
            state.declare_test(&suite_key, &declaration.name, body, declaration.skip);
            state.suite_declared(&suite_key);
        }
    }
    Ok(Value::Nil)
}
