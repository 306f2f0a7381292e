//! # Atom Helper Infrastructure
//!
//! Arity validation and typed extraction shared by every atom module.

use crate::ast::Span;
use crate::errors::{ErrorReporting, ScriptError};
use crate::runtime::{EvaluationContext, Value};

/// Fails unless exactly `expected` arguments were passed.
pub fn validate_arity(
    args_len: usize,
    expected: usize,
    ctx: &EvaluationContext,
    span: Span,
) -> Result<(), ScriptError> {
    if args_len != expected {
        return Err(ctx.arity_mismatch(&expected.to_string(), args_len, span));
    }
    Ok(())
}

/// Fails unless at least `min` arguments were passed.
pub fn validate_min_arity(
    args_len: usize,
    min: usize,
    ctx: &EvaluationContext,
    span: Span,
) -> Result<(), ScriptError> {
    if args_len < min {
        return Err(ctx.arity_mismatch(&format!("at least {}", min), args_len, span));
    }
    Ok(())
}

/// Fails unless the argument count lies within `min..=max`.
pub fn validate_arity_range(
    args_len: usize,
    min: usize,
    max: usize,
    ctx: &EvaluationContext,
    span: Span,
) -> Result<(), ScriptError> {
    if args_len < min || args_len > max {
        return Err(ctx.arity_mismatch(&format!("{} to {}", min, max), args_len, span));
    }
    Ok(())
}

pub fn extract_number(
    value: &Value,
    ctx: &EvaluationContext,
    span: Span,
) -> Result<f64, ScriptError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(ctx.type_mismatch("number", other.type_name(), span)),
    }
}

pub fn extract_numbers(
    args: &[Value],
    ctx: &EvaluationContext,
    span: Span,
) -> Result<Vec<f64>, ScriptError> {
    args.iter().map(|arg| extract_number(arg, ctx, span)).collect()
}

pub fn extract_string<'a>(
    value: &'a Value,
    ctx: &EvaluationContext,
    span: Span,
) -> Result<&'a str, ScriptError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ctx.type_mismatch("string", other.type_name(), span)),
    }
}

pub fn extract_list<'a>(
    value: &'a Value,
    ctx: &EvaluationContext,
    span: Span,
) -> Result<&'a [Value], ScriptError> {
    match value {
        Value::List(items) => Ok(items),
        Value::Nil => Ok(&[]),
        other => Err(ctx.type_mismatch("list", other.type_name(), span)),
    }
}

pub fn extract_callable<'a>(
    value: &'a Value,
    ctx: &EvaluationContext,
    span: Span,
) -> Result<&'a Value, ScriptError> {
    if value.is_callable() {
        Ok(value)
    } else {
        Err(ctx.type_mismatch("function", value.type_name(), span))
    }
}

/// Converts a number to an index, rejecting negatives and fractions.
pub fn extract_index(
    value: &Value,
    ctx: &EvaluationContext,
    span: Span,
) -> Result<usize, ScriptError> {
    let n = extract_number(value, ctx, span)?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(ctx.invalid_operation("index", &format!("{} is not a valid index", n), span));
    }
    Ok(n as usize)
}
