//! # Mathematical Operations
//!
//! All atoms in this module are pure functions over `Value::Number` (f64).
//!
//! ## Atoms Provided
//!
//! - **Arithmetic**: `+`, `-`, `*`, `/`, `mod`
//! - **Math Functions**: `abs`, `min`, `max`, `floor`, `ceil`, `round`, `sqrt`, `pow`

use crate::atoms::helpers::{extract_number, extract_numbers, validate_arity, validate_min_arity};
use crate::atoms::{AtomRegistry, EagerAtomFn};
use crate::errors::ErrorReporting;
use crate::runtime::Value;

// ============================================================================
// ARITHMETIC OPERATIONS
// ============================================================================

/// Adds numbers.
///
/// Usage: (+ <a> <b> ...)
///
/// Example:
///   (+ 1 2 3) ; => 6
pub const ATOM_ADD: EagerAtomFn = |args, ctx, span| {
    let sum = extract_numbers(args, ctx, span)?.into_iter().sum();
    Ok(Value::Number(sum))
};

/// Subtracts numbers, or negates a single number.
///
/// Usage: (- <a> [<b> ...])
///
/// Example:
///   (- 5 2) ; => 3
///   (- 5)   ; => -5
pub const ATOM_SUB: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    let numbers = extract_numbers(args, ctx, span)?;
    if numbers.len() == 1 {
        return Ok(Value::Number(-numbers[0]));
    }
    let result = numbers[1..].iter().fold(numbers[0], |acc, n| acc - n);
    Ok(Value::Number(result))
};

/// Multiplies numbers.
///
/// Usage: (* <a> <b> ...)
///
/// Example:
///   (* 2 3 4) ; => 24
pub const ATOM_MUL: EagerAtomFn = |args, ctx, span| {
    let product = extract_numbers(args, ctx, span)?.into_iter().product();
    Ok(Value::Number(product))
};

/// Divides numbers left to right.
///
/// Usage: (/ <a> <b> ...)
///
/// Example:
///   (/ 10 2) ; => 5
pub const ATOM_DIV: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 2, ctx, span)?;
    let numbers = extract_numbers(args, ctx, span)?;
    let mut result = numbers[0];
    for divisor in &numbers[1..] {
        if *divisor == 0.0 {
            return Err(ctx.invalid_operation("/", "division by zero", span));
        }
        result /= divisor;
    }
    Ok(Value::Number(result))
};

/// Remainder of a division.
///
/// Usage: (mod <a> <b>)
///
/// Example:
///   (mod 10 3) ; => 1
pub const ATOM_MOD: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 2, ctx, span)?;
    let a = extract_number(&args[0], ctx, span)?;
    let b = extract_number(&args[1], ctx, span)?;
    if b == 0.0 {
        return Err(ctx.invalid_operation("mod", "division by zero", span));
    }
    Ok(Value::Number(a % b))
};

// ============================================================================
// MATH FUNCTIONS
// ============================================================================

pub const ATOM_ABS: EagerAtomFn = |args, ctx, span| unary(args, ctx, span, f64::abs);
pub const ATOM_FLOOR: EagerAtomFn = |args, ctx, span| unary(args, ctx, span, f64::floor);
pub const ATOM_CEIL: EagerAtomFn = |args, ctx, span| unary(args, ctx, span, f64::ceil);
pub const ATOM_ROUND: EagerAtomFn = |args, ctx, span| unary(args, ctx, span, f64::round);

/// Square root.
///
/// Usage: (sqrt <n>)
pub const ATOM_SQRT: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    let n = extract_number(&args[0], ctx, span)?;
    if n < 0.0 {
        return Err(ctx.invalid_operation("sqrt", "negative operand", span));
    }
    Ok(Value::Number(n.sqrt()))
};

/// Raises a number to a power.
///
/// Usage: (pow <base> <exponent>)
///
/// Example:
///   (pow 2 10) ; => 1024
pub const ATOM_POW: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 2, ctx, span)?;
    let base = extract_number(&args[0], ctx, span)?;
    let exponent = extract_number(&args[1], ctx, span)?;
    Ok(Value::Number(base.powf(exponent)))
};

/// Smallest of its arguments.
///
/// Usage: (min <a> <b> ...)
pub const ATOM_MIN: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    let numbers = extract_numbers(args, ctx, span)?;
    Ok(Value::Number(numbers.into_iter().fold(f64::INFINITY, f64::min)))
};

/// Largest of its arguments.
///
/// Usage: (max <a> <b> ...)
pub const ATOM_MAX: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    let numbers = extract_numbers(args, ctx, span)?;
    Ok(Value::Number(numbers.into_iter().fold(f64::NEG_INFINITY, f64::max)))
};

fn unary(
    args: &[Value],
    ctx: &crate::runtime::EvaluationContext,
    span: crate::ast::Span,
    op: fn(f64) -> f64,
) -> Result<Value, crate::errors::ScriptError> {
    validate_arity(args.len(), 1, ctx, span)?;
    Ok(Value::Number(op(extract_number(&args[0], ctx, span)?)))
}

pub fn register_math_atoms(registry: &mut AtomRegistry) {
    registry.register_eager("+", ATOM_ADD);
    registry.register_eager("-", ATOM_SUB);
    registry.register_eager("*", ATOM_MUL);
    registry.register_eager("/", ATOM_DIV);
    registry.register_eager("mod", ATOM_MOD);
    registry.register_eager("abs", ATOM_ABS);
    registry.register_eager("floor", ATOM_FLOOR);
    registry.register_eager("ceil", ATOM_CEIL);
    registry.register_eager("round", ATOM_ROUND);
    registry.register_eager("sqrt", ATOM_SQRT);
    registry.register_eager("pow", ATOM_POW);
    registry.register_eager("min", ATOM_MIN);
    registry.register_eager("max", ATOM_MAX);
}
