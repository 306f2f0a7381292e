//! # Logic and Comparison
//!
//! - **Equality**: `=`, `eq?`, `!=`
//! - **Ordering**: `<`, `>`, `<=`, `>=` (numbers or strings, chained)
//! - **Logic**: `not`

use std::cmp::Ordering;

use crate::ast::Span;
use crate::atoms::helpers::{validate_arity, validate_min_arity};
use crate::atoms::{AtomRegistry, EagerAtomFn};
use crate::errors::{ErrorReporting, ScriptError};
use crate::runtime::{EvaluationContext, Value};

/// True when all arguments are structurally equal.
///
/// Usage: (= <a> <b> ...)
///
/// Example:
///   (= 1 1 1) ; => true
pub const ATOM_EQ: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 2, ctx, span)?;
    Ok(Value::Bool(args.windows(2).all(|w| w[0] == w[1])))
};

/// Negated equality.
///
/// Usage: (!= <a> <b>)
pub const ATOM_NEQ: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 2, ctx, span)?;
    Ok(Value::Bool(args[0] != args[1]))
};

pub const ATOM_LT: EagerAtomFn = |args, ctx, span| chain(args, ctx, span, "<", Ordering::is_lt);
pub const ATOM_GT: EagerAtomFn = |args, ctx, span| chain(args, ctx, span, ">", Ordering::is_gt);
pub const ATOM_LTE: EagerAtomFn = |args, ctx, span| chain(args, ctx, span, "<=", Ordering::is_le);
pub const ATOM_GTE: EagerAtomFn = |args, ctx, span| chain(args, ctx, span, ">=", Ordering::is_ge);

/// Logical negation of truthiness.
///
/// Usage: (not <value>)
///
/// Example:
///   (not nil) ; => true
pub const ATOM_NOT: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    Ok(Value::Bool(!args[0].is_truthy()))
};

fn compare(
    a: &Value,
    b: &Value,
    ctx: &EvaluationContext,
    span: Span,
    name: &str,
) -> Result<Ordering, ScriptError> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .partial_cmp(y)
            .ok_or_else(|| ctx.invalid_operation(name, "cannot compare NaN", span)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(ctx.type_mismatch(
            "two numbers or two strings",
            &format!("{} and {}", a.type_name(), b.type_name()),
            span,
        )),
    }
}

fn chain(
    args: &[Value],
    ctx: &EvaluationContext,
    span: Span,
    name: &str,
    accept: fn(Ordering) -> bool,
) -> Result<Value, ScriptError> {
    validate_min_arity(args.len(), 2, ctx, span)?;
    for pair in args.windows(2) {
        if !accept(compare(&pair[0], &pair[1], ctx, span, name)?) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub fn register_logic_atoms(registry: &mut AtomRegistry) {
    registry.register_eager("=", ATOM_EQ);
    registry.register_eager("eq?", ATOM_EQ);
    registry.register_eager("!=", ATOM_NEQ);
    registry.register_eager("<", ATOM_LT);
    registry.register_eager(">", ATOM_GT);
    registry.register_eager("<=", ATOM_LTE);
    registry.register_eager(">=", ATOM_GTE);
    registry.register_eager("not", ATOM_NOT);
}

#[cfg(test)]
mod tests {
    use crate::runtime::Value;
    use crate::sandbox::tests::eval_str;

    #[test]
    fn comparisons_chain() {
        assert_eq!(eval_str("(< 1 2 3)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(< 1 3 2)").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("(>= 3 3 1)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(< \"a\" \"b\")").unwrap(), Value::Bool(true));
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(eval_str("(= '(1 2) (list 1 2))").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(!= 1 2)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(not 0)").unwrap(), Value::Bool(false));
    }

    #[test]
    fn mixed_types_do_not_order() {
        assert!(eval_str("(< 1 \"2\")").is_err());
    }
}
