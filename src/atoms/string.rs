//! # String Operations
//!
//! `str`, `upper`, `lower`, `split`, `join`, `string?`

use crate::atoms::helpers::{extract_list, extract_string, validate_arity};
use crate::atoms::{AtomRegistry, EagerAtomFn};
use crate::runtime::Value;

/// Concatenates the display form of every argument.
///
/// Usage: (str <a> <b> ...)
///
/// Example:
///   (str "n=" 3) ; => "n=3"
pub const ATOM_STR: EagerAtomFn = |args, _ctx, _span| {
    Ok(Value::String(args.iter().map(ToString::to_string).collect()))
};

pub const ATOM_UPPER: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    Ok(Value::String(extract_string(&args[0], ctx, span)?.to_uppercase()))
};

pub const ATOM_LOWER: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    Ok(Value::String(extract_string(&args[0], ctx, span)?.to_lowercase()))
};

/// Splits a string on a separator.
///
/// Usage: (split <string> <separator>)
///
/// Example:
///   (split "a,b" ",") ; => ("a" "b")
pub const ATOM_SPLIT: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 2, ctx, span)?;
    let text = extract_string(&args[0], ctx, span)?;
    let separator = extract_string(&args[1], ctx, span)?;
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator).map(Value::from).collect()
    };
    Ok(Value::List(parts))
};

/// Joins the display form of list elements.
///
/// Usage: (join <list> <separator>)
pub const ATOM_JOIN: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 2, ctx, span)?;
    let items = extract_list(&args[0], ctx, span)?;
    let separator = extract_string(&args[1], ctx, span)?;
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    Ok(Value::String(parts.join(separator)))
};

pub const ATOM_IS_STRING: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    Ok(Value::Bool(matches!(args[0], Value::String(_))))
};

pub fn register_string_atoms(registry: &mut AtomRegistry) {
    registry.register_eager("str", ATOM_STR);
    registry.register_eager("upper", ATOM_UPPER);
    registry.register_eager("lower", ATOM_LOWER);
    registry.register_eager("split", ATOM_SPLIT);
    registry.register_eager("join", ATOM_JOIN);
    registry.register_eager("string?", ATOM_IS_STRING);
}
