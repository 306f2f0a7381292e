//! # Collection Operations
//!
//! ## Atoms Provided
//!
//! - **Lists**: `list`, `len`, `first`, `rest`, `nth`, `push`, `concat`, `range`, `empty?`
//! - **Maps**: `get`, `assoc`, `keys`
//! - **Higher-order**: `map`, `filter`, `reduce`, `apply`

use std::collections::BTreeMap;

use crate::atoms::helpers::{
    extract_callable, extract_index, extract_list, extract_number, validate_arity,
    validate_arity_range, validate_min_arity,
};
use crate::atoms::{AtomRegistry, EagerAtomFn};
use crate::errors::ErrorReporting;
use crate::runtime::{map_key_text, Value};

// ============================================================================
// LISTS
// ============================================================================

/// Builds a list from its arguments.
///
/// Usage: (list <a> <b> ...)
pub const ATOM_LIST: EagerAtomFn = |args, _ctx, _span| Ok(Value::List(args.to_vec()));

/// Length of a list, string or map.
///
/// Usage: (len <collection>)
///
/// Example:
///   (len "abc") ; => 3
pub const ATOM_LEN: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    let len = match &args[0] {
        Value::List(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Map(map) => map.len(),
        Value::Nil => 0,
        other => return Err(ctx.type_mismatch("collection", other.type_name(), span)),
    };
    Ok(Value::Number(len as f64))
};

/// True for empty lists, strings and maps, and for nil.
///
/// Usage: (empty? <collection>)
pub const ATOM_EMPTY: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    let empty = match &args[0] {
        Value::List(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Map(map) => map.is_empty(),
        Value::Nil => true,
        other => return Err(ctx.type_mismatch("collection", other.type_name(), span)),
    };
    Ok(Value::Bool(empty))
};

/// First element of a list, or nil.
///
/// Usage: (first <list>)
pub const ATOM_FIRST: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    let items = extract_list(&args[0], ctx, span)?;
    Ok(items.first().cloned().unwrap_or_default())
};

/// Everything but the first element.
///
/// Usage: (rest <list>)
pub const ATOM_REST: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    let items = extract_list(&args[0], ctx, span)?;
    Ok(Value::List(items.iter().skip(1).cloned().collect()))
};

/// Element at a zero-based index, or nil when out of range.
///
/// Usage: (nth <list> <index>)
pub const ATOM_NTH: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 2, ctx, span)?;
    let items = extract_list(&args[0], ctx, span)?;
    let index = extract_index(&args[1], ctx, span)?;
    Ok(items.get(index).cloned().unwrap_or_default())
};

/// New list with values appended.
///
/// Usage: (push <list> <value>...)
///
/// Example:
///   (push '(1) 2 3) ; => (1 2 3)
pub const ATOM_PUSH: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    let mut items = extract_list(&args[0], ctx, span)?.to_vec();
    items.extend_from_slice(&args[1..]);
    Ok(Value::List(items))
};

/// Concatenates lists.
///
/// Usage: (concat <list>...)
pub const ATOM_CONCAT: EagerAtomFn = |args, ctx, span| {
    let mut items = Vec::new();
    for arg in args {
        items.extend_from_slice(extract_list(arg, ctx, span)?);
    }
    Ok(Value::List(items))
};

/// Longest list `range` will build.
pub const MAX_RANGE_LEN: usize = 10_000_000;

/// Numbers from `start` (inclusive) to `end` (exclusive).
///
/// Usage: (range <end>) | (range <start> <end> [<step>])
///
/// Example:
///   (range 1 4) ; => (1 2 3)
pub const ATOM_RANGE: EagerAtomFn = |args, ctx, span| {
    validate_arity_range(args.len(), 1, 3, ctx, span)?;
    let (start, end) = match args.len() {
        1 => (0.0, extract_number(&args[0], ctx, span)?),
        _ => (
            extract_number(&args[0], ctx, span)?,
            extract_number(&args[1], ctx, span)?,
        ),
    };
    let step = match args.get(2) {
        Some(step) => extract_number(step, ctx, span)?,
        None => 1.0,
    };
    if step == 0.0 || !step.is_finite() {
        return Err(ctx.invalid_operation("range", "step must be a non-zero number", span));
    }
    if !start.is_finite() || !end.is_finite() {
        return Err(ctx.invalid_operation("range", "bounds must be finite numbers", span));
    }
    let count = ((end - start) / step).ceil().max(0.0);
    if count > MAX_RANGE_LEN as f64 {
        return Err(ctx.invalid_operation(
            "range",
            &format!("more than {} elements requested", MAX_RANGE_LEN),
            span,
        ));
    }
    let items = (0..count as usize)
        .map(|i| Value::Number(start + i as f64 * step))
        .collect();
    Ok(Value::List(items))
};

// ============================================================================
// MAPS
// ============================================================================

/// Looks up a map key or list index, with an optional default.
///
/// Usage: (get <map|list> <key> [<default>])
///
/// Example:
///   (get {a 1} "a") ; => 1
pub const ATOM_GET: EagerAtomFn = |args, ctx, span| {
    validate_arity_range(args.len(), 2, 3, ctx, span)?;
    let default = args.get(2).cloned().unwrap_or_default();
    let found = match &args[0] {
        Value::Map(map) => map.get(&map_key_text(&args[1])).cloned(),
        Value::List(items) => items.get(extract_index(&args[1], ctx, span)?).cloned(),
        Value::Nil => None,
        other => return Err(ctx.type_mismatch("map or list", other.type_name(), span)),
    };
    Ok(found.unwrap_or(default))
};

/// New map with key/value pairs added.
///
/// Usage: (assoc <map> <key> <value> ...)
pub const ATOM_ASSOC: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    let mut map = match &args[0] {
        Value::Map(map) => map.clone(),
        Value::Nil => BTreeMap::new(),
        other => return Err(ctx.type_mismatch("map", other.type_name(), span)),
    };
    let pairs = &args[1..];
    if pairs.len() % 2 != 0 {
        return Err(ctx.invalid_operation("assoc", "keys and values must come in pairs", span));
    }
    for pair in pairs.chunks(2) {
        map.insert(map_key_text(&pair[0]), pair[1].clone());
    }
    Ok(Value::Map(map))
};

/// Sorted keys of a map.
///
/// Usage: (keys <map>)
pub const ATOM_KEYS: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    match &args[0] {
        Value::Map(map) => Ok(Value::List(map.keys().cloned().map(Value::String).collect())),
        other => Err(ctx.type_mismatch("map", other.type_name(), span)),
    }
};

// ============================================================================
// HIGHER-ORDER
// ============================================================================

/// Applies a function to every element.
///
/// Usage: (map <fn> <list>)
///
/// Example:
///   (map (fn (x) (* x 2)) '(1 2)) ; => (2 4)
pub const ATOM_MAP: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 2, ctx, span)?;
    let func = extract_callable(&args[0], ctx, span)?;
    let items = extract_list(&args[1], ctx, span)?;
    let mut mapped = Vec::with_capacity(items.len());
    for item in items {
        mapped.push(ctx.apply(func, std::slice::from_ref(item), span)?);
    }
    Ok(Value::List(mapped))
};

/// Keeps elements for which the predicate is truthy.
///
/// Usage: (filter <fn> <list>)
pub const ATOM_FILTER: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 2, ctx, span)?;
    let func = extract_callable(&args[0], ctx, span)?;
    let items = extract_list(&args[1], ctx, span)?;
    let mut kept = Vec::new();
    for item in items {
        if ctx.apply(func, std::slice::from_ref(item), span)?.is_truthy() {
            kept.push(item.clone());
        }
    }
    Ok(Value::List(kept))
};

/// Folds a list from the left.
///
/// Usage: (reduce <fn> <initial> <list>)
///
/// Example:
///   (reduce + 0 '(1 2 3)) ; => 6
pub const ATOM_REDUCE: EagerAtomFn = |args, ctx, span| {
    validate_arity(args.len(), 3, ctx, span)?;
    let func = extract_callable(&args[0], ctx, span)?;
    let items = extract_list(&args[2], ctx, span)?;
    let mut acc = args[1].clone();
    for item in items {
        acc = ctx.apply(func, &[acc, item.clone()], span)?;
    }
    Ok(acc)
};

/// Calls a function with leading arguments followed by the elements of a list.
///
/// Usage: (apply <fn> <arg>... <list>)
///
/// Example:
///   (apply + 1 '(2 3)) ; => 6
pub const ATOM_APPLY: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 2, ctx, span)?;
    let func = extract_callable(&args[0], ctx, span)?;
    let Some((last, leading)) = args[1..].split_last() else {
        return Err(ctx.arity_mismatch("at least 2", args.len(), span));
    };
    let mut call_args = leading.to_vec();
    call_args.extend_from_slice(extract_list(last, ctx, span)?);
    ctx.apply(func, &call_args, span)
};

pub fn register_collection_atoms(registry: &mut AtomRegistry) {
    registry.register_eager("list", ATOM_LIST);
    registry.register_eager("len", ATOM_LEN);
    registry.register_eager("empty?", ATOM_EMPTY);
    registry.register_eager("first", ATOM_FIRST);
    registry.register_eager("rest", ATOM_REST);
    registry.register_eager("nth", ATOM_NTH);
    registry.register_eager("push", ATOM_PUSH);
    registry.register_eager("concat", ATOM_CONCAT);
    registry.register_eager("range", ATOM_RANGE);
    registry.register_eager("get", ATOM_GET);
    registry.register_eager("assoc", ATOM_ASSOC);
    registry.register_eager("keys", ATOM_KEYS);
    registry.register_eager("map", ATOM_MAP);
    registry.register_eager("filter", ATOM_FILTER);
    registry.register_eager("reduce", ATOM_REDUCE);
    registry.register_eager("apply", ATOM_APPLY);
}

#[cfg(test)]
mod tests {
    use crate::runtime::Value;
    use crate::sandbox::tests::eval_str;

    fn numbers(values: &[f64]) -> Value {
        Value::List(values.iter().copied().map(Value::Number).collect())
    }

    #[test]
    fn list_basics() {
        assert_eq!(eval_str("(len (list 1 2 3))").unwrap(), Value::Number(3.0));
        assert_eq!(eval_str("(first '(4 5))").unwrap(), Value::Number(4.0));
        assert_eq!(eval_str("(rest '(4 5))").unwrap(), numbers(&[5.0]));
        assert_eq!(eval_str("(nth '(4 5) 7)").unwrap(), Value::Nil);
        assert_eq!(eval_str("(push '(1) 2 3)").unwrap(), numbers(&[1.0, 2.0, 3.0]));
        assert_eq!(eval_str("(concat '(1) '() '(2))").unwrap(), numbers(&[1.0, 2.0]));
    }

    #[test]
    fn range_variants() {
        assert_eq!(eval_str("(range 3)").unwrap(), numbers(&[0.0, 1.0, 2.0]));
        assert_eq!(eval_str("(range 1 7 2)").unwrap(), numbers(&[1.0, 3.0, 5.0]));
        assert_eq!(eval_str("(range 3 0 -1)").unwrap(), numbers(&[3.0, 2.0, 1.0]));
        assert!(eval_str("(range 0 3 0)").is_err());
        assert_eq!(eval_str("(range 2 1)").unwrap(), numbers(&[]));
    }

    #[test]
    fn range_terminates_when_the_step_is_absorbed() {
        assert_eq!(
            eval_str("(len (range 1e17 (+ 1e17 64)))").unwrap(),
            Value::Number(64.0)
        );
    }

    #[test]
    fn range_rejects_oversized_and_infinite_requests() {
        assert!(eval_str("(range 1e12)").is_err());
        assert!(eval_str("(range 0 1e999)").is_err());
    }

    #[test]
    fn higher_order() {
        assert_eq!(
            eval_str("(map (fn (x) (* x x)) (range 1 4))").unwrap(),
            numbers(&[1.0, 4.0, 9.0])
        );
        assert_eq!(
            eval_str("(filter (fn (x) (> x 1)) '(1 2 3))").unwrap(),
            numbers(&[2.0, 3.0])
        );
        assert_eq!(eval_str("(reduce + 0 (range 1 5))").unwrap(), Value::Number(10.0));
        assert_eq!(eval_str("(apply + 1 '(2 3))").unwrap(), Value::Number(6.0));
    }

    #[test]
    fn maps() {
        assert_eq!(eval_str("(get {a 1} \"a\")").unwrap(), Value::Number(1.0));
        assert_eq!(eval_str("(get {a 1} 'b 0)").unwrap(), Value::Number(0.0));
        assert_eq!(
            eval_str("(keys (assoc {b 2} \"a\" 1))").unwrap(),
            Value::List(vec!["a".into(), "b".into()])
        );
    }
}
