//! # Intercepted Timers
//!
//! Scripts get the familiar timer family, but nothing is deferred: every
//! scheduling call runs its callback synchronously, in call order, and returns
//! the callback's result. The clear family does nothing because no timer is ever
//! pending.

use crate::atoms::helpers::{extract_callable, validate_min_arity};
use crate::atoms::{AtomRegistry, EagerAtomFn};
use crate::runtime::Value;

/// Runs a callback immediately. The delay is ignored; any further arguments are
/// passed to the callback.
///
/// Usage: (setTimeout <fn> [<delay>] [<arg>...])
///
/// Example:
///   (setTimeout (fn (x) (print x)) 1000 "now") ; prints "now" at once
pub const ATOM_SET_TIMEOUT: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    let callback = extract_callable(&args[0], ctx, span)?;
    let callback_args = args.get(2..).unwrap_or_default();
    ctx.apply(callback, callback_args, span)
};

/// Runs a callback immediately with any further arguments.
///
/// Usage: (setImmediate <fn> [<arg>...])
pub const ATOM_SET_IMMEDIATE: EagerAtomFn = |args, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    let callback = extract_callable(&args[0], ctx, span)?;
    ctx.apply(callback, &args[1..], span)
};

/// Accepts any arguments and does nothing.
///
/// Usage: (clearTimeout <handle>)
pub const ATOM_CLEAR: EagerAtomFn = |_args, _ctx, _span| Ok(Value::Nil);

pub fn register_timer_atoms(registry: &mut AtomRegistry) {
    registry.register_eager("setTimeout", ATOM_SET_TIMEOUT);
    registry.register_eager("setInterval", ATOM_SET_TIMEOUT);
    registry.register_eager("setImmediate", ATOM_SET_IMMEDIATE);
    registry.register_eager("clearTimeout", ATOM_CLEAR);
    registry.register_eager("clearInterval", ATOM_CLEAR);
    registry.register_eager("clearImmediate", ATOM_CLEAR);
}
