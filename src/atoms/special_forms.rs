//! # Special Forms
//!
//! Forms that control the evaluation of their own arguments: binding, functions,
//! conditionals, sequencing and loops.

use std::rc::Rc;

use crate::ast::{AstNode, Expr};
use crate::atoms::helpers::{validate_arity, validate_min_arity};
use crate::atoms::{AtomRegistry, SpecialFormFn};
use crate::errors::{ErrorReporting, ScriptError};
use crate::runtime::{evaluate, evaluate_body, EvaluationContext, Lambda, Scope, Value};

// ============================================================================
// BINDING
// ============================================================================

/// Binds a name in the current scope.
///
/// Usage: (define <name> <expr>)
///        (define (<name> <param>... [. <rest>]) <body>...)
///
///   Returns: the bound value
///
/// Example:
///   (define x 10)
///   (define (square n) (* n n))
pub const ATOM_DEFINE: SpecialFormFn = |args, scope, ctx, span| {
    validate_min_arity(args.len(), 2, ctx, span)?;
    match &*args[0].value {
        Expr::Symbol(name) => {
            validate_arity(args.len(), 2, ctx, span)?;
            let value = evaluate(&args[1], scope, ctx)?;
            scope.define(name, value.clone());
            Ok(value)
        }
        Expr::List(signature) => {
            let Some((head, params)) = signature.split_first() else {
                return Err(ctx.invalid_operation("define", "empty function signature", span));
            };
            let Some(name) = head.value.as_symbol() else {
                return Err(ctx.type_mismatch("symbol", head.value.type_name(), head.span));
            };
            let (params, rest) = parse_params(params, ctx)?;
            let lambda = Value::Lambda(Rc::new(Lambda {
                name: Some(name.to_string()),
                params,
                rest,
                body: args[1..].to_vec(),
                env: Rc::clone(scope),
                source: ctx.source.clone(),
            }));
            scope.define(name, lambda.clone());
            Ok(lambda)
        }
        other => Err(ctx.type_mismatch("symbol or signature", other.type_name(), args[0].span)),
    }
};

/// Rebinds an existing name.
///
/// Usage: (set! <name> <expr>)
///
/// Example:
///   (define n 0)
///   (set! n (+ n 1))
pub const ATOM_SET: SpecialFormFn = |args, scope, ctx, span| {
    validate_arity(args.len(), 2, ctx, span)?;
    let Some(name) = args[0].value.as_symbol() else {
        return Err(ctx.type_mismatch("symbol", args[0].value.type_name(), args[0].span));
    };
    let value = evaluate(&args[1], scope, ctx)?;
    if !scope.assign(name, value.clone()) {
        return Err(ctx.undefined_symbol(name, args[0].span));
    }
    Ok(value)
};

/// Evaluates a body with sequential local bindings.
///
/// Usage: (let ((<name> <expr>)...) <body>...)
///
/// Example:
///   (let ((a 1) (b (+ a 1))) (* a b)) ; => 2
pub const ATOM_LET: SpecialFormFn = |args, scope, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    let Expr::List(bindings) = &*args[0].value else {
        return Err(ctx.type_mismatch("binding list", args[0].value.type_name(), args[0].span));
    };
    let frame = Scope::child(scope);
    for binding in bindings {
        let pair = match &*binding.value {
            Expr::List(pair) if pair.len() == 2 => pair,
            _ => {
                return Err(ctx.invalid_operation(
                    "let",
                    "each binding must be a (name value) pair",
                    binding.span,
                ))
            }
        };
        let Some(name) = pair[0].value.as_symbol() else {
            return Err(ctx.type_mismatch("symbol", pair[0].value.type_name(), pair[0].span));
        };
        let value = evaluate(&pair[1], &frame, ctx)?;
        frame.define(name, value);
    }
    evaluate_body(&args[1..], &frame, ctx)
};

// ============================================================================
// FUNCTIONS
// ============================================================================

/// Creates an anonymous function.
///
/// Usage: (fn (<param>... [. <rest>]) <body>...)
///
/// Example:
///   ((fn (a b) (+ a b)) 1 2) ; => 3
pub const ATOM_FN: SpecialFormFn = |args, scope, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    let params = match &*args[0].value {
        Expr::List(params) => params.as_slice(),
        Expr::Nil => &[],
        other => return Err(ctx.type_mismatch("parameter list", other.type_name(), args[0].span)),
    };
    let (params, rest) = parse_params(params, ctx)?;
    Ok(Value::Lambda(Rc::new(Lambda {
        name: None,
        params,
        rest,
        body: args[1..].to_vec(),
        env: Rc::clone(scope),
        source: ctx.source.clone(),
    })))
};

fn parse_params(
    items: &[AstNode],
    ctx: &EvaluationContext,
) -> Result<(Vec<String>, Option<String>), ScriptError> {
    let mut params = Vec::with_capacity(items.len());
    let mut iter = items.iter();
    while let Some(item) = iter.next() {
        let Some(name) = item.value.as_symbol() else {
            return Err(ctx.type_mismatch("parameter name", item.value.type_name(), item.span));
        };
        if name != "." {
            params.push(name.to_string());
            continue;
        }
        let rest = match (iter.next(), iter.next()) {
            (Some(rest), None) => rest,
            _ => {
                return Err(ctx.invalid_operation(
                    "parameters",
                    "'.' must be followed by exactly one rest parameter",
                    item.span,
                ))
            }
        };
        let Some(rest_name) = rest.value.as_symbol() else {
            return Err(ctx.type_mismatch("parameter name", rest.value.type_name(), rest.span));
        };
        return Ok((params, Some(rest_name.to_string())));
    }
    Ok((params, None))
}

// ============================================================================
// CONTROL FLOW
// ============================================================================

/// Conditional evaluation.
///
/// Usage: (if <condition> <then> [<else>])
///
/// Example:
///   (if (> x 0) "positive" "non-positive")
pub const ATOM_IF: SpecialFormFn = |args, scope, ctx, span| {
    if args.len() < 2 || args.len() > 3 {
        return Err(ctx.arity_mismatch("2 or 3", args.len(), span));
    }
    if evaluate(&args[0], scope, ctx)?.is_truthy() {
        evaluate(&args[1], scope, ctx)
    } else if let Some(otherwise) = args.get(2) {
        evaluate(otherwise, scope, ctx)
    } else {
        Ok(Value::Nil)
    }
};

/// Multi-way conditional. The first clause whose test is truthy wins; `else`
/// always matches.
///
/// Usage: (cond (<test> <body>...)... [(else <body>...)])
///
/// Example:
///   (cond ((< n 0) "neg") ((= n 0) "zero") (else "pos"))
pub const ATOM_COND: SpecialFormFn = |args, scope, ctx, _span| {
    for clause in args {
        let Expr::List(parts) = &*clause.value else {
            return Err(ctx.type_mismatch("cond clause", clause.value.type_name(), clause.span));
        };
        let Some((test, body)) = parts.split_first() else {
            return Err(ctx.invalid_operation("cond", "empty clause", clause.span));
        };
        let matched = match test.value.as_symbol() {
            Some("else") => true,
            _ => evaluate(test, scope, ctx)?.is_truthy(),
        };
        if matched {
            return evaluate_body(body, scope, ctx);
        }
    }
    Ok(Value::Nil)
};

/// Evaluates expressions in order and returns the last.
///
/// Usage: (do <expr>...)
pub const ATOM_DO: SpecialFormFn = |args, scope, ctx, _span| evaluate_body(args, scope, ctx);

/// Repeats the body while the condition is truthy. Returns nil.
///
/// Usage: (while <condition> <body>...)
///
/// Example:
///   (while (< i 10) (set! i (+ i 1)))
pub const ATOM_WHILE: SpecialFormFn = |args, scope, ctx, span| {
    validate_min_arity(args.len(), 1, ctx, span)?;
    while evaluate(&args[0], scope, ctx)?.is_truthy() {
        evaluate_body(&args[1..], scope, ctx)?;
    }
    Ok(Value::Nil)
};

/// Short-circuit and. Returns the first falsy value or the last value.
///
/// Usage: (and <expr>...)
pub const ATOM_AND: SpecialFormFn = |args, scope, ctx, _span| {
    let mut last = Value::Bool(true);
    for arg in args {
        last = evaluate(arg, scope, ctx)?;
        if !last.is_truthy() {
            break;
        }
    }
    Ok(last)
};

/// Short-circuit or. Returns the first truthy value or the last value.
///
/// Usage: (or <expr>...)
pub const ATOM_OR: SpecialFormFn = |args, scope, ctx, _span| {
    let mut last = Value::Nil;
    for arg in args {
        last = evaluate(arg, scope, ctx)?;
        if last.is_truthy() {
            break;
        }
    }
    Ok(last)
};

/// Returns its argument unevaluated.
///
/// Usage: (quote <expr>) or '<expr>
pub const ATOM_QUOTE: SpecialFormFn = |args, _scope, ctx, span| {
    validate_arity(args.len(), 1, ctx, span)?;
    Ok(Value::from_quoted(&args[0]))
};

pub fn register_special_forms(registry: &mut AtomRegistry) {
    registry.register_special_form("define", ATOM_DEFINE);
    registry.register_special_form("set!", ATOM_SET);
    registry.register_special_form("let", ATOM_LET);
    registry.register_special_form("fn", ATOM_FN);
    registry.register_special_form("lambda", ATOM_FN);
    registry.register_special_form("if", ATOM_IF);
    registry.register_special_form("cond", ATOM_COND);
    registry.register_special_form("do", ATOM_DO);
    registry.register_special_form("while", ATOM_WHILE);
    registry.register_special_form("and", ATOM_AND);
    registry.register_special_form("or", ATOM_OR);
    registry.register_special_form("quote", ATOM_QUOTE);
}
