//! Core evaluation engine for barbell scripts.
//!
//! ## Atom Calling Conventions
//!
//! Atoms are dispatched on their registered [`Atom`] variant. `Eager` atoms receive
//! evaluated argument values, while `SpecialForm` atoms receive the unevaluated
//! `AstNode`s and the current scope so they can control evaluation themselves.
//!
//! A name bound in scope always wins over an atom of the same name, so scripts may
//! shadow built-ins.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::rc::Rc;

use super::{map_key_text, Lambda, Scope, SharedOutput, Value};
use crate::ast::{AstNode, Expr, Span};
use crate::atoms::{Atom, AtomRegistry};
use crate::errors::{ErrorKind, ErrorReporting, ScriptError, SourceContext};

/// Default ceiling on nested evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// State of a file pulled in through `require`.
#[derive(Clone)]
pub enum ModuleState {
    Loading,
    Loaded(Value),
}

// ============================================================================
// CORE DATA STRUCTURES: Evaluation Context
// ============================================================================

/// The context for evaluating one script, passed to atoms and all evaluation functions.
pub struct EvaluationContext {
    pub registry: Rc<AtomRegistry>,
    pub source: SourceContext,
    pub output: SharedOutput,
    pub max_depth: usize,
    pub depth: usize,
    pub modules: Rc<RefCell<HashMap<PathBuf, ModuleState>>>,
}

impl EvaluationContext {
    pub fn new(registry: Rc<AtomRegistry>, source: SourceContext, output: SharedOutput) -> Self {
        Self {
            registry,
            source,
            output,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
            modules: Rc::default(),
        }
    }

    /// Calls any callable value with already-evaluated arguments.
    pub fn apply(&mut self, callee: &Value, args: &[Value], span: Span) -> Result<Value, ScriptError> {
        match callee {
            Value::Lambda(lambda) => self.call_lambda(lambda, args, span),
            Value::Native(native) => native.call(args, self, span),
            other => Err(self
                .source
                .type_mismatch("function", other.type_name(), span)),
        }
    }

    fn call_lambda(
        &mut self,
        lambda: &Rc<Lambda>,
        args: &[Value],
        span: Span,
    ) -> Result<Value, ScriptError> {
        let required = lambda.params.len();
        if args.len() < required || (lambda.rest.is_none() && args.len() > required) {
            let expected = match lambda.rest {
                Some(_) => format!("at least {}", required),
                None => required.to_string(),
            };
            return Err(self.source.arity_mismatch(&expected, args.len(), span));
        }

        let frame = Scope::child(&lambda.env);
        for (name, value) in lambda.params.iter().zip(args) {
            frame.define(name, value.clone());
        }
        if let Some(rest) = &lambda.rest {
            frame.define(rest, Value::List(args[required..].to_vec()));
        }

        self.with_source(lambda.source.clone(), |ctx| {
            evaluate_body(&lambda.body, &frame, ctx)
        })
    }

    /// Runs `f` with `source` as the active source, restoring the caller's afterwards.
    pub fn with_source<T>(
        &mut self,
        source: SourceContext,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let caller = std::mem::replace(&mut self.source, source);
        let result = f(self);
        self.source = caller;
        result
    }
}

impl ErrorReporting for EvaluationContext {
    fn report(&self, kind: ErrorKind, span: Span) -> ScriptError {
        self.source.report(kind, span)
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Evaluates a single node.
pub fn evaluate(
    node: &AstNode,
    scope: &Rc<Scope>,
    ctx: &mut EvaluationContext,
) -> Result<Value, ScriptError> {
    if ctx.depth >= ctx.max_depth {
        return Err(ctx.report(ErrorKind::RecursionLimit, node.span));
    }
    ctx.depth += 1;
    let result = evaluate_inner(node, scope, ctx);
    ctx.depth -= 1;
    result
}

/// Evaluates nodes in order and returns the last value (`nil` when empty).
pub fn evaluate_body(
    body: &[AstNode],
    scope: &Rc<Scope>,
    ctx: &mut EvaluationContext,
) -> Result<Value, ScriptError> {
    let mut last = Value::Nil;
    for node in body {
        last = evaluate(node, scope, ctx)?;
    }
    Ok(last)
}

pub fn evaluate_args(
    args: &[AstNode],
    scope: &Rc<Scope>,
    ctx: &mut EvaluationContext,
) -> Result<Vec<Value>, ScriptError> {
    args.iter().map(|arg| evaluate(arg, scope, ctx)).collect()
}

// ============================================================================
// DISPATCH
// ============================================================================

fn evaluate_inner(
    node: &AstNode,
    scope: &Rc<Scope>,
    ctx: &mut EvaluationContext,
) -> Result<Value, ScriptError> {
    match &*node.value {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::String(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Nil => Ok(Value::Nil),
        Expr::Quote(inner) => Ok(Value::from_quoted(inner)),
        Expr::Symbol(name) => resolve_symbol(name, scope, ctx, node.span),
        Expr::Map(pairs) => {
            let mut map = BTreeMap::new();
            for (key, value) in pairs {
                let key = match &*key.value {
                    Expr::Symbol(name) => name.clone(),
                    _ => map_key_text(&evaluate(key, scope, ctx)?),
                };
                map.insert(key, evaluate(value, scope, ctx)?);
            }
            Ok(Value::Map(map))
        }
        Expr::List(items) => evaluate_list(items, node.span, scope, ctx),
    }
}

fn resolve_symbol(
    name: &str,
    scope: &Rc<Scope>,
    ctx: &mut EvaluationContext,
    span: Span,
) -> Result<Value, ScriptError> {
    if let Some(value) = scope.lookup(name) {
        return Ok(value);
    }
    match ctx.registry.get(name).cloned() {
        Some(Atom::Eager(func)) => Ok(Value::native(name, func)),
        Some(Atom::SpecialForm(_)) => Err(ctx.invalid_operation(
            name,
            "special forms cannot be used as values",
            span,
        )),
        None => Err(ctx.undefined_symbol(name, span)),
    }
}

fn evaluate_list(
    items: &[AstNode],
    span: Span,
    scope: &Rc<Scope>,
    ctx: &mut EvaluationContext,
) -> Result<Value, ScriptError> {
    let Some((head, tail)) = items.split_first() else {
        return Ok(Value::Nil);
    };

    if let Expr::Symbol(name) = &*head.value {
        if !scope.is_bound(name) {
            match ctx.registry.get(name).cloned() {
                Some(Atom::SpecialForm(form)) => return form(tail, scope, ctx, span),
                Some(Atom::Eager(func)) => {
                    let args = evaluate_args(tail, scope, ctx)?;
                    return func(&args, ctx, span);
                }
                None => {}
            }
        }
    }

    let callee = evaluate(head, scope, ctx)?;
    let args = evaluate_args(tail, scope, ctx)?;
    ctx.apply(&callee, &args, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::build_std_registry;
    use crate::runtime::output;
    use crate::syntax::parse;

    fn eval_str(text: &str) -> Result<Value, ScriptError> {
        let source = SourceContext::from_file("test", text);
        let nodes = parse(text, &source)?;
        let mut ctx = EvaluationContext::new(Rc::new(build_std_registry()), source, output::null());
        evaluate_body(&nodes, &Scope::root(), &mut ctx)
    }

    #[test]
    fn evaluates_nested_calls() {
        assert_eq!(eval_str("(+ 1 (* 2 3))").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn closures_capture_their_scope() {
        let value = eval_str(
            "(define (adder n) (fn (x) (+ x n)))
             (define add2 (adder 2))
             (add2 40)",
        )
        .unwrap();
        assert_eq!(value, Value::Number(42.0));
    }

    #[test]
    fn rest_parameters_collect_extra_arguments() {
        let value = eval_str("(define (count . xs) (len xs)) (count 1 2 3)").unwrap();
        assert_eq!(value, Value::Number(3.0));
    }

    #[test]
    fn scope_bindings_shadow_atoms() {
        let value = eval_str("(define (len x) 99) (len '(1 2))").unwrap();
        assert_eq!(value, Value::Number(99.0));
    }

    #[test]
    fn arity_is_checked_for_lambdas() {
        let error = eval_str("(define (f a b) a) (f 1)").unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::ArityMismatch {
                expected: "2".into(),
                actual: 1
            }
        );
    }

    #[test]
    fn undefined_symbols_are_reported_with_their_span() {
        let error = eval_str("(+ 1 nope)").unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::UndefinedSymbol {
                symbol: "nope".into()
            }
        );
        assert_eq!(error.span.offset(), 5);
    }

    #[test]
    fn recursion_is_bounded() {
        let text = "(define (loop n) (loop (+ n 1))) (loop 0)";
        let source = SourceContext::from_file("test", text);
        let nodes = parse(text, &source).unwrap();
        let mut ctx = EvaluationContext::new(Rc::new(build_std_registry()), source, output::null());
        ctx.max_depth = 64;
        let error = evaluate_body(&nodes, &Scope::root(), &mut ctx).unwrap_err();
        assert_eq!(error.kind, ErrorKind::RecursionLimit);
        assert_eq!(ctx.depth, 0);
    }

    #[test]
    fn map_literals_use_symbol_keys_verbatim() {
        let value = eval_str("(define k \"dyn\") {skip true \"s\" 1 (str k) 2}").unwrap();
        let Value::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map.get("skip"), Some(&Value::Bool(true)));
        assert_eq!(map.get("s"), Some(&Value::Number(1.0)));
        assert_eq!(map.get("dyn"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn calling_a_non_function_is_a_type_error() {
        let error = eval_str("(1 2)").unwrap_err();
        assert!(matches!(error.kind, ErrorKind::TypeMismatch { .. }));
    }
}
