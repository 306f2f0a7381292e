//! Runtime values and evaluation for barbell scripts.
//!
//! Everything here is single-threaded (`Rc`-based): each bench file is loaded and
//! measured on its own runner thread, and values never leave that thread. Only
//! plain data (the Bench model and [`crate::errors::BenchError`]) crosses threads.

pub mod eval;
pub mod output;
pub mod scope;

pub use eval::{evaluate, evaluate_body, EvaluationContext};
pub use output::{NullSink, OutputBuffer, OutputSink, SharedOutput, StdoutSink};
pub use scope::Scope;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{AstNode, Expr, Span};
use crate::errors::{ScriptError, SourceContext};

// ============================================================================
// VALUES
// ============================================================================

/// Signature shared by host functions exposed to scripts.
pub type NativeCallable = dyn Fn(&[Value], &mut EvaluationContext, Span) -> Result<Value, ScriptError>;

/// A host function bound into a script, either an eager atom referenced as a value
/// or a closure installed by the runner (the registration DSL).
pub struct NativeFn {
    pub name: String,
    func: Box<NativeCallable>,
}

impl NativeFn {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value], &mut EvaluationContext, Span) -> Result<Value, ScriptError> + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn call(
        &self,
        args: &[Value],
        context: &mut EvaluationContext,
        span: Span,
    ) -> Result<Value, ScriptError> {
        (self.func)(args, context, span)
    }
}

/// A user-defined function closing over the scope it was created in.
pub struct Lambda {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub rest: Option<String>,
    pub body: Vec<AstNode>,
    pub env: Rc<Scope>,
    /// Source the body was parsed from, so errors point at the right file.
    pub source: SourceContext,
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Lambda(Rc<Lambda>),
    Native(Rc<NativeFn>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Lambda(_) | Value::Native(_) => "function",
        }
    }

    /// `nil` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Lambda(_) | Value::Native(_))
    }

    pub fn native<F>(name: &str, func: F) -> Value
    where
        F: Fn(&[Value], &mut EvaluationContext, Span) -> Result<Value, ScriptError> + 'static,
    {
        Value::Native(Rc::new(NativeFn::new(name, func)))
    }

    /// Converts a quoted expression into data.
    pub fn from_quoted(node: &AstNode) -> Value {
        match &*node.value {
            Expr::List(items) => Value::List(items.iter().map(Value::from_quoted).collect()),
            Expr::Map(pairs) => Value::Map(
                pairs
                    .iter()
                    .map(|(k, v)| (map_key_text(&Value::from_quoted(k)), Value::from_quoted(v)))
                    .collect(),
            ),
            Expr::Symbol(name) => Value::Symbol(name.clone()),
            Expr::String(s) => Value::String(s.clone()),
            Expr::Number(n) => Value::Number(*n),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Nil => Value::Nil,
            Expr::Quote(inner) => Value::List(vec![
                Value::Symbol("quote".into()),
                Value::from_quoted(inner),
            ]),
        }
    }
}

/// Text used as the key when a value indexes a map.
pub fn map_key_text(value: &Value) -> String {
    match value {
        Value::String(s) | Value::Symbol(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    item.fmt_nested(f)?;
                }
                write!(f, ")")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{} ", key)?;
                    value.fmt_nested(f)?;
                }
                write!(f, "}}")
            }
            Value::Lambda(lambda) => match &lambda.name {
                Some(name) => write!(f, "<fn {}>", name),
                None => write!(f, "<fn>"),
            },
            Value::Native(native) => write!(f, "<native {}>", native.name),
        }
    }
}

impl Value {
    /// Strings are quoted when they appear inside collections.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_nil_and_false() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn display_quotes_nested_strings_only() {
        let list = Value::List(vec![Value::from("a"), Value::from(1.0), Value::Nil]);
        assert_eq!(list.to_string(), "(\"a\" 1 nil)");
        assert_eq!(Value::from("a").to_string(), "a");
    }

    #[test]
    fn natives_compare_by_identity() {
        let a = Value::native("a", |_, _, _| Ok(Value::Nil));
        let b = Value::native("a", |_, _, _| Ok(Value::Nil));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
