//! AST module for barbell scripts
//!
//! Core Abstract Syntax Tree types with source location tracking. The parser in
//! [`crate::syntax`] produces these nodes and the evaluator in [`crate::runtime`]
//! walks them.

use miette::SourceSpan;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Represents a byte span in the source code.
///
/// # Examples
///
/// ```rust
/// use barbell::ast::Span;
/// let span = Span { start: 0, end: 5 };
/// assert_eq!(span.len(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}

/// Wrapper for carrying source span information with any value
#[derive(Debug, Clone, PartialEq)]
pub struct WithSpan<T> {
    pub value: T,
    pub span: Span,
}

/// Canonical AST node type.
pub type AstNode = WithSpan<Arc<Expr>>;

/// The core AST node for barbell expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    List(Vec<AstNode>),
    /// `{key value ...}` literal, kept as ordered pairs until evaluation.
    Map(Vec<(AstNode, AstNode)>),
    Symbol(String),
    String(String),
    Number(f64),
    Bool(bool),
    Nil,
    Quote(AstNode),
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Expr {
    pub fn type_name(&self) -> &'static str {
        match self {
            Expr::List(_) => "list",
            Expr::Map(_) => "map",
            Expr::Symbol(_) => "symbol",
            Expr::String(_) => "string",
            Expr::Number(_) => "number",
            Expr::Bool(_) => "boolean",
            Expr::Nil => "nil",
            Expr::Quote(_) => "quote",
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item.value)?;
                }
                write!(f, ")")
            }
            Expr::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{} {}", key.value, value.value)?;
                }
                write!(f, "}}")
            }
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::String(s) => write!(f, "{:?}", s),
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Nil => write!(f, "nil"),
            Expr::Quote(inner) => write!(f, "'{}", inner.value),
        }
    }
}

// ============================================================================
// CONSTRUCTORS
// ============================================================================

pub fn make_node(expr: Expr, span: Span) -> AstNode {
    WithSpan {
        value: Arc::new(expr),
        span,
    }
}

pub fn make_symbol(name: &str, span: Span) -> AstNode {
    make_node(Expr::Symbol(name.to_string()), span)
}

pub fn make_list(items: Vec<AstNode>, span: Span) -> AstNode {
    make_node(Expr::List(items), span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_converts_to_offset_and_length() {
        let span = Span { start: 3, end: 10 };
        let source: SourceSpan = span.into();
        assert_eq!(source.offset(), 3);
        assert_eq!(source.len(), 7);
    }

    #[test]
    fn display_renders_source_like_text() {
        let span = Span::default();
        let list = make_list(
            vec![
                make_symbol("suite", span),
                make_node(Expr::String("sum".into()), span),
                make_node(Expr::Number(1.5), span),
            ],
            span,
        );
        assert_eq!(list.value.to_string(), "(suite \"sum\" 1.5)");
    }

    #[test]
    fn merge_covers_both_spans() {
        let merged = Span { start: 4, end: 6 }.merge(Span { start: 1, end: 5 });
        assert_eq!(merged, Span { start: 1, end: 6 });
    }
}
