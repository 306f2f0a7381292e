//! Barbell Parser
//!
//! Converts script source into AST nodes with source location tracking.
//! Purely syntactic: no symbol resolution or arity checks happen here.

use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::ast::{make_list, make_node, AstNode, Expr, Span};
use crate::errors::{ErrorKind, ErrorReporting, ScriptError, SourceContext};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct BarbellParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse script source into AST nodes
pub fn parse(source_text: &str, source: &SourceContext) -> Result<Vec<AstNode>, ScriptError> {
    if source_text.trim().is_empty() {
        return Ok(vec![]);
    }

    let mut pairs = BarbellParser::parse(Rule::program, source_text)
        .map_err(|e| convert_parse_error(e, source_text, source))?;

    let Some(program) = pairs.next() else {
        return Ok(vec![]);
    };

    program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| build_ast_node(p, source))
        .collect()
}

// ============================================================================
// AST BUILDERS
// ============================================================================

fn build_ast_node(pair: Pair<Rule>, source: &SourceContext) -> Result<AstNode, ScriptError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::number => {
            let text = pair.as_str();
            let value = text.parse::<f64>().map_err(|_| {
                source.report(
                    ErrorKind::InvalidLiteral {
                        literal_type: "number".into(),
                        value: text.into(),
                    },
                    span,
                )
            })?;
            Ok(make_node(Expr::Number(value), span))
        }

        Rule::boolean => Ok(make_node(Expr::Bool(pair.as_str() == "true"), span)),

        Rule::nil => Ok(make_node(Expr::Nil, span)),

        Rule::string => {
            let content = unescape_string(pair.as_str());
            Ok(make_node(Expr::String(content), span))
        }

        Rule::symbol => Ok(make_node(Expr::Symbol(pair.as_str().to_string()), span)),

        Rule::list => {
            let children = pair
                .into_inner()
                .map(|p| build_ast_node(p, source))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(make_list(children, span))
        }

        Rule::map => {
            let children = pair
                .into_inner()
                .map(|p| build_ast_node(p, source))
                .collect::<Result<Vec<_>, _>>()?;
            if children.len() % 2 != 0 {
                return Err(source.report(
                    ErrorKind::Syntax {
                        message: "map literal needs an even number of forms".into(),
                    },
                    span,
                ));
            }
            let mut pairs = Vec::with_capacity(children.len() / 2);
            let mut items = children.into_iter();
            while let (Some(key), Some(value)) = (items.next(), items.next()) {
                pairs.push((key, value));
            }
            Ok(make_node(Expr::Map(pairs), span))
        }

        Rule::quote => {
            let inner = pair.into_inner().next().ok_or_else(|| {
                source.report(
                    ErrorKind::Syntax {
                        message: "missing expression after quote".into(),
                    },
                    span,
                )
            })?;
            let quoted = build_ast_node(inner, source)?;
            Ok(make_node(Expr::Quote(quoted), span))
        }

        rule => Err(source.report(
            ErrorKind::Syntax {
                message: format!("unsupported rule: {:?}", rule),
            },
            span,
        )),
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

fn unescape_string(text: &str) -> String {
    // Remove surrounding quotes
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn convert_parse_error(error: Error<Rule>, text: &str, source: &SourceContext) -> ScriptError {
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => Span {
            start: pos,
            end: (pos + 1).min(text.len()).max(pos),
        },
        pest::error::InputLocation::Span((start, end)) => Span { start, end },
    };

    let message = match unclosed_delimiter(text) {
        Some('(') => "missing closing parenthesis".to_string(),
        Some('{') => "missing closing brace".to_string(),
        Some('"') => "missing closing quote".to_string(),
        _ => match text[span.start.min(text.len())..].chars().next() {
            Some(found) => format!("unexpected '{}'", found),
            None => "unexpected end of input".to_string(),
        },
    };

    source.report(ErrorKind::Syntax { message }, span)
}

/// First delimiter left open at the end of `text`, ignoring strings and comments.
fn unclosed_delimiter(text: &str) -> Option<char> {
    let mut open = Vec::new();
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => {}
                    }
                }
                if !closed {
                    return Some('"');
                }
            }
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' | '{' => open.push(ch),
            ')' | '}' => {
                open.pop();
            }
            _ => {}
        }
    }
    open.first().copied()
}
