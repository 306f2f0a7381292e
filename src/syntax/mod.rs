//! Syntax for barbell scripts: the pest grammar and the AST builder.

pub mod parser;

pub use parser::parse;
