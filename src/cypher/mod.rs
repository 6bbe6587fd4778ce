//! The query language: lexer, AST, and recursive-descent parser.
//!
//! Pure functions — no I/O, no state, no storage dependency.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use parser::Diagnostic;
use ast::Statement;

/// Parse a query string into a best-effort AST plus any diagnostics
/// collected along the way. Never fails: a lex/parse problem is recorded as
/// a diagnostic, not returned as an error (see `parser::parse_statement`).
pub fn parse(query: &str) -> (Statement, Vec<Diagnostic>) {
    let tokens = lexer::tokenize(query);
    parser::parse_statement(&tokens)
}
