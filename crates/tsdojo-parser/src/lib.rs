//! tsdojo parser: converts a token stream into an AST.

mod parse_decl;
mod parse_expr;
mod parse_stmt;
mod parse_type;
mod parser;

pub use parser::{ParseResult, Parser, MAX_NESTING_DEPTH};

use tsdojo_lexer::Lexer;
use tsdojo_types::SourceFile;

/// Lex and parse a whole submission. Lexer diagnostics come first; any
/// diagnostic at all leaves `program` empty.
pub fn parse_source(source: &SourceFile) -> ParseResult {
    let lexed = Lexer::new(source).lex();
    let parsed = Parser::new(lexed.tokens, source).parse();
    if !lexed.errors.has_errors() {
        return parsed;
    }
    let mut errors = lexed.errors;
    errors.extend(parsed.errors);
    ParseResult {
        program: None,
        errors,
    }
}
