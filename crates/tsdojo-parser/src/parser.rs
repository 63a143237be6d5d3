//! Core parser infrastructure: token cursor, error reporting, helpers.

use tsdojo_lexer::token::{Token, TokenKind};
use tsdojo_types::ast::{ExportEntry, Ident, Program};
use tsdojo_types::{Checkpoint, Diagnostic, Diagnostics, ErrorCode, SourceFile, Span, MAX_ERRORS};

/// Maximum combined statement/expression/type nesting depth.
pub const MAX_NESTING_DEPTH: u32 = 200;

/// The tsdojo parser.
///
/// Consumes a token stream produced by the lexer and builds an AST.
/// Collects errors and attempts recovery at statement boundaries.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source_file: &'src SourceFile,
    errors: Diagnostics,
    /// `>>`-style tokens split while closing type argument lists, kept so a
    /// rollback can restore them.
    splits: Vec<(usize, Token)>,
    pub(crate) depth: u32,
    /// Inside a function body (`return` allowed).
    pub(crate) in_function: bool,
    /// Inside a non-async function body (`await` rejected).
    pub(crate) in_sync_function: bool,
    /// Parsing a `for` head, where a bare `in` ends the expression.
    pub(crate) no_in: bool,
    /// Enclosing loops and switches of the current function body, for
    /// validating `break` and `continue`.
    pub(crate) loops: u32,
    pub(crate) switches: u32,
    pub(crate) labels: Vec<String>,
    pub(crate) exports: Vec<ExportEntry>,
}

/// Result of parsing.
pub struct ParseResult {
    /// `None` when any error was reported.
    pub program: Option<Program>,
    pub errors: Diagnostics,
}

/// Saved cursor state for speculative parsing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rewind {
    pos: usize,
    splits: usize,
    depth: u32,
    diagnostics: Checkpoint,
}

impl<'src> Parser<'src> {
    pub fn new(mut tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span).unwrap_or(Span::point(1, 1));
            tokens.push(Token::new(TokenKind::Eof, end));
        }
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: Diagnostics::empty(),
            splits: Vec::new(),
            depth: 0,
            in_function: false,
            in_sync_function: false,
            no_in: false,
            loops: 0,
            switches: 0,
            labels: Vec::new(),
            exports: Vec::new(),
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token; past the end this is the final `Eof`.
    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Cursor position, for detecting progress.
    pub(crate) fn pos_marker(&self) -> usize {
        self.pos
    }

    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// Current token is the contextual keyword `word`.
    pub(crate) fn check_word(&self, word: &str) -> bool {
        self.peek_kind().is_word(word)
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// Whether a line break precedes the token `n` positions ahead.
    pub(crate) fn newline_before_ahead(&self, n: usize) -> bool {
        self.tokens
            .get(self.pos + n)
            .is_some_and(|t| t.newline_before)
    }

    pub(crate) fn newline_before(&self) -> bool {
        self.peek().newline_before
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("'{}' expected, got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    /// Expect a binding identifier (not a reserved word).
    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Identifier expected, got '{other}'"),
                );
                None
            }
        }
    }

    /// Expect a property name after `.` or in a literal: identifiers and
    /// reserved words both qualify.
    pub(crate) fn expect_property_name(&mut self) -> Option<Ident> {
        if self.check_exact(&TokenKind::Hash) {
            self.error_at_current(
                ErrorCode::UNSUPPORTED_SYNTAX,
                "Private names ('#name') are not supported; use 'private' instead",
            );
            return None;
        }
        match self.peek_kind().name_text().map(str::to_string) {
            Some(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            None => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Property name expected, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    /// Expect a `>` closing a type argument list, splitting `>>`, `>>>`,
    /// `>=`, `>>=` and `>>>=` tokens so the remainder stays in the stream.
    pub(crate) fn expect_closing_angle(&mut self) -> Option<()> {
        let rest = match self.peek_kind() {
            TokenKind::Greater => {
                self.advance();
                return Some(());
            }
            TokenKind::GreaterGreater => TokenKind::Greater,
            TokenKind::GreaterGreaterGreater => TokenKind::GreaterGreater,
            TokenKind::GreaterEq => TokenKind::Eq,
            TokenKind::GreaterGreaterEq => TokenKind::GreaterEq,
            TokenKind::GreaterGreaterGreaterEq => TokenKind::GreaterGreaterEq,
            other => {
                let message = format!("'>' expected, got '{other}'");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                return None;
            }
        };
        let original = self.peek().clone();
        let span = original.span;
        let rest_span = Span::new(span.start_line, span.start_col + 1, span.end_line, span.end_col);
        self.splits.push((self.pos, original));
        self.tokens[self.pos] = Token::new(TokenKind::Greater, Span::point(span.start_line, span.start_col));
        self.tokens.insert(self.pos + 1, Token::new(rest, rest_span));
        self.advance();
        Some(())
    }

    /// Consume a statement terminator, applying automatic semicolon insertion.
    pub(crate) fn consume_semicolon(&mut self) -> Option<()> {
        if self.eat(&TokenKind::Semicolon) {
            return Some(());
        }
        if self.newline_before() || self.check_exact(&TokenKind::RBrace) || self.at_end() {
            return Some(());
        }
        self.error_at_current(
            ErrorCode::UNEXPECTED_TOKEN,
            format!("';' expected, got '{}'", self.peek_kind()),
        );
        None
    }

    // ── Nesting ───────────────────────────────────────────────────────────────

    /// Enter one nesting level; reports an error past [`MAX_NESTING_DEPTH`].
    pub(crate) fn enter(&mut self) -> bool {
        if self.depth >= MAX_NESTING_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("maximum nesting depth is {MAX_NESTING_DEPTH}"),
            );
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ── Speculation ───────────────────────────────────────────────────────────

    pub(crate) fn rewind_point(&self) -> Rewind {
        Rewind {
            pos: self.pos,
            splits: self.splits.len(),
            depth: self.depth,
            diagnostics: self.errors.checkpoint(),
        }
    }

    pub(crate) fn rewind(&mut self, point: Rewind) {
        while self.splits.len() > point.splits {
            if let Some((index, original)) = self.splits.pop() {
                self.tokens.remove(index + 1);
                self.tokens[index] = original;
            }
        }
        self.pos = point.pos;
        self.depth = point.depth;
        self.errors.rollback(point.diagnostics);
    }

    /// Run `f` speculatively: on failure (no result, or any new error) the
    /// cursor and diagnostics are restored and `None` is returned.
    pub(crate) fn try_parse<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let point = self.rewind_point();
        let before = self.errors.total_errors;
        match f(self) {
            Some(value) if self.errors.total_errors == before => Some(value),
            _ => {
                self.rewind(point);
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report an error at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    /// Report an error at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let error = Diagnostic::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(error);
    }

    /// Returns `true` if we've hit the error limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= MAX_ERRORS
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip tokens until a likely statement boundary: after a `;`, before a
    /// `}`, or before the first token that starts a new line.
    pub(crate) fn synchronize(&mut self) {
        let start = self.pos;
        while !self.at_end() {
            if self.eat(&TokenKind::Semicolon) {
                return;
            }
            if self.check_exact(&TokenKind::RBrace) {
                return;
            }
            if self.pos != start && self.newline_before() {
                return;
            }
            self.advance();
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a [`Program`].
    pub fn parse(mut self) -> ParseResult {
        let program = self.parse_program();
        let program = if self.errors.has_errors() {
            None
        } else {
            Some(program)
        };
        ParseResult {
            program,
            errors: self.errors,
        }
    }
}
