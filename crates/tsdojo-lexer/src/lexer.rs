//! Core lexer: converts submission text to a token stream.
//!
//! Features:
//! - Reserved words, every punctuator of the subset, maximal munch
//! - Template literals with `${expr}` substitutions via a mode stack
//! - Regular expression literals wherever an operand may start
//! - `//` and `/* */` comments stripped
//! - Line-break tracking on each token for automatic semicolon insertion
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use tsdojo_types::{Diagnostic, Diagnostics, ErrorCode, SourceFile, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// Lexer mode: top-level code, template text, or a `${...}` substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Inside template text, scanning until a backtick or `${`.
    Template,
    /// Inside a substitution. `brace_depth` counts nested `{` so the
    /// substitution's own closing `}` can be recognised.
    Interpolation { brace_depth: u32 },
}

pub struct Lexer<'src> {
    chars: Vec<char>,
    source_file: &'src SourceFile,
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, in characters).
    col: u32,
    errors: Diagnostics,
    mode_stack: Vec<Mode>,
    /// Tokens to emit before the next scan (the `${` after template text).
    pending: Vec<Token>,
    /// A line terminator was skipped since the last emitted token.
    newline_before: bool,
    /// The previous token cannot end an operand, so `/` starts a regex.
    regex_allowed: bool,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: Diagnostics,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            chars: source_file.source.chars().collect(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: Diagnostics::empty(),
            mode_stack: vec![Mode::Normal],
            pending: Vec::new(),
            newline_before: false,
            regex_allowed: true,
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.total_errors >= MAX_ERRORS {
                break;
            }

            if let Some(pending) = self.pending.pop() {
                self.regex_allowed = !pending.kind.ends_operand();
                tokens.push(pending);
                continue;
            }

            let mut token = match self.current_mode() {
                Mode::Template => self.scan_template_continuation(),
                Mode::Normal | Mode::Interpolation { .. } => self.scan_normal(),
            };
            token.newline_before = std::mem::take(&mut self.newline_before);
            self.regex_allowed = !token.kind.ends_operand();

            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mode stack helpers
    // ─────────────────────────────────────────────────────────────

    fn current_mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::Normal)
    }

    fn push_mode(&mut self, mode: Mode) {
        self.mode_stack.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.mode_stack.len() > 1 {
            self.mode_stack.pop();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = Diagnostic::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace and comments, noting any line terminator crossed.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if is_line_terminator(ch) => {
                    self.newline_before = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(ch) = self.peek() {
                        if is_line_terminator(ch) {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => self.skip_block_comment(),
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_COMMENT,
                        "Unterminated comment",
                        span,
                    );
                    return;
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    return;
                }
                Some(ch) => {
                    if is_line_terminator(ch) {
                        self.newline_before = true;
                    }
                    self.advance();
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Normal-mode scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_normal(&mut self) -> Token {
        self.skip_trivia();

        if self.errors.total_errors >= MAX_ERRORS {
            return Token::new(TokenKind::Eof, self.current_span());
        }

        if self.at_end() {
            if self
                .mode_stack
                .iter()
                .any(|m| matches!(m, Mode::Template | Mode::Interpolation { .. }))
            {
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "Unterminated template literal",
                    self.current_span(),
                );
            }
            return Token::new(TokenKind::Eof, self.current_span());
        }

        let start_line = self.line;
        let start_col = self.col;
        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, self.current_span());
        };

        let kind = match ch {
            '\'' | '"' => return self.scan_string(ch, start_line, start_col),
            '`' => return self.scan_template(start_line, start_col),
            '0'..='9' => return self.scan_number(ch, start_line, start_col),
            '.' if matches!(self.peek(), Some('0'..='9')) => {
                return self.scan_number(ch, start_line, start_col)
            }
            c if is_id_start(c) => return self.scan_identifier(c, start_line, start_col),

            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '~' => TokenKind::Tilde,
            '@' => TokenKind::At,
            '#' => TokenKind::Hash,

            '{' => {
                if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                    *brace_depth += 1;
                }
                TokenKind::LBrace
            }
            '}' => {
                if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                    if *brace_depth == 0 {
                        // Closes the substitution; resume template text.
                        self.pop_mode();
                        self.push_mode(Mode::Template);
                        return Token::new(
                            TokenKind::InterpolationEnd,
                            self.span_from(start_line, start_col),
                        );
                    }
                    *brace_depth -= 1;
                }
                TokenKind::RBrace
            }

            '.' => {
                if self.peek() == Some('.') && self.peek_at(1) == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::DotDotDot
                } else {
                    TokenKind::Dot
                }
            }
            '?' => {
                if self.eat('?') {
                    if self.eat('=') {
                        TokenKind::QuestionQuestionEq
                    } else {
                        TokenKind::QuestionQuestion
                    }
                } else if self.peek() == Some('.') && !matches!(self.peek_at(1), Some('0'..='9'))
                {
                    self.advance();
                    TokenKind::QuestionDot
                } else {
                    TokenKind::Question
                }
            }
            '=' => {
                if self.eat('>') {
                    TokenKind::Arrow
                } else if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::BangEqEq
                    } else {
                        TokenKind::BangEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('*') {
                    if self.eat('=') {
                        TokenKind::StarStarEq
                    } else {
                        TokenKind::StarStar
                    }
                } else if self.eat('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            '/' if self.regex_allowed => return self.scan_regex(start_line, start_col),
            '/' => {
                if self.eat('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '^' => {
                if self.eat('=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }
            '&' => {
                if self.eat('&') {
                    if self.eat('=') {
                        TokenKind::AmpAmpEq
                    } else {
                        TokenKind::AmpAmp
                    }
                } else if self.eat('=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    if self.eat('=') {
                        TokenKind::PipePipeEq
                    } else {
                        TokenKind::PipePipe
                    }
                } else if self.eat('=') {
                    TokenKind::PipeEq
                } else {
                    TokenKind::Pipe
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') {
                        TokenKind::LessLessEq
                    } else {
                        TokenKind::LessLess
                    }
                } else if self.eat('=') {
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.peek() == Some('>') && self.peek_at(1) == Some('>') {
                    self.advance();
                    self.advance();
                    if self.eat('=') {
                        TokenKind::GreaterGreaterGreaterEq
                    } else {
                        TokenKind::GreaterGreaterGreater
                    }
                } else if self.eat('>') {
                    if self.eat('=') {
                        TokenKind::GreaterGreaterEq
                    } else {
                        TokenKind::GreaterGreater
                    }
                } else if self.eat('=') {
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }

            other => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    format!("Invalid character '{other}'"),
                    span,
                );
                // Error recovery: skip the character and try again
                return self.scan_normal();
            }
        };

        Token::new(kind, self.span_from(start_line, start_col))
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, first: char, start_line: u32, start_col: u32) -> Token {
        let radix = match (first, self.peek()) {
            ('0', Some('x' | 'X')) => Some(16),
            ('0', Some('o' | 'O')) => Some(8),
            ('0', Some('b' | 'B')) => Some(2),
            _ => None,
        };

        let value = match radix {
            Some(radix) => {
                self.advance();
                let mut value = 0f64;
                let mut digits = 0usize;
                while let Some(ch) = self.peek() {
                    if ch == '_' {
                        self.advance();
                        continue;
                    }
                    let Some(digit) = ch.to_digit(radix) else {
                        break;
                    };
                    self.advance();
                    value = value * f64::from(radix) + f64::from(digit);
                    digits += 1;
                }
                if digits == 0 {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(ErrorCode::INVALID_NUMBER, "Hexadecimal, octal or binary digit expected", span);
                }
                value
            }
            None => {
                let mut text = String::from(first);
                if first != '.' {
                    self.take_digits(&mut text);
                    if self.peek() == Some('.') {
                        self.advance();
                        text.push('.');
                    }
                }
                self.take_digits(&mut text);
                if matches!(self.peek(), Some('e' | 'E')) {
                    let signed = matches!(self.peek_at(1), Some('+' | '-'));
                    let digit_at = if signed { 2 } else { 1 };
                    if matches!(self.peek_at(digit_at), Some('0'..='9')) {
                        text.push('e');
                        self.advance();
                        if signed {
                            if let Some(sign) = self.advance() {
                                text.push(sign);
                            }
                        }
                        self.take_digits(&mut text);
                    } else {
                        self.advance();
                        let span = self.span_from(start_line, start_col);
                        self.emit_error(ErrorCode::INVALID_NUMBER, "Digit expected in exponent", span);
                    }
                }
                text.parse().unwrap_or(0.0)
            }
        };

        if self.peek() == Some('n') {
            self.advance();
            let span = self.span_from(start_line, start_col);
            self.emit_error(ErrorCode::INVALID_NUMBER, "BigInt literals are not supported", span);
        } else if self.peek().is_some_and(is_id_start) {
            let span = self.span_from(start_line, start_col);
            self.emit_error(
                ErrorCode::INVALID_NUMBER,
                "An identifier cannot immediately follow a numeric literal",
                span,
            );
        }

        Token::new(TokenKind::Number(value), self.span_from(start_line, start_col))
    }

    /// Consume decimal digits and `_` separators, appending the digits.
    fn take_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => text.push(ch),
                '_' => {}
                _ => break,
            }
            self.advance();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Regular expression literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a regex literal after its opening `/`. The body is kept as
    /// written; a `/` inside a character class does not end it.
    fn scan_regex(&mut self, start_line: u32, start_col: u32) -> Token {
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            let Some(ch) = self.peek().filter(|c| !is_line_terminator(*c)) else {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "Unterminated regular expression literal",
                    span,
                );
                break;
            };
            self.advance();
            match ch {
                '/' if !in_class => break,
                '\\' => {
                    pattern.push(ch);
                    if let Some(next) = self.peek().filter(|c| !is_line_terminator(*c)) {
                        self.advance();
                        pattern.push(next);
                    }
                }
                '[' => {
                    in_class = true;
                    pattern.push(ch);
                }
                ']' => {
                    in_class = false;
                    pattern.push(ch);
                }
                _ => pattern.push(ch),
            }
        }

        let mut flags = String::new();
        while let Some(ch) = self.peek().filter(|c| is_id_continue(*c)) {
            self.advance();
            flags.push(ch);
        }
        Token::new(
            TokenKind::Regex { pattern, flags },
            self.span_from(start_line, start_col),
        )
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, first: char, start_line: u32, start_col: u32) -> Token {
        let mut text = String::from(first);
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = TokenKind::from_keyword(&text).unwrap_or(TokenKind::Identifier(text));
        Token::new(kind, self.span_from(start_line, start_col))
    }

    // ─────────────────────────────────────────────────────────────
    // String & template literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a quoted string starting after the opening quote.
    fn scan_string(&mut self, quote: char, start_line: u32, start_col: u32) -> Token {
        let mut buf = String::new();

        loop {
            match self.peek() {
                None | Some('\n' | '\r') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(ErrorCode::UNTERMINATED_STRING, "Unterminated string literal", span);
                    break;
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => self.scan_escape_sequence(&mut buf),
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }

        Token::new(TokenKind::String(buf), self.span_from(start_line, start_col))
    }

    /// Scan a template literal starting after the opening backtick.
    ///
    /// Without substitutions this yields a single `Template` token; otherwise
    /// `TemplateStart` followed by a queued `InterpolationStart`.
    fn scan_template(&mut self, start_line: u32, start_col: u32) -> Token {
        match self.scan_template_text() {
            TemplateStop::Substitution(buf, interp_span) => {
                self.push_mode(Mode::Interpolation { brace_depth: 0 });
                self.pending
                    .push(Token::new(TokenKind::InterpolationStart, interp_span));
                Token::new(TokenKind::TemplateStart(buf), self.span_from(start_line, start_col))
            }
            TemplateStop::Closed(buf) => {
                Token::new(TokenKind::Template(buf), self.span_from(start_line, start_col))
            }
            TemplateStop::Unterminated(buf) => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(ErrorCode::UNTERMINATED_STRING, "Unterminated template literal", span);
                Token::new(TokenKind::Template(buf), span)
            }
        }
    }

    /// Continue template text after a substitution's closing `}`.
    fn scan_template_continuation(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        match self.scan_template_text() {
            TemplateStop::Substitution(buf, interp_span) => {
                self.pop_mode();
                self.push_mode(Mode::Interpolation { brace_depth: 0 });
                self.pending
                    .push(Token::new(TokenKind::InterpolationStart, interp_span));
                Token::new(TokenKind::TemplatePart(buf), self.span_from(start_line, start_col))
            }
            TemplateStop::Closed(buf) => {
                self.pop_mode();
                Token::new(TokenKind::TemplateEnd(buf), self.span_from(start_line, start_col))
            }
            TemplateStop::Unterminated(buf) => {
                self.pop_mode();
                let span = self.span_from(start_line, start_col);
                self.emit_error(ErrorCode::UNTERMINATED_STRING, "Unterminated template literal", span);
                Token::new(TokenKind::TemplateEnd(buf), span)
            }
        }
    }

    fn scan_template_text(&mut self) -> TemplateStop {
        let mut buf = String::new();
        loop {
            match self.peek() {
                None => return TemplateStop::Unterminated(buf),
                Some('`') => {
                    self.advance();
                    return TemplateStop::Closed(buf);
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    let interp_line = self.line;
                    let interp_col = self.col;
                    self.advance();
                    self.advance();
                    return TemplateStop::Substitution(buf, self.span_from(interp_line, interp_col));
                }
                Some('\\') => self.scan_escape_sequence(&mut buf),
                Some('\r') if self.peek_at(1) == Some('\n') => {
                    self.advance();
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan an escape sequence at the current `\`, appending its value.
    fn scan_escape_sequence(&mut self, buf: &mut String) {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        let Some(ch) = self.advance() else {
            let span = self.span_from(start_line, start_col);
            self.emit_error(
                ErrorCode::UNTERMINATED_STRING,
                "Unexpected end of file in escape sequence",
                span,
            );
            return;
        };

        match ch {
            'n' => buf.push('\n'),
            't' => buf.push('\t'),
            'r' => buf.push('\r'),
            'b' => buf.push('\u{8}'),
            'f' => buf.push('\u{c}'),
            'v' => buf.push('\u{b}'),
            '0' if !matches!(self.peek(), Some('0'..='9')) => buf.push('\0'),
            // Line continuation
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                self.eat('\n');
            }
            'x' => match self.read_hex_digits(2) {
                Some(code) => buf.push(char::from_u32(code).unwrap_or('\u{fffd}')),
                None => self.invalid_escape(start_line, start_col, "Hexadecimal digit expected"),
            },
            'u' => match self.read_unicode_escape() {
                Some(c) => buf.push(c),
                None => self.invalid_escape(start_line, start_col, "Invalid Unicode escape sequence"),
            },
            other => buf.push(other),
        }
    }

    fn invalid_escape(&mut self, start_line: u32, start_col: u32, message: &str) {
        let span = self.span_from(start_line, start_col);
        self.emit_error(ErrorCode::INVALID_ESCAPE, message, span);
    }

    /// `\u` already consumed: `{H..}` or four hex digits, joining a
    /// following low surrogate escape when present.
    fn read_unicode_escape(&mut self) -> Option<char> {
        if self.eat('{') {
            let mut code = 0u32;
            let mut digits = 0;
            while let Some(digit) = self.peek().and_then(|c| c.to_digit(16)) {
                self.advance();
                code = code.checked_mul(16)?.checked_add(digit)?;
                digits += 1;
            }
            if digits == 0 || !self.eat('}') {
                return None;
            }
            return char::from_u32(code);
        }

        let unit = self.read_hex_digits(4)?;
        if (0xD800..=0xDBFF).contains(&unit)
            && self.peek() == Some('\\')
            && self.peek_at(1) == Some('u')
            && (2..6).all(|i| self.peek_at(i).is_some_and(|c| c.is_ascii_hexdigit()))
        {
            let low: u32 = (2..6)
                .filter_map(|i| self.peek_at(i).and_then(|c| c.to_digit(16)))
                .fold(0, |acc, d| acc * 16 + d);
            if (0xDC00..=0xDFFF).contains(&low) {
                for _ in 0..6 {
                    self.advance();
                }
                let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(combined);
            }
        }
        Some(char::from_u32(unit).unwrap_or('\u{fffd}'))
    }

    fn read_hex_digits(&mut self, count: usize) -> Option<u32> {
        if !(0..count).all(|i| self.peek_at(i).is_some_and(|c| c.is_ascii_hexdigit())) {
            return None;
        }
        let mut value = 0u32;
        for _ in 0..count {
            let digit = self.advance().and_then(|c| c.to_digit(16))?;
            value = value * 16 + digit;
        }
        Some(value)
    }
}

enum TemplateStop {
    /// Reached `${`; carries the text so far and the span of the `${`.
    Substitution(String, Span),
    Closed(String),
    Unterminated(String),
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_id_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch.is_alphabetic()
}

fn is_id_continue(ch: char) -> bool {
    is_id_start(ch) || ch.is_alphanumeric() || ch == '\u{200c}' || ch == '\u{200d}'
}
