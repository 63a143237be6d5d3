//! Type annotation skipping.
//!
//! Types carry no runtime meaning, so they are recognised and consumed
//! without building any tree. The grammar accepted here:
//!
//! ```ebnf
//! Type        = FunctionType | Union [ "extends" Union "?" Type ":" Type ] ;
//! FunctionType= [ "new" ] [ TypeParams ] "(" ... ")" "=>" Type ;
//! Union       = [ "|" ] Intersection { "|" Intersection } ;
//! Intersection= [ "&" ] Postfix { "&" Postfix } ;
//! Postfix     = Primary { "[" [ Type ] "]" } ;
//! Primary     = Name { "." Name } [ TypeArgs ] [ "is" Type ]
//!             | "typeof" Name { "." Name } | ("keyof" | "readonly" | "unique") Postfix
//!             | "infer" Identifier | Literal | Template
//!             | "{" ... "}" | "[" ... "]" | "(" Type ")" ;
//! ```

use tsdojo_lexer::token::TokenKind;
use tsdojo_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Skip `: Type` if present.
    pub(crate) fn skip_type_annotation(&mut self) -> Option<()> {
        if self.eat(&TokenKind::Colon) {
            self.skip_type()?;
        }
        Some(())
    }

    pub(crate) fn skip_type(&mut self) -> Option<()> {
        if !self.enter() {
            return None;
        }
        let result = self.skip_type_inner();
        self.leave();
        result
    }

    fn skip_type_inner(&mut self) -> Option<()> {
        if self.check_word("abstract") && *self.look_ahead(1) == TokenKind::New {
            self.advance();
        }
        let constructor = self.eat(&TokenKind::New);
        if constructor
            || self.check_exact(&TokenKind::Less)
            || (self.check_exact(&TokenKind::LParen) && self.function_type_ahead())
        {
            self.skip_type_params()?;
            self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
            self.expect(&TokenKind::Arrow)?;
            return self.skip_type();
        }

        self.skip_union_type()?;

        if self.check_exact(&TokenKind::Extends) && !self.newline_before() {
            self.advance();
            self.skip_union_type()?;
            self.expect(&TokenKind::Question)?;
            self.skip_type()?;
            self.expect(&TokenKind::Colon)?;
            self.skip_type()?;
        }
        Some(())
    }

    /// At `(`: does the matching `)` precede `=>`?
    fn function_type_ahead(&self) -> bool {
        self.matching_close_offset(0)
            .is_some_and(|close| *self.look_ahead(close + 1) == TokenKind::Arrow)
    }

    /// Offset (from the cursor) of the `)` matching the `(` at `offset`.
    pub(crate) fn matching_close_offset(&self, offset: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut n = offset;
        loop {
            match self.look_ahead(n) {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(n);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
            n += 1;
        }
    }

    fn skip_union_type(&mut self) -> Option<()> {
        self.eat(&TokenKind::Pipe);
        self.skip_intersection_type()?;
        while self.eat(&TokenKind::Pipe) {
            self.skip_intersection_type()?;
        }
        Some(())
    }

    fn skip_intersection_type(&mut self) -> Option<()> {
        self.eat(&TokenKind::Amp);
        self.skip_postfix_type()?;
        while self.eat(&TokenKind::Amp) {
            self.skip_postfix_type()?;
        }
        Some(())
    }

    fn skip_postfix_type(&mut self) -> Option<()> {
        self.skip_primary_type()?;
        while self.check_exact(&TokenKind::LBracket) && !self.newline_before() {
            self.advance();
            if !self.eat(&TokenKind::RBracket) {
                self.skip_type()?;
                self.expect(&TokenKind::RBracket)?;
            }
        }
        Some(())
    }

    fn skip_primary_type(&mut self) -> Option<()> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(word)
                if matches!(word.as_str(), "keyof" | "readonly" | "unique")
                    && starts_type(self.look_ahead(1)) =>
            {
                self.advance();
                self.skip_postfix_type()
            }
            TokenKind::Identifier(word) if word == "infer" => {
                self.advance();
                self.expect_identifier()?;
                Some(())
            }
            TokenKind::Identifier(word)
                if word == "asserts"
                    && matches!(self.look_ahead(1), TokenKind::Identifier(_) | TokenKind::This) =>
            {
                self.advance();
                self.advance();
                if self.eat_word("is") {
                    self.skip_type()?;
                }
                Some(())
            }
            TokenKind::TypeOf => {
                self.advance();
                self.expect_property_name()?;
                while self.eat(&TokenKind::Dot) {
                    self.expect_property_name()?;
                }
                Some(())
            }
            TokenKind::Identifier(_)
            | TokenKind::Null
            | TokenKind::Void
            | TokenKind::This
            | TokenKind::True
            | TokenKind::False => {
                self.advance();
                while self.eat(&TokenKind::Dot) {
                    self.expect_property_name()?;
                }
                if self.check_exact(&TokenKind::Less) {
                    self.skip_type_args()?;
                }
                // Type predicate: `value is string`
                if self.check_word("is") && !self.newline_before() {
                    self.advance();
                    self.skip_type()?;
                }
                Some(())
            }
            TokenKind::Number(_) | TokenKind::String(_) | TokenKind::Template(_) => {
                self.advance();
                Some(())
            }
            TokenKind::Minus if matches!(self.look_ahead(1), TokenKind::Number(_)) => {
                self.advance();
                self.advance();
                Some(())
            }
            TokenKind::TemplateStart(_) => {
                self.advance();
                loop {
                    self.expect(&TokenKind::InterpolationStart)?;
                    self.skip_type()?;
                    self.expect(&TokenKind::InterpolationEnd)?;
                    match self.peek_kind() {
                        TokenKind::TemplatePart(_) => {
                            self.advance();
                        }
                        TokenKind::TemplateEnd(_) => {
                            self.advance();
                            return Some(());
                        }
                        other => {
                            let message = format!("Template continuation expected, got '{other}'");
                            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                            return None;
                        }
                    }
                }
            }
            TokenKind::LBrace => self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace),
            TokenKind::LBracket => self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket),
            TokenKind::LParen => {
                self.advance();
                self.skip_type()?;
                self.expect(&TokenKind::RParen)?;
                Some(())
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Type expected, got '{other}'"),
                );
                None
            }
        }
    }

    /// Skip `<T, U>` type arguments.
    pub(crate) fn skip_type_args(&mut self) -> Option<()> {
        self.expect(&TokenKind::Less)?;
        loop {
            self.skip_type()?;
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing_angle()
    }

    /// Skip `<T extends X = Y, ...>` type parameters if present.
    pub(crate) fn skip_type_params(&mut self) -> Option<()> {
        if !self.eat(&TokenKind::Less) {
            return Some(());
        }
        loop {
            if self.check_exact(&TokenKind::Greater) {
                break;
            }
            if matches!(self.look_ahead(1), TokenKind::Identifier(_)) {
                // `const T`, `in T`, `out T`
                if self.check_exact(&TokenKind::Const)
                    || self.check_exact(&TokenKind::In)
                    || self.check_word("out")
                {
                    self.advance();
                }
            }
            self.expect_identifier()?;
            if self.eat(&TokenKind::Extends) {
                self.skip_type()?;
            }
            if self.eat(&TokenKind::Eq) {
                self.skip_type()?;
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing_angle()
    }

    /// Skip from an opening delimiter to its matching close.
    pub(crate) fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> Option<()> {
        let start = self.current_span();
        self.expect(&open)?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.at_end() {
                self.error_at(
                    ErrorCode::UNCLOSED_DELIMITER,
                    format!("'{close}' expected to close '{open}'"),
                    start,
                );
                return None;
            }
            let kind = self.advance().kind;
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
            }
        }
        Some(())
    }
}

fn starts_type(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier(_)
            | TokenKind::LBracket
            | TokenKind::LParen
            | TokenKind::LBrace
            | TokenKind::TypeOf
            | TokenKind::Null
            | TokenKind::Void
            | TokenKind::This
            | TokenKind::String(_)
            | TokenKind::Number(_)
    )
}
