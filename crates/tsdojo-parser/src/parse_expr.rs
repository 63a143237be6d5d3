//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 1. `,` (sequence)
//! 2. assignment, arrow functions
//! 3. `? :`
//! 4. `||`, `??`
//! 5. `&&`
//! 6. `|`, 7. `^`, 8. `&`
//! 9. `==`, `!=`, `===`, `!==`
//! 10. `<`, `>`, `<=`, `>=`, `instanceof`, `in`, `as`, `satisfies`
//! 11. `<<`, `>>`, `>>>`
//! 12. `+`, `-`
//! 13. `*`, `/`, `%`
//! 14. `**` (right-associative)
//! 15. unary, `await`, prefix `++`/`--`
//! 16. postfix `++`/`--`
//! 17. member access, calls, `new`, optional chains

use std::rc::Rc;

use tsdojo_lexer::token::TokenKind;
use tsdojo_types::ast::*;
use tsdojo_types::{format_number, ErrorCode, Span};

use crate::parser::Parser;

/// A binary-level operator recognised in the precedence loop.
#[derive(Debug, Clone, Copy, PartialEq)]
enum InfixOp {
    Binary(BinOp),
    Logical(LogicalOp),
    /// `expr as T` / `expr satisfies T`: the type is skipped.
    TypeAssertion,
}

const RELATIONAL_PREC: u8 = 10;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Points
    // ══════════════════════════════════════════════════════════════════════════

    /// `Expression = Assignment { "," Assignment }`
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        let first = self.parse_assignment()?;
        if !self.check_exact(&TokenKind::Comma) {
            return Some(first);
        }
        let mut span = first.span;
        let mut exprs = vec![first];
        while self.eat(&TokenKind::Comma) {
            let next = self.parse_assignment()?;
            span = span.merge(next.span);
            exprs.push(next);
        }
        Some(Expr::new(ExprKind::Sequence(exprs), span))
    }

    pub(crate) fn parse_assignment(&mut self) -> Option<Expr> {
        if !self.enter() {
            return None;
        }
        let result = self.parse_assignment_inner();
        self.leave();
        result
    }

    /// Run `f` with the `in` operator enabled (inside brackets and bodies).
    pub(crate) fn allowing_in<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn parse_assignment_inner(&mut self) -> Option<Expr> {
        if let Some(arrow) = self.parse_arrow_if_present() {
            return arrow;
        }

        let left = self.parse_conditional()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Compound(BinOp::Add),
            TokenKind::MinusEq => AssignOp::Compound(BinOp::Sub),
            TokenKind::StarEq => AssignOp::Compound(BinOp::Mul),
            TokenKind::SlashEq => AssignOp::Compound(BinOp::Div),
            TokenKind::PercentEq => AssignOp::Compound(BinOp::Mod),
            TokenKind::StarStarEq => AssignOp::Compound(BinOp::Exp),
            TokenKind::LessLessEq => AssignOp::Compound(BinOp::Shl),
            TokenKind::GreaterGreaterEq => AssignOp::Compound(BinOp::Shr),
            TokenKind::GreaterGreaterGreaterEq => AssignOp::Compound(BinOp::UShr),
            TokenKind::AmpEq => AssignOp::Compound(BinOp::BitAnd),
            TokenKind::PipeEq => AssignOp::Compound(BinOp::BitOr),
            TokenKind::CaretEq => AssignOp::Compound(BinOp::BitXor),
            TokenKind::AmpAmpEq => AssignOp::Logical(LogicalOp::And),
            TokenKind::PipePipeEq => AssignOp::Logical(LogicalOp::Or),
            TokenKind::QuestionQuestionEq => AssignOp::Logical(LogicalOp::Nullish),
            _ => return Some(left),
        };
        let target = self.expr_to_pattern(left, op == AssignOp::Assign)?;
        self.advance();
        let value = self.parse_assignment()?;
        let span = target.span().merge(value.span);
        Some(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Arrow Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an arrow function when one starts here. The outer `None` means
    /// "not an arrow"; the inner option is the committed parse result.
    fn parse_arrow_if_present(&mut self) -> Option<Option<Expr>> {
        let is_async = self.check_word("async")
            && !self.newline_before_ahead(1)
            && matches!(
                self.look_ahead(1),
                TokenKind::Identifier(_) | TokenKind::LParen | TokenKind::Less
            );
        let head = usize::from(is_async);

        match self.look_ahead(head) {
            TokenKind::Identifier(_) if *self.look_ahead(head + 1) == TokenKind::Arrow => {
                Some(self.parse_arrow_function(is_async))
            }
            TokenKind::LParen => {
                let close = self.matching_close_offset(head)?;
                match self.look_ahead(close + 1) {
                    TokenKind::Arrow => Some(self.parse_arrow_function(is_async)),
                    // `(a): T => ...` or a conditional's `:`; only speculation can tell.
                    TokenKind::Colon => self
                        .try_parse(|p| p.parse_arrow_function(is_async))
                        .map(Some),
                    _ => None,
                }
            }
            TokenKind::Less => self
                .try_parse(|p| p.parse_arrow_function(is_async))
                .map(Some),
            _ => None,
        }
    }

    fn parse_arrow_function(&mut self, is_async: bool) -> Option<Expr> {
        let start = self.current_span();
        if is_async {
            self.advance();
        }
        self.skip_type_params()?;
        let params = if let TokenKind::Identifier(_) = self.peek_kind() {
            let name = self.expect_identifier()?;
            let span = name.span;
            vec![Param {
                pattern: Pattern::Ident(name),
                rest: false,
                property: false,
                span,
            }]
        } else {
            self.parse_params()?
        };
        self.skip_type_annotation()?;
        if self.newline_before() && self.check_exact(&TokenKind::Arrow) {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "Line terminator not permitted before arrow",
            );
            return None;
        }
        self.expect(&TokenKind::Arrow)?;

        let body = if self.check_exact(&TokenKind::LBrace) {
            FunctionBody::Block(self.parse_function_body(is_async)?)
        } else {
            let saved = std::mem::replace(&mut self.in_sync_function, !is_async);
            let body = self.parse_assignment();
            self.in_sync_function = saved;
            FunctionBody::Expr(Box::new(body?))
        };
        let span = start.merge(self.previous_span());
        let def = FunctionDef {
            name: None,
            params,
            body,
            is_arrow: true,
            is_async,
            span,
        };
        Some(Expr::new(ExprKind::Function(Rc::new(def)), span))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Conditional = Binary [ "?" Assignment ":" Assignment ]`
    fn parse_conditional(&mut self) -> Option<Expr> {
        let test = self.parse_binary(0)?;
        if !self.eat(&TokenKind::Question) {
            return Some(test);
        }
        let consequent = self.allowing_in(|p| p.parse_assignment())?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;
        let span = test.span.merge(alternate.span);
        Some(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    /// Precedence climbing over every binary-level operator.
    fn parse_binary(&mut self, min_prec: u8) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        while let Some((prec, op)) = self.infix_op() {
            if prec < min_prec {
                break;
            }
            self.advance();
            if op == InfixOp::TypeAssertion {
                // `as const` keeps the value as is.
                if !self.eat(&TokenKind::Const) {
                    self.skip_type()?;
                }
                left.span = left.span.merge(self.previous_span());
                continue;
            }
            let right_min = if op == InfixOp::Binary(BinOp::Exp) {
                prec
            } else {
                prec + 1
            };
            let right = self.parse_binary(right_min)?;
            let span = left.span.merge(right.span);
            let kind = match op {
                InfixOp::Binary(op) => ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                InfixOp::Logical(op) => ExprKind::Logical {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                InfixOp::TypeAssertion => unreachable!("handled above"),
            };
            left = Expr::new(kind, span);
        }
        Some(left)
    }

    fn infix_op(&self) -> Option<(u8, InfixOp)> {
        use InfixOp::{Binary, Logical};
        Some(match self.peek_kind() {
            TokenKind::PipePipe => (4, Logical(LogicalOp::Or)),
            TokenKind::QuestionQuestion => (4, Logical(LogicalOp::Nullish)),
            TokenKind::AmpAmp => (5, Logical(LogicalOp::And)),
            TokenKind::Pipe => (6, Binary(BinOp::BitOr)),
            TokenKind::Caret => (7, Binary(BinOp::BitXor)),
            TokenKind::Amp => (8, Binary(BinOp::BitAnd)),
            TokenKind::EqEq => (9, Binary(BinOp::Eq)),
            TokenKind::BangEq => (9, Binary(BinOp::NotEq)),
            TokenKind::EqEqEq => (9, Binary(BinOp::StrictEq)),
            TokenKind::BangEqEq => (9, Binary(BinOp::StrictNotEq)),
            TokenKind::Less => (RELATIONAL_PREC, Binary(BinOp::Less)),
            TokenKind::Greater => (RELATIONAL_PREC, Binary(BinOp::Greater)),
            TokenKind::LessEq => (RELATIONAL_PREC, Binary(BinOp::LessEq)),
            TokenKind::GreaterEq => (RELATIONAL_PREC, Binary(BinOp::GreaterEq)),
            TokenKind::InstanceOf => (RELATIONAL_PREC, Binary(BinOp::InstanceOf)),
            TokenKind::In if !self.no_in => (RELATIONAL_PREC, Binary(BinOp::In)),
            TokenKind::Identifier(word)
                if (word == "as" || word == "satisfies") && !self.newline_before() =>
            {
                (RELATIONAL_PREC, InfixOp::TypeAssertion)
            }
            TokenKind::LessLess => (11, Binary(BinOp::Shl)),
            TokenKind::GreaterGreater => (11, Binary(BinOp::Shr)),
            TokenKind::GreaterGreaterGreater => (11, Binary(BinOp::UShr)),
            TokenKind::Plus => (12, Binary(BinOp::Add)),
            TokenKind::Minus => (12, Binary(BinOp::Sub)),
            TokenKind::Star => (13, Binary(BinOp::Mul)),
            TokenKind::Slash => (13, Binary(BinOp::Div)),
            TokenKind::Percent => (13, Binary(BinOp::Mod)),
            TokenKind::StarStar => (14, Binary(BinOp::Exp)),
            _ => return None,
        })
    }

    /// `Unary = ("!" | "-" | "+" | "~" | "typeof" | "void" | "delete" | "await") Unary
    ///        | ("++" | "--") Unary | "<" Type ">" Unary | Postfix`
    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::TypeOf => UnaryOp::TypeOf,
            TokenKind::Void => UnaryOp::Void,
            TokenKind::Delete => UnaryOp::Delete,
            TokenKind::Await => return self.parse_await(),
            TokenKind::PlusPlus | TokenKind::MinusMinus => return self.parse_prefix_update(),
            TokenKind::Less => {
                // Angle-bracket type assertion: `<T>value`
                self.advance();
                self.skip_type()?;
                self.expect_closing_angle()?;
                return self.parse_nested_unary();
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_nested_unary()?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_nested_unary(&mut self) -> Option<Expr> {
        if !self.enter() {
            return None;
        }
        let result = self.parse_unary();
        self.leave();
        result
    }

    fn parse_await(&mut self) -> Option<Expr> {
        let start = self.current_span();
        if self.in_sync_function {
            self.error_at_current(
                ErrorCode::ILLEGAL_STATEMENT,
                "'await' expressions are only allowed within async functions and at the top level",
            );
        }
        self.advance();
        let operand = self.parse_nested_unary()?;
        let span = start.merge(operand.span);
        Some(Expr::new(ExprKind::Await(Box::new(operand)), span))
    }

    fn parse_prefix_update(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let op = if self.advance().kind == TokenKind::PlusPlus {
            UpdateOp::Increment
        } else {
            UpdateOp::Decrement
        };
        let target = self.parse_nested_unary()?;
        self.check_update_target(&target)?;
        let span = start.merge(target.span);
        Some(Expr::new(
            ExprKind::Update {
                op,
                prefix: true,
                target: Box::new(target),
            },
            span,
        ))
    }

    /// `Postfix = CallChain [ "++" | "--" ]` (no line break before the operator)
    fn parse_postfix(&mut self) -> Option<Expr> {
        let expr = self.parse_lhs()?;
        let op = match self.peek_kind() {
            TokenKind::PlusPlus if !self.newline_before() => UpdateOp::Increment,
            TokenKind::MinusMinus if !self.newline_before() => UpdateOp::Decrement,
            _ => return Some(expr),
        };
        self.check_update_target(&expr)?;
        self.advance();
        let span = expr.span.merge(self.previous_span());
        Some(Expr::new(
            ExprKind::Update {
                op,
                prefix: false,
                target: Box::new(expr),
            },
            span,
        ))
    }

    fn check_update_target(&mut self, target: &Expr) -> Option<()> {
        match &target.kind {
            ExprKind::Identifier(_) | ExprKind::Member { optional: false, .. } => Some(()),
            ExprKind::SuperMember(_) => Some(()),
            _ => {
                self.error_at(
                    ErrorCode::INVALID_ASSIGNMENT_TARGET,
                    "The operand of an increment or decrement operator must be a variable or a property access",
                    target.span,
                );
                None
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Member Access & Calls
    // ══════════════════════════════════════════════════════════════════════════

    /// A left-hand-side expression: primary or `new`, then its access/call chain.
    pub(crate) fn parse_lhs(&mut self) -> Option<Expr> {
        let head = match self.peek_kind() {
            TokenKind::New => self.parse_new()?,
            TokenKind::Super => self.parse_super()?,
            _ => self.parse_primary()?,
        };
        self.parse_call_tail(head, true)
    }

    fn parse_call_tail(&mut self, mut expr: Expr, allow_calls: bool) -> Option<Expr> {
        let mut in_chain = false;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_property_name()?;
                    expr = member(expr, MemberProp::Static(name.name), false, name.span);
                }
                TokenKind::QuestionDot if allow_calls => {
                    self.advance();
                    in_chain = true;
                    match self.peek_kind() {
                        TokenKind::LParen => {
                            let args = self.parse_arguments()?;
                            expr = call(expr, args, true, self.previous_span());
                        }
                        TokenKind::LBracket => {
                            self.advance();
                            let prop = self.allowing_in(|p| p.parse_expression())?;
                            self.expect(&TokenKind::RBracket)?;
                            expr = member(
                                expr,
                                MemberProp::Computed(Box::new(prop)),
                                true,
                                self.previous_span(),
                            );
                        }
                        _ => {
                            let name = self.expect_property_name()?;
                            expr = member(expr, MemberProp::Static(name.name), true, name.span);
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let prop = self.allowing_in(|p| p.parse_expression())?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = member(
                        expr,
                        MemberProp::Computed(Box::new(prop)),
                        false,
                        self.previous_span(),
                    );
                }
                TokenKind::LParen if allow_calls => {
                    let args = self.parse_arguments()?;
                    expr = call(expr, args, false, self.previous_span());
                }
                // Explicit type arguments on a call: `parse<number>(text)`
                TokenKind::Less if allow_calls => {
                    let generic_call = self.try_parse(|p| {
                        p.skip_type_args()?;
                        p.check_exact(&TokenKind::LParen).then_some(())
                    });
                    if generic_call.is_none() {
                        break;
                    }
                }
                // Non-null assertion: `value!`
                TokenKind::Bang if !self.newline_before() => {
                    self.advance();
                }
                TokenKind::Template(_) | TokenKind::TemplateStart(_) => {
                    self.error_at_current(
                        ErrorCode::UNSUPPORTED_SYNTAX,
                        "Tagged template literals are not supported",
                    );
                    return None;
                }
                _ => break,
            }
        }
        if in_chain {
            let span = expr.span;
            expr = Expr::new(ExprKind::OptionalChain(Box::new(expr)), span);
        }
        Some(expr)
    }

    fn parse_new(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.expect(&TokenKind::New)?;
        if self.check_exact(&TokenKind::Dot) {
            self.error_at_current(
                ErrorCode::UNSUPPORTED_SYNTAX,
                "'new.target' is not supported",
            );
            return None;
        }
        if !self.enter() {
            return None;
        }
        let callee = match self.peek_kind() {
            TokenKind::New => self.parse_new(),
            _ => self.parse_primary(),
        };
        self.leave();
        let callee = self.parse_call_tail(callee?, false)?;
        if self.check_exact(&TokenKind::Less) {
            self.try_parse(|p| p.skip_type_args());
        }
        let args = if self.check_exact(&TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let span = start.merge(self.previous_span());
        Some(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }

    fn parse_super(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.expect(&TokenKind::Super)?;
        let kind = match self.peek_kind() {
            TokenKind::LParen => ExprKind::SuperCall(self.parse_arguments()?),
            TokenKind::Dot => {
                self.advance();
                let name = self.expect_property_name()?;
                ExprKind::SuperMember(MemberProp::Static(name.name))
            }
            TokenKind::LBracket => {
                self.advance();
                let prop = self.allowing_in(|p| p.parse_expression())?;
                self.expect(&TokenKind::RBracket)?;
                ExprKind::SuperMember(MemberProp::Computed(Box::new(prop)))
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "'super' must be followed by an argument list or member access",
                );
                return None;
            }
        };
        Some(Expr::new(kind, start.merge(self.previous_span())))
    }

    /// `Arguments = "(" [ ["..."] Assignment { "," ["..."] Assignment } [","] ] ")"`
    pub(crate) fn parse_arguments(&mut self) -> Option<Vec<Argument>> {
        self.expect(&TokenKind::LParen)?;
        let args = self.allowing_in(|p| {
            let mut args = Vec::new();
            while !p.check_exact(&TokenKind::RParen) {
                let spread = p.eat(&TokenKind::DotDotDot);
                let expr = p.parse_assignment()?;
                args.push(Argument { expr, spread });
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Some(args)
        })?;
        self.expect(&TokenKind::RParen)?;
        Some(args)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        match self.peek_kind().clone() {
            // ── Literals ────────────────────────────────────────────────
            TokenKind::Number(n) => {
                self.advance();
                Some(Expr::new(ExprKind::Number(n), start))
            }
            TokenKind::String(s) => {
                self.advance();
                Some(Expr::new(ExprKind::String(s), start))
            }
            TokenKind::Template(s) => {
                self.advance();
                Some(Expr::new(
                    ExprKind::Template {
                        quasis: vec![s],
                        exprs: Vec::new(),
                    },
                    start,
                ))
            }
            TokenKind::TemplateStart(s) => {
                self.advance();
                self.parse_template(s, start)
            }
            TokenKind::True => {
                self.advance();
                Some(Expr::new(ExprKind::Bool(true), start))
            }
            TokenKind::False => {
                self.advance();
                Some(Expr::new(ExprKind::Bool(false), start))
            }
            TokenKind::Null => {
                self.advance();
                Some(Expr::new(ExprKind::Null, start))
            }
            TokenKind::Regex { pattern, flags } => {
                self.advance();
                Some(Expr::new(ExprKind::Regex { pattern, flags }, start))
            }
            TokenKind::This => {
                self.advance();
                Some(Expr::new(ExprKind::This, start))
            }

            // ── Collections ─────────────────────────────────────────────
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),

            // ── Grouping ────────────────────────────────────────────────
            TokenKind::LParen => {
                self.advance();
                let inner = self.allowing_in(|p| p.parse_expression())?;
                self.expect(&TokenKind::RParen)?;
                Some(inner)
            }

            // ── Functions & classes ─────────────────────────────────────
            TokenKind::Function => self.parse_function_expression(false),
            TokenKind::Identifier(ref word)
                if word == "async"
                    && *self.look_ahead(1) == TokenKind::Function
                    && !self.newline_before_ahead(1) =>
            {
                self.parse_function_expression(true)
            }
            TokenKind::Class => {
                let class = self.parse_class(false)?;
                let span = class.span;
                Some(Expr::new(ExprKind::Class(Rc::new(class)), span))
            }

            TokenKind::Identifier(name) => {
                self.advance();
                Some(Expr::new(ExprKind::Identifier(name), start))
            }

            // ── Unsupported forms ───────────────────────────────────────
            TokenKind::Import => {
                self.error_at_current(
                    ErrorCode::MODULE_SYNTAX,
                    "Dynamic 'import()' is not supported",
                );
                None
            }
            TokenKind::Hash => {
                self.error_at_current(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "Private names ('#name') are not supported; use 'private' instead",
                );
                None
            }
            TokenKind::At => {
                self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "Decorators are not supported");
                None
            }

            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Expression expected, got '{other}'"),
                );
                None
            }
        }
    }

    /// Parse the rest of a template after its `TemplateStart` text.
    fn parse_template(&mut self, head: String, start: Span) -> Option<Expr> {
        let mut quasis = vec![head];
        let mut exprs = Vec::new();
        loop {
            self.expect(&TokenKind::InterpolationStart)?;
            exprs.push(self.allowing_in(|p| p.parse_expression())?);
            self.expect(&TokenKind::InterpolationEnd)?;
            match self.peek_kind().clone() {
                TokenKind::TemplatePart(text) => {
                    self.advance();
                    quasis.push(text);
                }
                TokenKind::TemplateEnd(text) => {
                    self.advance();
                    quasis.push(text);
                    break;
                }
                other => {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("Template continuation expected, got '{other}'"),
                    );
                    return None;
                }
            }
        }
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Template { quasis, exprs }, span))
    }

    /// `[a, , ...rest]`
    fn parse_array_literal(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.expect(&TokenKind::LBracket)?;
        let elements = self.allowing_in(|p| {
            let mut elements = Vec::new();
            while !p.check_exact(&TokenKind::RBracket) {
                if p.eat(&TokenKind::Comma) {
                    elements.push(ArrayElement::Hole);
                    continue;
                }
                if p.eat(&TokenKind::DotDotDot) {
                    elements.push(ArrayElement::Spread(p.parse_assignment()?));
                } else {
                    elements.push(ArrayElement::Expr(p.parse_assignment()?));
                }
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Some(elements)
        })?;
        self.expect(&TokenKind::RBracket)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Array(elements), span))
    }

    /// `{ key: value, short, ...spread, method() {}, get x() {} }`
    fn parse_object_literal(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        let props = self.allowing_in(|p| {
            let mut props = Vec::new();
            while !p.check_exact(&TokenKind::RBrace) {
                props.push(p.parse_object_prop()?);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Some(props)
        })?;
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Object(props), span))
    }

    fn parse_object_prop(&mut self) -> Option<ObjectProp> {
        if self.eat(&TokenKind::DotDotDot) {
            return Some(ObjectProp::Spread(self.parse_assignment()?));
        }

        let start = self.current_span();
        let modifier_applies = !ends_member_name(self.look_ahead(1));
        let accessor = match self.peek_kind() {
            TokenKind::Identifier(w) if w == "get" && modifier_applies => Some(true),
            TokenKind::Identifier(w) if w == "set" && modifier_applies => Some(false),
            _ => None,
        };
        let is_async =
            accessor.is_none() && self.check_word("async") && modifier_applies && !self.newline_before_ahead(1);
        if accessor.is_some() || is_async {
            self.advance();
        }
        if self.check_exact(&TokenKind::Star) {
            self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "Generators are not supported");
            return None;
        }

        let (key, shorthand) = self.parse_property_key()?;

        if let Some(is_getter) = accessor {
            let def = self.parse_method(&key, false, start)?;
            return Some(if is_getter {
                ObjectProp::Getter(key, def)
            } else {
                ObjectProp::Setter(key, def)
            });
        }
        if is_async || self.check_exact(&TokenKind::LParen) || self.check_exact(&TokenKind::Less) {
            let def = self.parse_method(&key, is_async, start)?;
            return Some(ObjectProp::Method(key, def));
        }
        if self.eat(&TokenKind::Colon) {
            return Some(ObjectProp::KeyValue(key, self.parse_assignment()?));
        }

        let Some(ident) = shorthand else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("':' expected, got '{}'", self.peek_kind()),
            );
            return None;
        };
        // `{ a = 1 }` only makes sense as a destructuring target.
        if self.eat(&TokenKind::Eq) {
            let default = self.parse_assignment()?;
            let span = ident.span.merge(default.span);
            let assign = Expr::new(
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(Pattern::Ident(ident)),
                    value: Box::new(default),
                },
                span,
            );
            return Some(ObjectProp::KeyValue(key, assign));
        }
        Some(ObjectProp::Shorthand(ident))
    }

    /// A property key, plus the identifier when the key can be shorthand.
    pub(crate) fn parse_property_key(&mut self) -> Option<(PropKey, Option<Ident>)> {
        match self.peek_kind().clone() {
            TokenKind::String(s) => {
                self.advance();
                Some((PropKey::Static(s), None))
            }
            TokenKind::Number(n) => {
                self.advance();
                Some((PropKey::Static(format_number(n)), None))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.allowing_in(|p| p.parse_assignment())?;
                self.expect(&TokenKind::RBracket)?;
                Some((PropKey::Computed(Box::new(expr)), None))
            }
            TokenKind::Identifier(_) => {
                let ident = self.expect_identifier()?;
                Some((PropKey::Static(ident.name.clone()), Some(ident)))
            }
            _ => {
                let name = self.expect_property_name()?;
                Some((PropKey::Static(name.name), None))
            }
        }
    }

    /// Method body after its key: `(params): T { ... }`.
    pub(crate) fn parse_method(
        &mut self,
        key: &PropKey,
        is_async: bool,
        start: Span,
    ) -> Option<Rc<FunctionDef>> {
        let params = self.parse_signature()?;
        let body = self.parse_function_body(is_async)?;
        let name = match key {
            PropKey::Static(name) => Some(Ident::new(name.clone(), start)),
            PropKey::Computed(_) => None,
        };
        Some(Rc::new(FunctionDef {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            is_async,
            span: start.merge(self.previous_span()),
        }))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Assignment Targets
    // ══════════════════════════════════════════════════════════════════════════

    /// Reinterpret an expression as an assignment target. Destructuring is
    /// only allowed for plain `=`.
    pub(crate) fn expr_to_pattern(&mut self, expr: Expr, destructure: bool) -> Option<Pattern> {
        let span = expr.span;
        match expr.kind {
            ExprKind::Identifier(name) => Some(Pattern::Ident(Ident::new(name, span))),
            ExprKind::Member {
                optional: false, ..
            }
            | ExprKind::SuperMember(_) => Some(Pattern::Expr(Box::new(expr))),
            ExprKind::Array(elements) if destructure => {
                let mut targets = Vec::new();
                let mut rest = None;
                let count = elements.len();
                for (i, element) in elements.into_iter().enumerate() {
                    match element {
                        ArrayElement::Hole => targets.push(None),
                        ArrayElement::Expr(e) => targets.push(Some(self.expr_to_pattern(e, true)?)),
                        ArrayElement::Spread(e) if i + 1 == count => {
                            rest = Some(Box::new(self.expr_to_pattern(e, true)?));
                        }
                        ArrayElement::Spread(e) => {
                            self.error_at(
                                ErrorCode::INVALID_ASSIGNMENT_TARGET,
                                "A rest element must be last in a destructuring pattern",
                                e.span,
                            );
                            return None;
                        }
                    }
                }
                Some(Pattern::Array {
                    elements: targets,
                    rest,
                    span,
                })
            }
            ExprKind::Object(props) if destructure => {
                let mut out = Vec::new();
                let mut rest = None;
                for prop in props {
                    match prop {
                        ObjectProp::KeyValue(key, value) => {
                            let value = self.expr_to_pattern(value, true)?;
                            out.push(ObjectPatternProp { key, value });
                        }
                        ObjectProp::Shorthand(ident) => out.push(ObjectPatternProp {
                            key: PropKey::Static(ident.name.clone()),
                            value: Pattern::Ident(ident),
                        }),
                        ObjectProp::Spread(e) => {
                            rest = Some(Box::new(self.expr_to_pattern(e, true)?));
                        }
                        _ => {
                            self.error_at(
                                ErrorCode::INVALID_ASSIGNMENT_TARGET,
                                "Invalid destructuring assignment target",
                                span,
                            );
                            return None;
                        }
                    }
                }
                Some(Pattern::Object {
                    props: out,
                    rest,
                    span,
                })
            }
            ExprKind::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } if destructure => Some(Pattern::Assign {
                target,
                default: value,
            }),
            _ => {
                self.error_at(
                    ErrorCode::INVALID_ASSIGNMENT_TARGET,
                    "The left-hand side of an assignment expression must be a variable or a property access",
                    span,
                );
                None
            }
        }
    }
}

/// Tokens after a `get`/`set`/`async`/modifier word that show the word is
/// itself the member name.
pub(crate) fn ends_member_name(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Colon
            | TokenKind::LParen
            | TokenKind::Comma
            | TokenKind::RBrace
            | TokenKind::Eq
            | TokenKind::Less
            | TokenKind::Question
            | TokenKind::Bang
            | TokenKind::Semicolon
            | TokenKind::Eof
    )
}

fn member(object: Expr, property: MemberProp, optional: bool, end: Span) -> Expr {
    let span = object.span.merge(end);
    Expr::new(
        ExprKind::Member {
            object: Box::new(object),
            property,
            optional,
        },
        span,
    )
}

fn call(callee: Expr, args: Vec<Argument>, optional: bool, end: Span) -> Expr {
    let span = callee.span.merge(end);
    Expr::new(
        ExprKind::Call {
            callee: Box::new(callee),
            args,
            optional,
        },
        span,
    )
}
