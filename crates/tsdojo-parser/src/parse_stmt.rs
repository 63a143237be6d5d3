//! Statement parsing.

use tsdojo_lexer::token::TokenKind;
use tsdojo_types::ast::*;
use tsdojo_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block_body(&mut self) -> Option<Vec<Stmt>> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Some(stmts)
    }

    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        if !self.enter() {
            return None;
        }
        let start = self.current_span();
        let kind = self.parse_statement_kind();
        self.leave();
        Some(Stmt::new(kind?, start.merge(self.previous_span())))
    }

    fn parse_statement_kind(&mut self) -> Option<StmtKind> {
        match self.peek_kind().clone() {
            TokenKind::LBrace => self.parse_block_body().map(StmtKind::Block),
            TokenKind::Semicolon => {
                self.advance();
                Some(StmtKind::Empty)
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => self.parse_var_statement(),
            TokenKind::Function => self.parse_function_statement(false),
            TokenKind::Class => {
                let class = self.parse_class(true)?;
                Some(StmtKind::Class(class.into()))
            }
            TokenKind::Enum => self.parse_enum().map(StmtKind::Enum),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Debugger => {
                self.advance();
                self.consume_semicolon()?;
                Some(StmtKind::Empty)
            }

            // ── Rejected forms ──────────────────────────────────────────
            TokenKind::Import => {
                self.error_at_current(
                    ErrorCode::MODULE_SYNTAX,
                    "Import declarations are not supported; the submission must be self-contained",
                );
                None
            }
            TokenKind::Export => {
                self.error_at_current(
                    ErrorCode::ILLEGAL_STATEMENT,
                    "Export declarations are only allowed at the top level",
                );
                None
            }
            TokenKind::With => {
                self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "'with' statements are not supported");
                None
            }
            TokenKind::At => {
                self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "Decorators are not supported");
                None
            }

            // ── Contextual words ────────────────────────────────────────
            TokenKind::Identifier(word) => self.parse_word_statement(&word),

            _ => self.parse_expression_statement(),
        }
    }

    /// Statements introduced by a contextual word: `async function`,
    /// TypeScript declarations, labels, or plain expressions.
    fn parse_word_statement(&mut self, word: &str) -> Option<StmtKind> {
        let next = self.look_ahead(1).clone();
        let same_line = !self.newline_before_ahead(1);
        let next_is_name = matches!(next, TokenKind::Identifier(_));

        match word {
            "async" if next == TokenKind::Function && same_line => {
                self.parse_function_statement(true)
            }
            "abstract" if next == TokenKind::Class && same_line => {
                self.advance();
                let class = self.parse_class(true)?;
                Some(StmtKind::Class(class.into()))
            }
            "type" if next_is_name && same_line => self.skip_type_alias(),
            "interface" if next_is_name && same_line => self.skip_interface(),
            "declare" if same_line && !matches!(next, TokenKind::Eq | TokenKind::Dot | TokenKind::LParen) => {
                self.skip_ambient_declaration()
            }
            "namespace" | "module" if same_line && (next_is_name || matches!(next, TokenKind::String(_))) => {
                self.error_at_current(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "Namespaces are not supported",
                );
                None
            }
            _ if next == TokenKind::Colon => self.parse_labeled(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Option<StmtKind> {
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Some(StmtKind::Expr(expr))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Declarations
    // ══════════════════════════════════════════════════════════════════════════

    /// `let a = 1, { b } = c;` (also `const enum`)
    pub(crate) fn parse_var_statement(&mut self) -> Option<StmtKind> {
        let kind = self.parse_var_kind()?;
        if kind == VarKind::Const && self.check_exact(&TokenKind::Enum) {
            return self.parse_enum().map(StmtKind::Enum);
        }
        let mut declarators = Vec::new();
        loop {
            let target = self.parse_binding_target()?;
            declarators.push(self.finish_declarator(target, kind)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.consume_semicolon()?;
        Some(StmtKind::Var(VarDecl { kind, declarators }))
    }

    fn parse_var_kind(&mut self) -> Option<VarKind> {
        let kind = match self.peek_kind() {
            TokenKind::Var => VarKind::Var,
            TokenKind::Let => VarKind::Let,
            TokenKind::Const => VarKind::Const,
            other => {
                let message = format!("Variable declaration expected, got '{other}'");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                return None;
            }
        };
        self.advance();
        Some(kind)
    }

    /// The rest of one declarator after its binding: `!`, `: T`, `= init`.
    fn finish_declarator(&mut self, target: Pattern, kind: VarKind) -> Option<VarDeclarator> {
        let start = target.span();
        self.eat(&TokenKind::Bang);
        self.skip_type_annotation()?;
        let init = if self.eat(&TokenKind::Eq) {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        if init.is_none() {
            if kind == VarKind::Const {
                self.error_at(
                    ErrorCode::MISSING_INITIALIZER,
                    "'const' declarations must be initialized",
                    start,
                );
            } else if !matches!(target, Pattern::Ident(_)) {
                self.error_at(
                    ErrorCode::MISSING_INITIALIZER,
                    "A destructuring declaration must have an initializer",
                    start,
                );
            }
        }
        Some(VarDeclarator {
            target,
            init,
            span: start.merge(self.previous_span()),
        })
    }

    fn parse_function_statement(&mut self, is_async: bool) -> Option<StmtKind> {
        Some(match self.parse_function(is_async, true)? {
            Some(def) => StmtKind::Function(def),
            // Overload signature without a body.
            None => StmtKind::Empty,
        })
    }

    // ── TypeScript-only declarations ──────────────────────────────────────────

    /// `type Name<T> = Type;`
    fn skip_type_alias(&mut self) -> Option<StmtKind> {
        self.advance();
        self.expect_identifier()?;
        self.skip_type_params()?;
        self.expect(&TokenKind::Eq)?;
        self.skip_type()?;
        self.consume_semicolon()?;
        Some(StmtKind::Empty)
    }

    /// `interface Name<T> extends A, B { ... }`
    pub(crate) fn skip_interface(&mut self) -> Option<StmtKind> {
        self.advance();
        self.expect_identifier()?;
        self.skip_type_params()?;
        if self.eat(&TokenKind::Extends) {
            loop {
                self.skip_type()?;
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
        Some(StmtKind::Empty)
    }

    /// `declare ...`: skipped up to its `;`, its closing `}`, or the end of
    /// its line.
    pub(crate) fn skip_ambient_declaration(&mut self) -> Option<StmtKind> {
        self.advance();
        let first = self.pos_marker();
        let mut depth = 0usize;
        while !self.at_end() {
            if depth == 0 && self.pos_marker() != first && self.newline_before() {
                break;
            }
            match self.advance().kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.eat(&TokenKind::Semicolon);
                        break;
                    }
                }
                TokenKind::Semicolon if depth == 0 => break,
                _ => {}
            }
        }
        Some(StmtKind::Empty)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Control Flow
    // ══════════════════════════════════════════════════════════════════════════

    /// `if (cond) stmt [else stmt]`
    fn parse_if(&mut self) -> Option<StmtKind> {
        self.expect(&TokenKind::If)?;
        let condition = self.parse_paren_expression()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Some(StmtKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_paren_expression(&mut self) -> Option<Expr> {
        self.expect(&TokenKind::LParen)?;
        let expr = self.allowing_in(|p| p.parse_expression())?;
        self.expect(&TokenKind::RParen)?;
        Some(expr)
    }

    /// Parse a loop body with `break`/`continue` enabled.
    fn parse_loop_body(&mut self) -> Option<Box<Stmt>> {
        self.loops += 1;
        let body = self.parse_statement();
        self.loops -= 1;
        body.map(Box::new)
    }

    /// `for (init; test; update)`, `for (x of xs)`, `for (k in obj)`
    fn parse_for(&mut self) -> Option<StmtKind> {
        self.expect(&TokenKind::For)?;
        if self.check_exact(&TokenKind::Await) {
            self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "'for await' loops are not supported");
            return None;
        }
        self.expect(&TokenKind::LParen)?;

        let saved_no_in = std::mem::replace(&mut self.no_in, true);
        let head = self.parse_for_head();
        self.no_in = saved_no_in;

        match head? {
            ForHead::Each { binding, of } => {
                let source = if of {
                    self.allowing_in(|p| p.parse_assignment())?
                } else {
                    self.allowing_in(|p| p.parse_expression())?
                };
                self.expect(&TokenKind::RParen)?;
                let body = self.parse_loop_body()?;
                Some(if of {
                    StmtKind::ForOf {
                        binding,
                        iterable: source,
                        body,
                    }
                } else {
                    StmtKind::ForIn {
                        binding,
                        object: source,
                        body,
                    }
                })
            }
            ForHead::Classic(init) => {
                self.expect(&TokenKind::Semicolon)?;
                let test = if self.check_exact(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.allowing_in(|p| p.parse_expression())?)
                };
                self.expect(&TokenKind::Semicolon)?;
                let update = if self.check_exact(&TokenKind::RParen) {
                    None
                } else {
                    Some(self.allowing_in(|p| p.parse_expression())?)
                };
                self.expect(&TokenKind::RParen)?;
                let body = self.parse_loop_body()?;
                Some(StmtKind::For {
                    init,
                    test,
                    update,
                    body,
                })
            }
        }
    }

    /// Everything between `for (` and the first `;`, `of` or `in`.
    fn parse_for_head(&mut self) -> Option<ForHead> {
        if self.check_exact(&TokenKind::Semicolon) {
            return Some(ForHead::Classic(None));
        }

        if matches!(
            self.peek_kind(),
            TokenKind::Var | TokenKind::Let | TokenKind::Const
        ) {
            let kind = self.parse_var_kind()?;
            let target = self.parse_binding_target()?;
            if let Some(of) = self.each_keyword() {
                return Some(ForHead::Each {
                    binding: ForBinding::Decl(kind, target),
                    of,
                });
            }
            let mut declarators = vec![self.finish_declarator(target, kind)?];
            while self.eat(&TokenKind::Comma) {
                let target = self.parse_binding_target()?;
                declarators.push(self.finish_declarator(target, kind)?);
            }
            return Some(ForHead::Classic(Some(ForInit::Var(VarDecl {
                kind,
                declarators,
            }))));
        }

        let expr = self.parse_expression()?;
        if let Some(of) = self.each_keyword() {
            let target = self.expr_to_pattern(expr, true)?;
            return Some(ForHead::Each {
                binding: ForBinding::Target(target),
                of,
            });
        }
        Some(ForHead::Classic(Some(ForInit::Expr(expr))))
    }

    /// Consume `of` (→ `true`) or `in` (→ `false`) if present.
    fn each_keyword(&mut self) -> Option<bool> {
        if self.eat_word("of") {
            Some(true)
        } else if self.eat(&TokenKind::In) {
            Some(false)
        } else {
            None
        }
    }

    /// `while (cond) stmt`
    fn parse_while(&mut self) -> Option<StmtKind> {
        self.expect(&TokenKind::While)?;
        let condition = self.parse_paren_expression()?;
        let body = self.parse_loop_body()?;
        Some(StmtKind::While { condition, body })
    }

    /// `do stmt while (cond)`
    fn parse_do_while(&mut self) -> Option<StmtKind> {
        self.expect(&TokenKind::Do)?;
        let body = self.parse_loop_body()?;
        self.expect(&TokenKind::While)?;
        let condition = self.parse_paren_expression()?;
        // The trailing `;` is always optional here.
        self.eat(&TokenKind::Semicolon);
        Some(StmtKind::DoWhile { body, condition })
    }

    fn parse_return(&mut self) -> Option<StmtKind> {
        if !self.in_function {
            self.error_at_current(
                ErrorCode::ILLEGAL_STATEMENT,
                "A 'return' statement can only be used within a function body",
            );
        }
        self.expect(&TokenKind::Return)?;
        let value = if self.ends_restricted_production() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Some(StmtKind::Return(value))
    }

    /// `break [label]` / `continue [label]`
    fn parse_jump(&mut self) -> Option<StmtKind> {
        let token = self.advance();
        let is_break = token.kind == TokenKind::Break;
        let label = match self.peek_kind().clone() {
            TokenKind::Identifier(name) if !self.newline_before() => {
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let keyword = if is_break { "break" } else { "continue" };
        let valid = match &label {
            Some(name) => self.labels.contains(name),
            None if is_break => self.loops + self.switches > 0,
            None => self.loops > 0,
        };
        if !valid {
            let message = match &label {
                Some(name) => format!("Label '{name}' is not defined for '{keyword}'"),
                None => format!("A '{keyword}' statement can only be used within an enclosing loop"),
            };
            self.error_at(ErrorCode::ILLEGAL_STATEMENT, message, token.span);
        }
        self.consume_semicolon()?;
        Some(if is_break {
            StmtKind::Break(label)
        } else {
            StmtKind::Continue(label)
        })
    }

    fn parse_throw(&mut self) -> Option<StmtKind> {
        self.expect(&TokenKind::Throw)?;
        if self.newline_before() {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "Line break not permitted after 'throw'",
            );
            return None;
        }
        let value = self.parse_expression()?;
        self.consume_semicolon()?;
        Some(StmtKind::Throw(value))
    }

    /// `try { } catch (e) { } finally { }`
    fn parse_try(&mut self) -> Option<StmtKind> {
        self.expect(&TokenKind::Try)?;
        let block = self.parse_block_body()?;
        let handler = if self.eat(&TokenKind::Catch) {
            let param = if self.eat(&TokenKind::LParen) {
                let target = self.parse_binding_target()?;
                self.skip_type_annotation()?;
                self.expect(&TokenKind::RParen)?;
                Some(target)
            } else {
                None
            };
            let body = self.parse_block_body()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block_body()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "'catch' or 'finally' expected");
            return None;
        }
        Some(StmtKind::Try {
            block,
            handler,
            finalizer,
        })
    }

    /// `switch (x) { case a: ... default: ... }`
    fn parse_switch(&mut self) -> Option<StmtKind> {
        self.expect(&TokenKind::Switch)?;
        let discriminant = self.parse_paren_expression()?;
        self.expect(&TokenKind::LBrace)?;
        self.switches += 1;
        let cases = self.parse_switch_cases();
        self.switches -= 1;
        let cases = cases?;
        self.expect(&TokenKind::RBrace)?;
        Some(StmtKind::Switch {
            discriminant,
            cases,
        })
    }

    fn parse_switch_cases(&mut self) -> Option<Vec<SwitchCase>> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            let start = self.current_span();
            let test = match self.peek_kind() {
                TokenKind::Case => {
                    self.advance();
                    Some(self.allowing_in(|p| p.parse_expression())?)
                }
                TokenKind::Default => {
                    if seen_default {
                        self.error_at_current(
                            ErrorCode::ILLEGAL_STATEMENT,
                            "A 'default' clause cannot appear more than once in a 'switch' statement",
                        );
                    }
                    seen_default = true;
                    self.advance();
                    None
                }
                other => {
                    let message = format!("'case' or 'default' expected, got '{other}'");
                    self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                    return None;
                }
            };
            self.expect(&TokenKind::Colon)?;
            let mut body = Vec::new();
            while !matches!(
                self.peek_kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                if self.too_many_errors() {
                    return None;
                }
                match self.parse_statement() {
                    Some(stmt) => body.push(stmt),
                    None => self.synchronize(),
                }
            }
            cases.push(SwitchCase {
                test,
                body,
                span: start.merge(self.previous_span()),
            });
        }
        Some(cases)
    }

    /// `label: stmt`
    fn parse_labeled(&mut self) -> Option<StmtKind> {
        let label = self.expect_identifier()?;
        self.expect(&TokenKind::Colon)?;
        self.labels.push(label.name.clone());
        let body = self.parse_statement();
        self.labels.pop();
        Some(StmtKind::Labeled {
            label: label.name,
            body: Box::new(body?),
        })
    }

    /// After `return`: the operand is omitted at `;`, `}`, end of input, or
    /// a line break.
    fn ends_restricted_production(&self) -> bool {
        self.newline_before()
            || matches!(
                self.peek_kind(),
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
            )
    }
}

/// The parsed head of a `for` statement.
enum ForHead {
    Classic(Option<ForInit>),
    Each { binding: ForBinding, of: bool },
}
