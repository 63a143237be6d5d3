//! Top-level and declaration parsing.
//!
//! Handles the program loop, `export` forms and the export table, classes,
//! enums, functions with their parameter lists, and binding patterns.

use std::rc::Rc;

use tsdojo_lexer::token::TokenKind;
use tsdojo_types::ast::*;
use tsdojo_types::{ErrorCode, Span};

use crate::parse_expr::ends_member_name;
use crate::parser::Parser;

/// Class member modifiers that carry no runtime meaning (besides `static`).
const MEMBER_MODIFIERS: &[&str] = &[
    "static",
    "public",
    "private",
    "protected",
    "readonly",
    "abstract",
    "override",
    "declare",
    "accessor",
];

/// Modifiers that turn a constructor parameter into a property.
const PARAM_PROPERTY_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Program
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse a complete program: `{ Statement | ExportDeclaration }`.
    pub(crate) fn parse_program(&mut self) -> Program {
        let start = self.current_span();
        let mut body = Vec::new();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if self.check_exact(&TokenKind::RBrace) {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "Declaration or statement expected");
                self.advance();
                continue;
            }
            let stmt = if self.check_exact(&TokenKind::Export) {
                self.parse_export()
            } else {
                self.parse_statement()
            };
            match stmt {
                Some(stmt) => body.push(stmt),
                None => self.synchronize(),
            }
        }
        Program {
            body,
            exports: std::mem::take(&mut self.exports),
            span: start.merge(self.previous_span()),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Exports
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_export(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.expect(&TokenKind::Export)?;
        let kind = self.parse_export_kind(start)?;
        Some(Stmt::new(kind, start.merge(self.previous_span())))
    }

    fn parse_export_kind(&mut self, start: Span) -> Option<StmtKind> {
        match self.peek_kind().clone() {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let kind = self.parse_var_statement()?;
                match &kind {
                    StmtKind::Var(decl) => {
                        for declarator in &decl.declarators {
                            for name in declarator.target.bound_names() {
                                self.record_export(name, name, declarator.span);
                            }
                        }
                    }
                    StmtKind::Enum(decl) => {
                        let name = decl.name.clone();
                        self.record_export(&name.name, &name.name, name.span);
                    }
                    _ => {}
                }
                Some(kind)
            }
            TokenKind::Function => self.parse_exported_function(false),
            TokenKind::Identifier(w)
                if w == "async" && *self.look_ahead(1) == TokenKind::Function =>
            {
                self.parse_exported_function(true)
            }
            TokenKind::Class => self.parse_exported_class(),
            TokenKind::Identifier(w) if w == "abstract" && *self.look_ahead(1) == TokenKind::Class => {
                self.advance();
                self.parse_exported_class()
            }
            TokenKind::Enum => {
                let decl = self.parse_enum()?;
                self.record_export(&decl.name.name, &decl.name.name, decl.name.span);
                Some(StmtKind::Enum(decl))
            }
            TokenKind::Default => {
                self.advance();
                self.parse_export_default(start)
            }
            TokenKind::LBrace => self.parse_export_list(),
            TokenKind::Identifier(w) if w == "type" && *self.look_ahead(1) == TokenKind::LBrace => {
                // `export type { A, B }`
                self.advance();
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
                self.reject_reexport()?;
                self.consume_semicolon()?;
                Some(StmtKind::Empty)
            }
            TokenKind::Identifier(w) if matches!(w.as_str(), "type" | "interface" | "declare") => {
                // Type-only declarations export nothing at runtime.
                self.parse_statement().map(|s| s.kind)
            }
            TokenKind::Star | TokenKind::Import | TokenKind::Eq => {
                self.error_at_current(
                    ErrorCode::MODULE_SYNTAX,
                    format!("'export {}' is not supported", self.peek_kind()),
                );
                None
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Declaration expected after 'export', got '{other}'"),
                );
                None
            }
        }
    }

    fn parse_exported_function(&mut self, is_async: bool) -> Option<StmtKind> {
        match self.parse_function(is_async, true)? {
            Some(def) => {
                if let Some(name) = &def.name {
                    self.record_export(&name.name, &name.name, name.span);
                }
                Some(StmtKind::Function(def))
            }
            None => Some(StmtKind::Empty),
        }
    }

    fn parse_exported_class(&mut self) -> Option<StmtKind> {
        let class = self.parse_class(true)?;
        if let Some(name) = &class.name {
            self.record_export(&name.name, &name.name, name.span);
        }
        Some(StmtKind::Class(Rc::new(class)))
    }

    /// `export default ...`. Anonymous values bind the local name `default`,
    /// which no identifier in the source can reach.
    fn parse_export_default(&mut self, start: Span) -> Option<StmtKind> {
        let is_async = self.check_word("async") && *self.look_ahead(1) == TokenKind::Function;
        if is_async || self.check_exact(&TokenKind::Function) {
            let Some(def) = self.parse_function(is_async, false)? else {
                return Some(StmtKind::Empty);
            };
            if let Some(name) = def.name.clone() {
                self.record_export("default", &name.name, name.span);
                return Some(StmtKind::Function(def));
            }
            let span = def.span;
            return Some(self.bind_default(Expr::new(ExprKind::Function(def), span), start));
        }

        let is_abstract = self.check_word("abstract") && *self.look_ahead(1) == TokenKind::Class;
        if is_abstract {
            self.advance();
        }
        if self.check_exact(&TokenKind::Class) {
            let class = self.parse_class(false)?;
            if let Some(name) = class.name.clone() {
                self.record_export("default", &name.name, name.span);
                return Some(StmtKind::Class(Rc::new(class)));
            }
            let span = class.span;
            return Some(self.bind_default(Expr::new(ExprKind::Class(Rc::new(class)), span), start));
        }

        if self.check_word("interface") && matches!(self.look_ahead(1), TokenKind::Identifier(_)) {
            return self.skip_interface();
        }

        let value = self.parse_assignment()?;
        self.consume_semicolon()?;
        Some(self.bind_default(value, start))
    }

    fn bind_default(&mut self, value: Expr, start: Span) -> StmtKind {
        self.record_export("default", "default", start);
        StmtKind::Var(VarDecl {
            kind: VarKind::Const,
            declarators: vec![VarDeclarator {
                target: Pattern::Ident(Ident::new("default", start)),
                span: value.span,
                init: Some(value),
            }],
        })
    }

    /// `export { a, b as c };`
    fn parse_export_list(&mut self) -> Option<StmtKind> {
        self.expect(&TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) {
            // `export { type Foo }`
            let type_only = self.check_word("type")
                && !matches!(self.look_ahead(1), TokenKind::Comma | TokenKind::RBrace)
                && !self.look_ahead(1).is_word("as");
            if type_only {
                self.advance();
            }
            let local = self.expect_property_name()?;
            let exported = if self.eat_word("as") {
                self.expect_property_name()?
            } else {
                local.clone()
            };
            if !type_only {
                entries.push((exported, local));
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        self.reject_reexport()?;
        self.consume_semicolon()?;
        for (exported, local) in entries {
            self.record_export(&exported.name, &local.name, exported.span);
        }
        Some(StmtKind::Empty)
    }

    fn reject_reexport(&mut self) -> Option<()> {
        if self.check_word("from") {
            self.error_at_current(
                ErrorCode::MODULE_SYNTAX,
                "Re-exports ('export ... from') are not supported",
            );
            return None;
        }
        Some(())
    }

    fn record_export(&mut self, exported: &str, local: &str, span: Span) {
        if self.exports.iter().any(|e| e.exported == exported) {
            self.error_at(
                ErrorCode::DUPLICATE_EXPORT,
                format!("Duplicate export '{exported}'"),
                span,
            );
            return;
        }
        self.exports.push(ExportEntry {
            exported: exported.to_string(),
            local: local.to_string(),
            span,
        });
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Classes
    // ══════════════════════════════════════════════════════════════════════════

    /// `class Name<T> extends Base<T> implements I { members }`
    pub(crate) fn parse_class(&mut self, name_required: bool) -> Option<ClassDef> {
        let start = self.current_span();
        self.expect(&TokenKind::Class)?;
        let name = match self.peek_kind() {
            TokenKind::Identifier(w) if w != "implements" => Some(self.expect_identifier()?),
            _ if name_required => {
                self.expect_identifier()?;
                None
            }
            _ => None,
        };
        self.skip_type_params()?;

        let super_class = if self.eat(&TokenKind::Extends) {
            let base = self.parse_lhs()?;
            if self.check_exact(&TokenKind::Less) {
                self.skip_type_args()?;
            }
            Some(base)
        } else {
            None
        };
        if self.eat_word("implements") {
            loop {
                self.skip_type()?;
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(&TokenKind::LBrace)?;
        let mut constructor = None;
        let mut members = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            self.parse_class_member(&mut constructor, &mut members)?;
        }
        self.expect(&TokenKind::RBrace)?;

        Some(ClassDef {
            name,
            super_class,
            constructor,
            members,
            span: start.merge(self.previous_span()),
        })
    }

    fn parse_class_member(
        &mut self,
        constructor: &mut Option<Rc<FunctionDef>>,
        members: &mut Vec<ClassMember>,
    ) -> Option<()> {
        let start = self.current_span();
        if self.check_exact(&TokenKind::At) {
            self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "Decorators are not supported");
            return None;
        }

        // ── Modifiers ───────────────────────────────────────────────────
        let mut is_static = false;
        let mut ambient = false;
        while let Some(word) = self.peek_kind().name_text().map(str::to_string) {
            if !MEMBER_MODIFIERS.contains(&word.as_str()) || ends_member_name(self.look_ahead(1)) {
                break;
            }
            if word == "static" && *self.look_ahead(1) == TokenKind::LBrace {
                self.error_at_current(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "Static initialization blocks are not supported",
                );
                return None;
            }
            match word.as_str() {
                "static" => is_static = true,
                "declare" | "abstract" => ambient = true,
                _ => {}
            }
            self.advance();
        }

        // Index signature: `[key: string]: number;`
        if self.check_exact(&TokenKind::LBracket)
            && matches!(self.look_ahead(1), TokenKind::Identifier(_))
            && *self.look_ahead(2) == TokenKind::Colon
        {
            self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket)?;
            self.skip_type_annotation()?;
            return self.consume_semicolon();
        }

        let modifier_applies = !ends_member_name(self.look_ahead(1)) && !self.newline_before_ahead(1);
        let accessor = match self.peek_kind() {
            TokenKind::Identifier(w) if w == "get" && modifier_applies => Some(true),
            TokenKind::Identifier(w) if w == "set" && modifier_applies => Some(false),
            _ => None,
        };
        let is_async = accessor.is_none() && self.check_word("async") && modifier_applies;
        if accessor.is_some() || is_async {
            self.advance();
        }
        if self.check_exact(&TokenKind::Star) {
            self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "Generators are not supported");
            return None;
        }

        let key_span = self.current_span();
        let (key, _) = self.parse_property_key()?;
        self.eat(&TokenKind::Question);
        self.eat(&TokenKind::Bang);

        // ── Methods ─────────────────────────────────────────────────────
        if self.check_exact(&TokenKind::LParen) || self.check_exact(&TokenKind::Less) {
            let is_constructor = !is_static
                && accessor.is_none()
                && matches!(&key, PropKey::Static(name) if name == "constructor");
            let params = self.parse_signature()?;
            if !self.check_exact(&TokenKind::LBrace) {
                // Overload or abstract signature.
                return self.consume_semicolon();
            }
            let body = self.parse_function_body(is_async)?;
            let name = match &key {
                PropKey::Static(name) => Some(Ident::new(name.clone(), key_span)),
                PropKey::Computed(_) => None,
            };
            let def = Rc::new(FunctionDef {
                name,
                params,
                body: FunctionBody::Block(body),
                is_arrow: false,
                is_async,
                span: start.merge(self.previous_span()),
            });

            if is_constructor {
                if is_async {
                    self.error_at(ErrorCode::ILLEGAL_STATEMENT, "A constructor cannot be async", key_span);
                }
                if constructor.is_some() {
                    self.error_at(
                        ErrorCode::ILLEGAL_STATEMENT,
                        "Multiple constructor implementations are not allowed",
                        key_span,
                    );
                }
                *constructor = Some(def);
                return Some(());
            }

            let kind = match accessor {
                Some(true) => ClassMemberKind::Getter(def),
                Some(false) => ClassMemberKind::Setter(def),
                None => ClassMemberKind::Method(def),
            };
            members.push(ClassMember {
                key,
                is_static,
                kind,
                span: start.merge(self.previous_span()),
            });
            return Some(());
        }

        // ── Fields ──────────────────────────────────────────────────────
        self.skip_type_annotation()?;
        let init = if self.eat(&TokenKind::Eq) {
            Some(self.allowing_in(|p| p.parse_field_initializer())?)
        } else {
            None
        };
        self.consume_semicolon()?;
        if !ambient {
            members.push(ClassMember {
                key,
                is_static,
                kind: ClassMemberKind::Field(init),
                span: start.merge(self.previous_span()),
            });
        }
        Some(())
    }

    /// Field initializers run like a method body: `this` is the instance and
    /// `await` is rejected.
    fn parse_field_initializer(&mut self) -> Option<Expr> {
        let saved = std::mem::replace(&mut self.in_sync_function, true);
        let value = self.parse_assignment();
        self.in_sync_function = saved;
        value
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Enums
    // ══════════════════════════════════════════════════════════════════════════

    /// `enum Name { A, B = 2, C = "c" }`
    pub(crate) fn parse_enum(&mut self) -> Option<EnumDecl> {
        self.expect(&TokenKind::Enum)?;
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) {
            let start = self.current_span();
            let member_name = match self.peek_kind().clone() {
                TokenKind::String(s) => {
                    self.advance();
                    s
                }
                _ => self.expect_property_name()?.name,
            };
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.allowing_in(|p| p.parse_assignment())?)
            } else {
                None
            };
            members.push(EnumMember {
                name: member_name,
                init,
                span: start.merge(self.previous_span()),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Some(EnumDecl { name, members })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// `[async] function name<T>(params): R { body }`
    ///
    /// The inner `None` is a body-less overload signature.
    pub(crate) fn parse_function(
        &mut self,
        is_async: bool,
        name_required: bool,
    ) -> Option<Option<Rc<FunctionDef>>> {
        let start = self.current_span();
        if is_async {
            self.advance();
        }
        self.expect(&TokenKind::Function)?;
        if self.check_exact(&TokenKind::Star) {
            self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "Generators are not supported");
            return None;
        }
        let name = if name_required || matches!(self.peek_kind(), TokenKind::Identifier(_)) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let params = self.parse_signature()?;
        if !self.check_exact(&TokenKind::LBrace) {
            self.consume_semicolon()?;
            return Some(None);
        }
        let body = self.parse_function_body(is_async)?;
        Some(Some(Rc::new(FunctionDef {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            is_async,
            span: start.merge(self.previous_span()),
        })))
    }

    pub(crate) fn parse_function_expression(&mut self, is_async: bool) -> Option<Expr> {
        let start = self.current_span();
        match self.parse_function(is_async, false)? {
            Some(def) => {
                let span = def.span;
                Some(Expr::new(ExprKind::Function(def), span))
            }
            None => {
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "Function implementation is missing",
                    start.merge(self.previous_span()),
                );
                None
            }
        }
    }

    /// `<T>(params): ReturnType`
    pub(crate) fn parse_signature(&mut self) -> Option<Vec<Param>> {
        self.skip_type_params()?;
        let params = self.parse_params()?;
        self.skip_type_annotation()?;
        Some(params)
    }

    /// A function body, with the per-function context reset around it.
    pub(crate) fn parse_function_body(&mut self, is_async: bool) -> Option<Vec<Stmt>> {
        let in_function = std::mem::replace(&mut self.in_function, true);
        let in_sync = std::mem::replace(&mut self.in_sync_function, !is_async);
        let no_in = std::mem::replace(&mut self.no_in, false);
        let loops = std::mem::replace(&mut self.loops, 0);
        let switches = std::mem::replace(&mut self.switches, 0);
        let labels = std::mem::take(&mut self.labels);

        let body = self.parse_block_body();

        self.in_function = in_function;
        self.in_sync_function = in_sync;
        self.no_in = no_in;
        self.loops = loops;
        self.switches = switches;
        self.labels = labels;
        body
    }

    /// `( [param { "," param }] )`
    pub(crate) fn parse_params(&mut self) -> Option<Vec<Param>> {
        self.expect(&TokenKind::LParen)?;
        let params = self.allowing_in(|p| {
            let mut params = Vec::new();
            while !p.check_exact(&TokenKind::RParen) {
                if let Some(param) = p.parse_param()? {
                    let last = param.rest;
                    params.push(param);
                    if last && !p.check_exact(&TokenKind::RParen) {
                        p.error_at_current(
                            ErrorCode::UNEXPECTED_TOKEN,
                            "A rest parameter must be last in a parameter list",
                        );
                        return None;
                    }
                }
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Some(params)
        })?;
        self.expect(&TokenKind::RParen)?;
        Some(params)
    }

    /// One parameter. `Some(None)` for a TypeScript `this: T` parameter.
    fn parse_param(&mut self) -> Option<Option<Param>> {
        let start = self.current_span();
        if self.check_exact(&TokenKind::At) {
            self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "Decorators are not supported");
            return None;
        }
        let mut property = false;
        while let TokenKind::Identifier(word) = self.peek_kind() {
            let modifies = PARAM_PROPERTY_MODIFIERS.contains(&word.as_str())
                && matches!(
                    self.look_ahead(1),
                    TokenKind::Identifier(_) | TokenKind::LBrace | TokenKind::LBracket
                );
            if !modifies {
                break;
            }
            property = true;
            self.advance();
        }
        if self.check_exact(&TokenKind::This) {
            self.advance();
            self.skip_type_annotation()?;
            return Some(None);
        }
        let rest = self.eat(&TokenKind::DotDotDot);
        let target = self.parse_binding_target()?;
        self.eat(&TokenKind::Question);
        self.skip_type_annotation()?;
        let pattern = if self.eat(&TokenKind::Eq) {
            let default = self.parse_assignment()?;
            Pattern::Assign {
                target: Box::new(target),
                default: Box::new(default),
            }
        } else {
            target
        };
        Some(Some(Param {
            pattern,
            rest,
            property,
            span: start.merge(self.previous_span()),
        }))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Binding Patterns
    // ══════════════════════════════════════════════════════════════════════════

    /// `name`, `{ a, b: c = 1, ...rest }` or `[a, , b = 2, ...rest]`
    pub(crate) fn parse_binding_target(&mut self) -> Option<Pattern> {
        if !self.enter() {
            return None;
        }
        let result = match self.peek_kind() {
            TokenKind::LBrace => self.parse_object_binding(),
            TokenKind::LBracket => self.parse_array_binding(),
            _ => self.expect_identifier().map(Pattern::Ident),
        };
        self.leave();
        result
    }

    /// A binding target with an optional `= default`.
    fn parse_binding_element(&mut self) -> Option<Pattern> {
        let target = self.parse_binding_target()?;
        if !self.eat(&TokenKind::Eq) {
            return Some(target);
        }
        let default = self.allowing_in(|p| p.parse_assignment())?;
        Some(Pattern::Assign {
            target: Box::new(target),
            default: Box::new(default),
        })
    }

    fn parse_object_binding(&mut self) -> Option<Pattern> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        let mut props = Vec::new();
        let mut rest = None;
        while !self.check_exact(&TokenKind::RBrace) {
            if self.eat(&TokenKind::DotDotDot) {
                rest = Some(Box::new(Pattern::Ident(self.expect_identifier()?)));
                break;
            }
            let (key, shorthand) = self.parse_property_key()?;
            let value = if self.eat(&TokenKind::Colon) {
                self.parse_binding_element()?
            } else {
                let Some(ident) = shorthand else {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("':' expected, got '{}'", self.peek_kind()),
                    );
                    return None;
                };
                if self.eat(&TokenKind::Eq) {
                    let default = self.allowing_in(|p| p.parse_assignment())?;
                    Pattern::Assign {
                        target: Box::new(Pattern::Ident(ident)),
                        default: Box::new(default),
                    }
                } else {
                    Pattern::Ident(ident)
                }
            };
            props.push(ObjectPatternProp { key, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Some(Pattern::Object {
            props,
            rest,
            span: start.merge(self.previous_span()),
        })
    }

    fn parse_array_binding(&mut self) -> Option<Pattern> {
        let start = self.current_span();
        self.expect(&TokenKind::LBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;
        while !self.check_exact(&TokenKind::RBracket) {
            if self.eat(&TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            if self.eat(&TokenKind::DotDotDot) {
                rest = Some(Box::new(self.parse_binding_target()?));
                break;
            }
            elements.push(Some(self.parse_binding_element()?));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Some(Pattern::Array {
            elements,
            rest,
            span: start.merge(self.previous_span()),
        })
    }
}
