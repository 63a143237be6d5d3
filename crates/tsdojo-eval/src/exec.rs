//! Statement execution, hoisting and pattern binding.

use std::rc::Rc;

use tsdojo_types::ast::*;
use tsdojo_types::format_number;

use crate::env::{AssignError, Scope};
use crate::error::{EvalError, EvalResult};
use crate::interpreter::{define_hidden, Interpreter};
use crate::ops::to_boolean;
use crate::value::{ClosureKind, JsValue, Obj};

/// How a pattern introduces its names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    Var,
    Let,
    Const,
    /// Destructuring assignment to existing targets.
    Assign,
}

impl From<VarKind> for BindMode {
    fn from(kind: VarKind) -> Self {
        match kind {
            VarKind::Var => BindMode::Var,
            VarKind::Let => BindMode::Let,
            VarKind::Const => BindMode::Const,
        }
    }
}

/// What a loop does after one pass of its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Exit,
}

fn is_loop(stmt: &Stmt) -> bool {
    matches!(
        stmt.kind,
        StmtKind::For { .. }
            | StmtKind::ForOf { .. }
            | StmtKind::ForIn { .. }
            | StmtKind::While { .. }
            | StmtKind::DoWhile { .. }
    )
}

fn is_anonymous_definition(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Function(def) => def.name.is_none(),
        ExprKind::Class(def) => def.name.is_none(),
        _ => false,
    }
}

impl Interpreter {
    // ══════════════════════════════════════════════════════════════════════
    // Hoisting
    // ══════════════════════════════════════════════════════════════════════

    /// Hoist `var` names into the function scope and function declarations
    /// into `scope`.
    pub(crate) fn hoist_declarations(&mut self, stmts: &[Stmt], scope: &Scope) {
        hoist_vars(stmts, scope);
        self.hoist_functions(stmts, scope);
    }

    pub(crate) fn hoist_functions(&mut self, stmts: &[Stmt], scope: &Scope) {
        for stmt in stmts {
            if let StmtKind::Function(def) = &stmt.kind {
                let closure = self.make_closure(def, scope, ClosureKind::Normal, None);
                scope.declare(def.name_str(), JsValue::Object(closure), true);
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt, scope: &Scope) -> EvalResult<()> {
        self.replay(|this| this.exec_stmt_kind(stmt, scope))
    }

    fn exec_stmt_kind(&mut self, stmt: &Stmt, scope: &Scope) -> EvalResult<()> {
        self.tick()?;
        match &stmt.kind {
            StmtKind::Var(decl) => self.exec_var_decl(decl, scope),
            StmtKind::Function(_) | StmtKind::Empty => Ok(()),
            StmtKind::Class(def) => {
                let ctor = self.eval_class(def, scope)?;
                if let Some(name) = &def.name {
                    scope.declare(&name.name, JsValue::Object(ctor), true);
                }
                Ok(())
            }
            StmtKind::Enum(decl) => self.exec_enum(decl, scope),
            StmtKind::Expr(expr) => self.eval_expr(expr, scope).map(drop),
            StmtKind::Block(stmts) => self.exec_block(stmts, scope),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let test = self.eval_expr(condition, scope)?;
                if to_boolean(&test) {
                    self.exec_stmt(then_branch, scope)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch, scope)
                } else {
                    Ok(())
                }
            }
            StmtKind::For { .. }
            | StmtKind::ForOf { .. }
            | StmtKind::ForIn { .. }
            | StmtKind::While { .. }
            | StmtKind::DoWhile { .. } => self.exec_loop(stmt, scope, &[]),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, scope)?,
                    None => JsValue::Undefined,
                };
                Err(EvalError::Return(value))
            }
            StmtKind::Break(label) => Err(EvalError::Break(label.clone())),
            StmtKind::Continue(label) => Err(EvalError::Continue(label.clone())),
            StmtKind::Throw(expr) => Err(EvalError::Throw(self.eval_expr(expr, scope)?)),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => self.exec_try(block, handler.as_ref(), finalizer.as_deref(), scope),
            StmtKind::Switch {
                discriminant,
                cases,
            } => self.exec_switch(discriminant, cases, scope),
            StmtKind::Labeled { label, body } => self.exec_labeled(label, body, scope),
        }
    }

    pub(crate) fn exec_block(&mut self, stmts: &[Stmt], scope: &Scope) -> EvalResult<()> {
        let inner = self.replay(|this| {
            let inner = scope.child();
            this.hoist_functions(stmts, &inner);
            Ok(inner)
        })?;
        for stmt in stmts {
            self.exec_stmt(stmt, &inner)?;
        }
        Ok(())
    }

    fn exec_var_decl(&mut self, decl: &VarDecl, scope: &Scope) -> EvalResult<()> {
        for declarator in &decl.declarators {
            self.replay(|this| this.exec_declarator(decl.kind, declarator, scope))?;
        }
        Ok(())
    }

    fn exec_declarator(&mut self, kind: VarKind, declarator: &VarDeclarator, scope: &Scope) -> EvalResult<()> {
        let value = match &declarator.init {
            Some(init) => {
                let name = match &declarator.target {
                    Pattern::Ident(id) => Some(id.name.as_str()),
                    _ => None,
                };
                self.eval_named(init, name, scope)?
            }
            // `var x;` keeps whatever the hoisted binding holds.
            None if kind == VarKind::Var => return Ok(()),
            None => JsValue::Undefined,
        };
        self.bind_pattern(&declarator.target, value, scope, BindMode::from(kind))
    }

    /// Evaluate `expr`, naming it after its binding when it is an anonymous
    /// function or class.
    pub(crate) fn eval_named(
        &mut self,
        expr: &Expr,
        name: Option<&str>,
        scope: &Scope,
    ) -> EvalResult<JsValue> {
        let value = self.eval_expr(expr, scope)?;
        if let (Some(name), JsValue::Object(obj)) = (name, &value) {
            if is_anonymous_definition(expr) {
                define_hidden(obj, "name", JsValue::str(name));
            }
        }
        Ok(value)
    }

    /// Numeric members count up from the previous one and get a reverse
    /// mapping; string members map one way only.
    fn exec_enum(&mut self, decl: &EnumDecl, scope: &Scope) -> EvalResult<()> {
        let target = match scope.lookup(&decl.name.name) {
            Some(JsValue::Object(existing)) if scope.has_own(&decl.name.name) => existing,
            _ => self.new_object(),
        };
        let members = scope.child();
        let mut next = 0.0;
        for member in &decl.members {
            let value = match &member.init {
                Some(init) => self.eval_expr(init, &members)?,
                None => JsValue::Number(next),
            };
            match &value {
                JsValue::Number(n) => {
                    next = n + 1.0;
                    self.define_own(&target, &format_number(*n), JsValue::str(&member.name));
                }
                _ => next = f64::NAN,
            }
            self.define_own(&target, &member.name, value.clone());
            members.declare(&member.name, value, false);
        }
        scope.declare(&decl.name.name, JsValue::Object(target), true);
        Ok(())
    }

    // ── Loops ─────────────────────────────────────────────────────────────

    fn exec_loop(&mut self, stmt: &Stmt, scope: &Scope, labels: &[String]) -> EvalResult<()> {
        match &stmt.kind {
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body, scope, labels),
            StmtKind::ForOf {
                binding,
                iterable,
                body,
            } => self.exec_for_of(binding, iterable, body, scope, labels),
            StmtKind::ForIn {
                binding,
                object,
                body,
            } => self.exec_for_in(binding, object, body, scope, labels),
            StmtKind::While { condition, body } => {
                let (slot, _) = self.loop_progress::<()>()?;
                loop {
                    let test = self.eval_expr(condition, scope)?;
                    if !to_boolean(&test) || self.loop_body(body, scope, labels)? == Flow::Exit {
                        return Ok(());
                    }
                    self.save_progress(slot, &());
                }
            }
            StmtKind::DoWhile { body, condition } => {
                let (slot, _) = self.loop_progress::<()>()?;
                loop {
                    if self.loop_body(body, scope, labels)? == Flow::Exit {
                        return Ok(());
                    }
                    let test = self.eval_expr(condition, scope)?;
                    if !to_boolean(&test) {
                        return Ok(());
                    }
                    self.save_progress(slot, &());
                }
            }
            _ => self.exec_stmt(stmt, scope),
        }
    }

    fn loop_body(&mut self, body: &Stmt, scope: &Scope, labels: &[String]) -> EvalResult<Flow> {
        match self.exec_stmt(body, scope) {
            Ok(()) | Err(EvalError::Continue(None)) => Ok(Flow::Next),
            Err(EvalError::Break(None)) => Ok(Flow::Exit),
            Err(EvalError::Continue(Some(label))) if labels.contains(&label) => Ok(Flow::Next),
            Err(EvalError::Break(Some(label))) if labels.contains(&label) => Ok(Flow::Exit),
            Err(err) => Err(err),
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        scope: &Scope,
        labels: &[String],
    ) -> EvalResult<()> {
        let loop_scope = self.replay(|_| Ok(scope.child()))?;
        // `let` declarations get a fresh copy per iteration so closures
        // capture the value of that pass.
        let mut per_iteration: Vec<String> = Vec::new();
        match init {
            Some(ForInit::Var(decl)) => {
                self.exec_var_decl(decl, &loop_scope)?;
                if decl.kind != VarKind::Var {
                    per_iteration = decl
                        .declarators
                        .iter()
                        .flat_map(|d| d.target.bound_names())
                        .map(str::to_string)
                        .collect();
                }
            }
            Some(ForInit::Expr(expr)) => {
                self.eval_expr(expr, &loop_scope)?;
            }
            None => {}
        }
        let first = if per_iteration.is_empty() {
            loop_scope
        } else {
            self.replay(|_| Ok(loop_scope.copy_for_iteration(&per_iteration)))?
        };
        let (slot, resumed) = self.loop_progress::<Scope>()?;
        let mut iteration = resumed.unwrap_or(first);
        loop {
            if let Some(test) = test {
                let value = self.eval_expr(test, &iteration)?;
                if !to_boolean(&value) {
                    return Ok(());
                }
            }
            if self.loop_body(body, &iteration, labels)? == Flow::Exit {
                return Ok(());
            }
            if !per_iteration.is_empty() {
                let previous = iteration;
                iteration = self.replay(|_| Ok(previous.copy_for_iteration(&per_iteration)))?;
            }
            if let Some(update) = update {
                self.eval_expr(update, &iteration)?;
            }
            self.save_progress(slot, &iteration);
        }
    }

    fn exec_for_of(
        &mut self,
        binding: &ForBinding,
        iterable: &Expr,
        body: &Stmt,
        scope: &Scope,
        labels: &[String],
    ) -> EvalResult<()> {
        let value = self.eval_expr(iterable, scope)?;
        // Arrays are walked live so pushes during the loop are visited.
        if let Some(array) = value.as_object().filter(|o| o.is_array()).cloned() {
            let (slot, resumed) = self.loop_progress::<usize>()?;
            let mut index = resumed.unwrap_or(0);
            while let Some(item) = self.replay(|_| Ok(array.element_at(index)))? {
                index += 1;
                if self.for_each_pass(binding, item, body, scope, labels)? == Flow::Exit {
                    break;
                }
                self.save_progress(slot, &index);
            }
            return Ok(());
        }
        let items: Vec<JsValue> = self.replay(|this| this.iterate(&value))?;
        let (slot, resumed) = self.loop_progress::<usize>()?;
        let start = resumed.unwrap_or(0);
        for (position, item) in items.into_iter().enumerate().skip(start) {
            if self.for_each_pass(binding, item, body, scope, labels)? == Flow::Exit {
                break;
            }
            self.save_progress(slot, &(position + 1));
        }
        Ok(())
    }

    fn exec_for_in(
        &mut self,
        binding: &ForBinding,
        object: &Expr,
        body: &Stmt,
        scope: &Scope,
        labels: &[String],
    ) -> EvalResult<()> {
        let value = self.eval_expr(object, scope)?;
        let target: Option<Obj> = value.as_object().cloned();
        let keys: Vec<JsValue> = self.replay(|this| {
            Ok(match &value {
                JsValue::Object(obj) => this
                    .for_in_keys(obj)
                    .into_iter()
                    .map(JsValue::String)
                    .collect(),
                JsValue::String(s) => (0..crate::ops::utf16_len(s))
                    .map(|i| JsValue::from(i.to_string()))
                    .collect(),
                _ => Vec::new(),
            })
        })?;
        let (slot, resumed) = self.loop_progress::<usize>()?;
        let start = resumed.unwrap_or(0);
        for (position, key) in keys.into_iter().enumerate().skip(start) {
            // Keys deleted by an earlier pass are skipped.
            let present = self.replay(|this| {
                Ok(match (&target, &key) {
                    (Some(obj), JsValue::String(k)) => this.has_property(obj, k),
                    _ => true,
                })
            })?;
            if present && self.for_each_pass(binding, key, body, scope, labels)? == Flow::Exit {
                break;
            }
            self.save_progress(slot, &(position + 1));
        }
        Ok(())
    }

    fn for_each_pass(
        &mut self,
        binding: &ForBinding,
        value: JsValue,
        body: &Stmt,
        scope: &Scope,
        labels: &[String],
    ) -> EvalResult<Flow> {
        let pass = self.replay(|this| {
            let pass = scope.child();
            match binding {
                ForBinding::Decl(kind, pattern) => {
                    this.bind_pattern(pattern, value, &pass, BindMode::from(*kind))?
                }
                ForBinding::Target(pattern) => {
                    this.bind_pattern(pattern, value, &pass, BindMode::Assign)?
                }
            }
            Ok(pass)
        })?;
        self.loop_body(body, &pass, labels)
    }

    // ── Try / switch / labels ─────────────────────────────────────────────

    fn exec_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
        scope: &Scope,
    ) -> EvalResult<()> {
        let mut result = self.exec_block(block, scope);
        if let (Err(EvalError::Throw(thrown)), Some(handler)) = (&result, handler) {
            let thrown = thrown.clone();
            result = self
                .replay(|this| {
                    let catch_scope = scope.child();
                    if let Some(param) = &handler.param {
                        this.bind_pattern(param, thrown, &catch_scope, BindMode::Let)?;
                    }
                    Ok(catch_scope)
                })
                .and_then(|catch_scope| self.exec_block(&handler.body, &catch_scope));
        }
        if let Some(finalizer) = finalizer {
            if result.as_ref().is_err_and(EvalError::is_fatal) {
                return result;
            }
            self.exec_block(finalizer, scope)?;
        }
        result
    }

    fn exec_switch(
        &mut self,
        discriminant: &Expr,
        cases: &[SwitchCase],
        scope: &Scope,
    ) -> EvalResult<()> {
        let value = self.eval_expr(discriminant, scope)?;
        let body = self.replay(|this| {
            let body = scope.child();
            for case in cases {
                this.hoist_functions(&case.body, &body);
            }
            Ok(body)
        })?;
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let candidate = self.eval_expr(test, &body)?;
                if candidate.strict_equals(&value) {
                    start = Some(i);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| cases.iter().position(|c| c.test.is_none())) else {
            return Ok(());
        };
        for case in &cases[start..] {
            for stmt in &case.body {
                match self.exec_stmt(stmt, &body) {
                    Ok(()) => {}
                    Err(EvalError::Break(None)) => return Ok(()),
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    fn exec_labeled(&mut self, label: &str, body: &Stmt, scope: &Scope) -> EvalResult<()> {
        let mut labels = vec![label.to_string()];
        let mut inner = body;
        while let StmtKind::Labeled { label, body } = &inner.kind {
            labels.push(label.clone());
            inner = body;
        }
        let result = if is_loop(inner) {
            self.exec_loop(inner, scope, &labels)
        } else {
            self.exec_stmt(inner, scope)
        };
        match result {
            Err(EvalError::Break(Some(target))) if labels.contains(&target) => Ok(()),
            other => other,
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Patterns
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn assign_name(&mut self, name: &str, value: JsValue, scope: &Scope) -> EvalResult<()> {
        match scope.assign(name, value) {
            Ok(()) => Ok(()),
            Err(AssignError::Constant) => Err(self.type_error("Assignment to constant variable.")),
            Err(AssignError::Undeclared) => {
                Err(self.reference_error(format!("{name} is not defined")))
            }
        }
    }

    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: JsValue,
        scope: &Scope,
        mode: BindMode,
    ) -> EvalResult<()> {
        match pattern {
            Pattern::Ident(id) => match mode {
                BindMode::Let => {
                    scope.declare(&id.name, value, true);
                    Ok(())
                }
                BindMode::Const => {
                    scope.declare(&id.name, value, false);
                    Ok(())
                }
                BindMode::Var | BindMode::Assign => self.assign_name(&id.name, value, scope),
            },
            Pattern::Expr(target) => self.assign_to_expr(target, value, scope),
            Pattern::Assign { target, default } => {
                let value = if value.is_undefined() {
                    let name = match target.as_ref() {
                        Pattern::Ident(id) => Some(id.name.as_str()),
                        _ => None,
                    };
                    self.eval_named(default, name, scope)?
                } else {
                    value
                };
                self.bind_pattern(target, value, scope, mode)
            }
            Pattern::Object { props, rest, .. } => {
                if value.is_nullish() {
                    return Err(self.type_error(format!(
                        "Cannot destructure '{value:?}' as it is {value:?}."
                    )));
                }
                let mut used: Vec<Rc<str>> = Vec::with_capacity(props.len());
                for prop in props {
                    let key = self.resolve_prop_key(&prop.key, scope)?;
                    let item = self.get(&value, &key)?;
                    used.push(key);
                    self.bind_pattern(&prop.value, item, scope, mode)?;
                }
                if let Some(rest) = rest {
                    let remaining = self.new_object();
                    if let JsValue::Object(source) = &value {
                        for key in self.own_keys(source) {
                            if !used.contains(&key) {
                                let item = self.get(&value, &key)?;
                                self.define_own(&remaining, &key, item);
                            }
                        }
                    }
                    self.bind_pattern(rest, JsValue::Object(remaining), scope, mode)?;
                }
                Ok(())
            }
            Pattern::Array { elements, rest, .. } => {
                let items = self.iterate(&value)?;
                let mut items = items.into_iter();
                for element in elements {
                    let item = items.next().unwrap_or(JsValue::Undefined);
                    if let Some(element) = element {
                        self.bind_pattern(element, item, scope, mode)?;
                    }
                }
                if let Some(rest) = rest {
                    let remaining = self.array_value(items.collect());
                    self.bind_pattern(rest, remaining, scope, mode)?;
                }
                Ok(())
            }
        }
    }
}

fn hoist_vars(stmts: &[Stmt], scope: &Scope) {
    for stmt in stmts {
        hoist_vars_in(stmt, scope);
    }
}

fn hoist_vars_in(stmt: &Stmt, scope: &Scope) {
    let declare = |decl: &VarDecl| {
        if decl.kind == VarKind::Var {
            for declarator in &decl.declarators {
                for name in declarator.target.bound_names() {
                    scope.declare_var(name);
                }
            }
        }
    };
    match &stmt.kind {
        StmtKind::Var(decl) => declare(decl),
        StmtKind::Block(stmts) => hoist_vars(stmts, scope),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            hoist_vars_in(then_branch, scope);
            if let Some(else_branch) = else_branch {
                hoist_vars_in(else_branch, scope);
            }
        }
        StmtKind::For { init, body, .. } => {
            if let Some(ForInit::Var(decl)) = init {
                declare(decl);
            }
            hoist_vars_in(body, scope);
        }
        StmtKind::ForOf { binding, body, .. } | StmtKind::ForIn { binding, body, .. } => {
            if let ForBinding::Decl(VarKind::Var, pattern) = binding {
                for name in pattern.bound_names() {
                    scope.declare_var(name);
                }
            }
            hoist_vars_in(body, scope);
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Labeled { body, .. } => hoist_vars_in(body, scope),
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            hoist_vars(block, scope);
            if let Some(handler) = handler {
                hoist_vars(&handler.body, scope);
            }
            if let Some(finalizer) = finalizer {
                hoist_vars(finalizer, scope);
            }
        }
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                hoist_vars(&case.body, scope);
            }
        }
        _ => {}
    }
}
