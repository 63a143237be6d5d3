//! Expression evaluation.

use std::rc::Rc;

use tsdojo_types::ast::*;

use crate::builtins::pow;
use crate::call::define_accessor;
use crate::env::Scope;
use crate::error::{EvalError, EvalResult};
use crate::exec::BindMode;
use crate::interpreter::{define_hidden, Interpreter};
use crate::ops::{to_boolean, to_int32, to_uint32, utf16_units, Hint, MAX_STRING_LENGTH};
use crate::value::{ClosureKind, JsStr, JsValue, Obj};

/// A resolved assignment target.
enum Reference {
    Name(String),
    Property { base: JsValue, key: JsValue },
    Super {
        base: Option<Obj>,
        key: JsStr,
        this: JsValue,
    },
}

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expr, scope: &Scope) -> EvalResult<JsValue> {
        self.replay(|this| this.eval_expr_kind(expr, scope))
    }

    fn eval_expr_kind(&mut self, expr: &Expr, scope: &Scope) -> EvalResult<JsValue> {
        self.tick()?;
        match &expr.kind {
            ExprKind::Number(n) => Ok(JsValue::Number(*n)),
            ExprKind::String(s) => Ok(JsValue::str(s)),
            ExprKind::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(i) {
                        let value = self.eval_expr(expr, scope)?;
                        out.push_str(&self.to_string(&value)?);
                    }
                }
                Ok(JsValue::from(out))
            }
            ExprKind::Bool(b) => Ok(JsValue::Bool(*b)),
            ExprKind::Null => Ok(JsValue::Null),
            ExprKind::Regex { pattern, flags } => self.new_regexp(pattern, flags).map(JsValue::Object),
            ExprKind::Array(elements) => self.eval_array_literal(elements, scope),
            ExprKind::Object(props) => self.eval_object_literal(props, scope),
            ExprKind::Function(def) => Ok(JsValue::Object(self.eval_function_expr(def, scope))),
            ExprKind::Class(def) => Ok(JsValue::Object(self.eval_class(def, scope)?)),

            ExprKind::Identifier(name) => self.lookup_identifier(name, scope),
            ExprKind::This => self.this_value(scope),

            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, scope),
            ExprKind::Update {
                op,
                prefix,
                target,
            } => self.eval_update(*op, *prefix, target, scope),
            ExprKind::Binary { left, op, right } => {
                let left = self.eval_expr(left, scope)?;
                let right = self.eval_expr(right, scope)?;
                self.binary_op(*op, &left, &right)
            }
            ExprKind::Logical { left, op, right } => {
                let left = self.eval_expr(left, scope)?;
                if keeps_left(*op, &left) {
                    Ok(left)
                } else {
                    self.eval_expr(right, scope)
                }
            }
            ExprKind::Assign { op, target, value } => self.eval_assign(*op, target, value, scope),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.eval_expr(test, scope)?;
                if to_boolean(&test) {
                    self.eval_expr(consequent, scope)
                } else {
                    self.eval_expr(alternate, scope)
                }
            }
            ExprKind::Sequence(exprs) => {
                let mut last = JsValue::Undefined;
                for expr in exprs {
                    last = self.eval_expr(expr, scope)?;
                }
                Ok(last)
            }
            ExprKind::Await(operand) => {
                let value = self.eval_expr(operand, scope)?;
                self.await_value(value)
            }

            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let base = self.eval_expr(object, scope)?;
                if *optional && base.is_nullish() {
                    return Err(EvalError::ShortCircuit);
                }
                let key = self.eval_member_key(property, scope)?;
                self.get_computed(&base, &key)
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => self.eval_call(callee, args, *optional, scope),
            ExprKind::New { callee, args } => {
                let ctor = self.eval_expr(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                let constructible = ctor.as_object().is_some_and(|o| self.is_constructor(o));
                if !constructible {
                    let shown = callee_text(callee).unwrap_or_else(|| self.describe(&ctor));
                    return Err(self.type_error(format!("{shown} is not a constructor")));
                }
                self.construct(&ctor, args, None)
            }
            ExprKind::OptionalChain(inner) => match self.eval_expr(inner, scope) {
                Err(EvalError::ShortCircuit) => Ok(JsValue::Undefined),
                other => other,
            },
            ExprKind::SuperCall(args) => {
                let args = self.eval_args(args, scope)?;
                self.super_call(args, scope)
            }
            ExprKind::SuperMember(property) => {
                let reference = self.super_reference(property, scope)?;
                self.get_reference(&reference, scope)
            }
        }
    }

    fn lookup_identifier(&mut self, name: &str, scope: &Scope) -> EvalResult<JsValue> {
        if let Some(value) = scope.lookup(name) {
            return Ok(value);
        }
        if name == "arguments" {
            if let Some((frame, _)) = scope.frame() {
                return Ok(self.array_value(frame.args.clone()));
            }
        }
        Err(self.reference_error(format!("{name} is not defined")))
    }

    /// A named function expression can refer to itself by name.
    fn eval_function_expr(&mut self, def: &Rc<FunctionDef>, scope: &Scope) -> Obj {
        match &def.name {
            Some(name) if !def.is_arrow => {
                let inner = scope.child();
                let function = self.make_closure(def, &inner, ClosureKind::Normal, None);
                inner.declare(&name.name, JsValue::Object(function.clone()), false);
                function
            }
            _ => self.make_closure(def, scope, ClosureKind::Normal, None),
        }
    }

    fn eval_array_literal(&mut self, elements: &[ArrayElement], scope: &Scope) -> EvalResult<JsValue> {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                ArrayElement::Expr(expr) => items.push(self.eval_expr(expr, scope)?),
                ArrayElement::Spread(expr) => {
                    let value = self.eval_expr(expr, scope)?;
                    let spread: Vec<JsValue> = self.replay(|this| this.iterate(&value))?;
                    items.extend(spread);
                }
                ArrayElement::Hole => items.push(JsValue::Undefined),
            }
        }
        Ok(self.array_value(items))
    }

    fn eval_object_literal(&mut self, props: &[ObjectProp], scope: &Scope) -> EvalResult<JsValue> {
        let obj = self.new_object();
        for prop in props {
            match prop {
                ObjectProp::KeyValue(key, value) => {
                    let key = self.resolve_prop_key(key, scope)?;
                    let value = self.eval_named(value, Some(&*key), scope)?;
                    self.define_own(&obj, &key, value);
                }
                ObjectProp::Shorthand(ident) => {
                    let value = self.replay(|this| this.lookup_identifier(&ident.name, scope))?;
                    self.define_own(&obj, &ident.name, value);
                }
                ObjectProp::Spread(expr) => {
                    let source = self.eval_expr(expr, scope)?;
                    self.copy_data_properties(&obj, &source)?;
                }
                ObjectProp::Method(key, def) => {
                    let key = self.resolve_prop_key(key, scope)?;
                    let method = self.make_closure(def, scope, ClosureKind::Method, Some(obj.clone()));
                    define_hidden(&method, "name", JsValue::String(key.clone()));
                    self.define_own(&obj, &key, JsValue::Object(method));
                }
                ObjectProp::Getter(key, def) => {
                    let key = self.resolve_prop_key(key, scope)?;
                    let getter = self.make_closure(def, scope, ClosureKind::Method, Some(obj.clone()));
                    define_accessor(&obj, &key, Some(getter), None, true);
                }
                ObjectProp::Setter(key, def) => {
                    let key = self.resolve_prop_key(key, scope)?;
                    let setter = self.make_closure(def, scope, ClosureKind::Method, Some(obj.clone()));
                    define_accessor(&obj, &key, None, Some(setter), true);
                }
            }
        }
        Ok(JsValue::Object(obj))
    }

    /// Copy own enumerable properties of `source` onto `target`, as object
    /// spread does.
    pub(crate) fn copy_data_properties(&mut self, target: &Obj, source: &JsValue) -> EvalResult<()> {
        match source {
            JsValue::Object(obj) => {
                for key in self.own_keys(obj) {
                    let value = self.get(source, &key)?;
                    self.define_own(target, &key, value);
                }
            }
            JsValue::String(s) => {
                for (i, c) in s.chars().enumerate() {
                    self.define_own(target, &i.to_string(), JsValue::from(c.to_string()));
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ── Operators ─────────────────────────────────────────────────────────

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, scope: &Scope) -> EvalResult<JsValue> {
        match op {
            UnaryOp::TypeOf => {
                if let ExprKind::Identifier(name) = &operand.kind {
                    if scope.lookup(name).is_none() && name != "arguments" {
                        return Ok(JsValue::str("undefined"));
                    }
                }
                let value = self.eval_expr(operand, scope)?;
                Ok(JsValue::str(value.type_of()))
            }
            UnaryOp::Delete => match &operand.kind {
                ExprKind::Member {
                    object, property, ..
                } => {
                    let base = self.eval_expr(object, scope)?;
                    let key = self.eval_member_key(property, scope)?;
                    let key = self.to_property_key(&key)?;
                    Ok(JsValue::Bool(self.delete_property(&base, &key)?))
                }
                ExprKind::Identifier(_) => Ok(JsValue::Bool(false)),
                _ => {
                    self.eval_expr(operand, scope)?;
                    Ok(JsValue::Bool(true))
                }
            },
            UnaryOp::Void => {
                self.eval_expr(operand, scope)?;
                Ok(JsValue::Undefined)
            }
            UnaryOp::Not => {
                let value = self.eval_expr(operand, scope)?;
                Ok(JsValue::Bool(!to_boolean(&value)))
            }
            UnaryOp::Neg => {
                let value = self.eval_expr(operand, scope)?;
                Ok(JsValue::Number(-self.to_number(&value)?))
            }
            UnaryOp::Plus => {
                let value = self.eval_expr(operand, scope)?;
                Ok(JsValue::Number(self.to_number(&value)?))
            }
            UnaryOp::BitNot => {
                let value = self.eval_expr(operand, scope)?;
                let n = self.to_number(&value)?;
                Ok(JsValue::Number(f64::from(!to_int32(n))))
            }
        }
    }

    fn eval_update(
        &mut self,
        op: UpdateOp,
        prefix: bool,
        target: &Expr,
        scope: &Scope,
    ) -> EvalResult<JsValue> {
        let reference = self.eval_reference(target, scope)?;
        let old = self.get_reference(&reference, scope)?;
        let old = self.to_number(&old)?;
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.put_reference(&reference, JsValue::Number(new), scope)?;
        Ok(JsValue::Number(if prefix { new } else { old }))
    }

    pub(crate) fn binary_op(
        &mut self,
        op: BinOp,
        left: &JsValue,
        right: &JsValue,
    ) -> EvalResult<JsValue> {
        Ok(match op {
            BinOp::Add => return self.add(left, right),
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::Exp => {
                let a = self.to_number(left)?;
                let b = self.to_number(right)?;
                JsValue::Number(arithmetic(op, a, b))
            }
            BinOp::Shl | BinOp::Shr | BinOp::UShr | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                let a = self.to_number(left)?;
                let b = self.to_number(right)?;
                JsValue::Number(bitwise(op, a, b))
            }
            BinOp::Eq => JsValue::Bool(self.loose_equals(left, right)?),
            BinOp::NotEq => JsValue::Bool(!self.loose_equals(left, right)?),
            BinOp::StrictEq => JsValue::Bool(left.strict_equals(right)),
            BinOp::StrictNotEq => JsValue::Bool(!left.strict_equals(right)),
            BinOp::Less => JsValue::Bool(self.less_than(left, right, true)? == Some(true)),
            BinOp::Greater => JsValue::Bool(self.less_than(right, left, false)? == Some(true)),
            BinOp::LessEq => JsValue::Bool(self.less_than(right, left, false)? == Some(false)),
            BinOp::GreaterEq => JsValue::Bool(self.less_than(left, right, true)? == Some(false)),
            BinOp::In => {
                let JsValue::Object(obj) = right else {
                    let key = self.to_string(left)?;
                    return Err(self.type_error(format!(
                        "Cannot use 'in' operator to search for '{key}' in {}",
                        self.describe(right)
                    )));
                };
                let key = self.to_property_key(left)?;
                JsValue::Bool(self.has_property(obj, &key))
            }
            BinOp::InstanceOf => JsValue::Bool(self.instance_of(left, right)?),
        })
    }

    fn add(&mut self, left: &JsValue, right: &JsValue) -> EvalResult<JsValue> {
        if let (JsValue::Number(a), JsValue::Number(b)) = (left, right) {
            return Ok(JsValue::Number(a + b));
        }
        let left = self.to_primitive(left, Hint::Default)?;
        let right = self.to_primitive(right, Hint::Default)?;
        if matches!(left, JsValue::String(_)) || matches!(right, JsValue::String(_)) {
            let a = self.to_string(&left)?;
            let b = self.to_string(&right)?;
            if a.len() + b.len() > MAX_STRING_LENGTH {
                return Err(self.range_error("Invalid string length"));
            }
            let mut out = String::with_capacity(a.len() + b.len());
            out.push_str(&a);
            out.push_str(&b);
            return Ok(JsValue::from(out));
        }
        let a = self.to_number(&left)?;
        let b = self.to_number(&right)?;
        Ok(JsValue::Number(a + b))
    }

    /// Abstract relational comparison `a < b`; `None` when either side is
    /// `NaN`. `left_first` fixes the order in which operands are converted.
    fn less_than(&mut self, a: &JsValue, b: &JsValue, left_first: bool) -> EvalResult<Option<bool>> {
        let (a, b) = if left_first {
            let a = self.to_primitive(a, Hint::Number)?;
            (a, self.to_primitive(b, Hint::Number)?)
        } else {
            let b = self.to_primitive(b, Hint::Number)?;
            (self.to_primitive(a, Hint::Number)?, b)
        };
        if let (JsValue::String(x), JsValue::String(y)) = (&a, &b) {
            return Ok(Some(utf16_units(x) < utf16_units(y)));
        }
        let x = self.to_number(&a)?;
        let y = self.to_number(&b)?;
        if x.is_nan() || y.is_nan() {
            return Ok(None);
        }
        Ok(Some(x < y))
    }

    // ── Assignment ────────────────────────────────────────────────────────

    fn eval_assign(
        &mut self,
        op: AssignOp,
        target: &Pattern,
        value: &Expr,
        scope: &Scope,
    ) -> EvalResult<JsValue> {
        let name = match target {
            Pattern::Ident(id) => Some(id.name.as_str()),
            _ => None,
        };
        match op {
            AssignOp::Assign => match target {
                Pattern::Ident(id) => {
                    let value = self.eval_named(value, name, scope)?;
                    self.assign_name(&id.name, value.clone(), scope)?;
                    Ok(value)
                }
                Pattern::Expr(expr) => {
                    let reference = self.eval_reference(expr, scope)?;
                    let value = self.eval_expr(value, scope)?;
                    self.put_reference(&reference, value.clone(), scope)?;
                    Ok(value)
                }
                _ => {
                    let value = self.eval_expr(value, scope)?;
                    self.bind_pattern(target, value.clone(), scope, BindMode::Assign)?;
                    Ok(value)
                }
            },
            AssignOp::Compound(bin) => {
                let reference = self.pattern_reference(target, scope)?;
                let old = self.replay(|this| this.get_reference(&reference, scope))?;
                let rhs = self.eval_expr(value, scope)?;
                let new = self.binary_op(bin, &old, &rhs)?;
                self.put_reference(&reference, new.clone(), scope)?;
                Ok(new)
            }
            AssignOp::Logical(logical) => {
                let reference = self.pattern_reference(target, scope)?;
                let old = self.replay(|this| this.get_reference(&reference, scope))?;
                if keeps_left(logical, &old) {
                    return Ok(old);
                }
                let value = self.eval_named(value, name, scope)?;
                self.put_reference(&reference, value.clone(), scope)?;
                Ok(value)
            }
        }
    }

    /// Store `value` into a member or name expression used as a
    /// destructuring target.
    pub(crate) fn assign_to_expr(&mut self, target: &Expr, value: JsValue, scope: &Scope) -> EvalResult<()> {
        let reference = self.eval_reference(target, scope)?;
        self.put_reference(&reference, value, scope)
    }

    fn pattern_reference(&mut self, target: &Pattern, scope: &Scope) -> EvalResult<Reference> {
        match target {
            Pattern::Ident(id) => Ok(Reference::Name(id.name.clone())),
            Pattern::Expr(expr) => self.eval_reference(expr, scope),
            _ => Err(self.throw_error("SyntaxError", "Invalid left-hand side in assignment")),
        }
    }

    fn eval_reference(&mut self, target: &Expr, scope: &Scope) -> EvalResult<Reference> {
        match &target.kind {
            ExprKind::Identifier(name) => Ok(Reference::Name(name.clone())),
            ExprKind::Member {
                object, property, ..
            } => {
                let base = self.eval_expr(object, scope)?;
                let key = self.eval_member_key(property, scope)?;
                Ok(Reference::Property { base, key })
            }
            ExprKind::SuperMember(property) => self.super_reference(property, scope),
            _ => Err(self.throw_error("SyntaxError", "Invalid left-hand side in assignment")),
        }
    }

    fn super_reference(&mut self, property: &MemberProp, scope: &Scope) -> EvalResult<Reference> {
        let key = self.eval_member_key(property, scope)?;
        let key = self.to_property_key(&key)?;
        let base = self.super_base(scope)?;
        let this = self.this_value(scope)?;
        Ok(Reference::Super { base, key, this })
    }

    fn get_reference(&mut self, reference: &Reference, scope: &Scope) -> EvalResult<JsValue> {
        match reference {
            Reference::Name(name) => self.lookup_identifier(name, scope),
            Reference::Property { base, key } => self.get_computed(base, key),
            Reference::Super { base, key, this } => match base {
                Some(base) => self.get_from(base, key, this),
                None => Ok(JsValue::Undefined),
            },
        }
    }

    fn put_reference(&mut self, reference: &Reference, value: JsValue, scope: &Scope) -> EvalResult<()> {
        match reference {
            Reference::Name(name) => self.assign_name(name, value, scope),
            Reference::Property { base, key } => self.set_computed(base, key, value),
            Reference::Super { key, this, .. } => self.set(this, key, value),
        }
    }

    /// The key of a member access. Numbers and strings pass through; other
    /// values are converted once so compound assignment sees one key.
    fn eval_member_key(&mut self, property: &MemberProp, scope: &Scope) -> EvalResult<JsValue> {
        match property {
            MemberProp::Static(name) => Ok(JsValue::str(name)),
            MemberProp::Computed(expr) => match self.eval_expr(expr, scope)? {
                key @ (JsValue::Number(_) | JsValue::String(_)) => Ok(key),
                other => Ok(JsValue::String(self.to_property_key(&other)?)),
            },
        }
    }

    // ── Calls ─────────────────────────────────────────────────────────────

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Argument],
        optional: bool,
        scope: &Scope,
    ) -> EvalResult<JsValue> {
        let (function, this) = match &callee.kind {
            ExprKind::Member {
                object,
                property,
                optional: member_optional,
            } => {
                let base = self.eval_expr(object, scope)?;
                if *member_optional && base.is_nullish() {
                    return Err(EvalError::ShortCircuit);
                }
                let key = self.eval_member_key(property, scope)?;
                let function = self.replay(|this| this.get_computed(&base, &key))?;
                (function, base)
            }
            ExprKind::SuperMember(property) => {
                let key = self.eval_member_key(property, scope)?;
                let key = self.to_property_key(&key)?;
                let base = self.super_base(scope)?;
                let this = self.this_value(scope)?;
                let function = match base {
                    Some(base) => self.get_from(&base, &key, &this)?,
                    None => JsValue::Undefined,
                };
                (function, this)
            }
            _ => (self.eval_expr(callee, scope)?, JsValue::Undefined),
        };
        if optional && function.is_nullish() {
            return Err(EvalError::ShortCircuit);
        }
        let args = self.eval_args(args, scope)?;
        if !function.is_callable() {
            let shown = callee_text(callee).unwrap_or_else(|| self.describe(&function));
            return Err(self.type_error(format!("{shown} is not a function")));
        }
        self.call(&function, this, args)
    }

    pub(crate) fn eval_args(&mut self, args: &[Argument], scope: &Scope) -> EvalResult<Vec<JsValue>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.eval_expr(&arg.expr, scope)?;
            if arg.spread {
                let spread: Vec<JsValue> = self.replay(|this| this.iterate(&value))?;
                values.extend(spread);
            } else {
                values.push(value);
            }
        }
        Ok(values)
    }
}

/// Whether a logical operator yields its left operand without evaluating
/// the right one.
fn keeps_left(op: LogicalOp, left: &JsValue) -> bool {
    match op {
        LogicalOp::And => !to_boolean(left),
        LogicalOp::Or => to_boolean(left),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

fn arithmetic(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Mod => a % b,
        BinOp::Exp => pow(a, b),
        _ => f64::NAN,
    }
}

fn bitwise(op: BinOp, a: f64, b: f64) -> f64 {
    let shift = to_uint32(b) & 31;
    match op {
        BinOp::Shl => f64::from(to_int32(a).wrapping_shl(shift)),
        BinOp::Shr => f64::from(to_int32(a) >> shift),
        BinOp::UShr => f64::from(to_uint32(a) >> shift),
        BinOp::BitAnd => f64::from(to_int32(a) & to_int32(b)),
        BinOp::BitOr => f64::from(to_int32(a) | to_int32(b)),
        BinOp::BitXor => f64::from(to_int32(a) ^ to_int32(b)),
        _ => f64::NAN,
    }
}

/// Source-like text for a callee in "is not a function" messages.
fn callee_text(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Identifier(name) => Some(name.clone()),
        ExprKind::This => Some("this".to_string()),
        ExprKind::Member {
            object,
            property: MemberProp::Static(name),
            ..
        } => Some(format!("{}.{name}", callee_text(object)?)),
        ExprKind::SuperMember(MemberProp::Static(name)) => Some(format!("(intermediate value).{name}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_follows_js_nan_rules() {
        assert!(arithmetic(BinOp::Exp, 1.0, f64::NAN).is_nan());
        assert!(arithmetic(BinOp::Exp, 1.0, f64::INFINITY).is_nan());
        assert_eq!(arithmetic(BinOp::Exp, 2.0, 10.0), 1024.0);
        assert_eq!(arithmetic(BinOp::Mod, -7.0, 3.0), -1.0);
    }

    #[test]
    fn shifts_mask_the_count() {
        assert_eq!(bitwise(BinOp::Shl, 1.0, 33.0), 2.0);
        assert_eq!(bitwise(BinOp::UShr, -1.0, 0.0), 4294967295.0);
        assert_eq!(bitwise(BinOp::Shr, -8.0, 1.0), -4.0);
    }
}
