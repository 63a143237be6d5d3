//! Function objects, calls, construction and classes.

use std::cell::RefCell;
use std::rc::Rc;

use tsdojo_types::ast::{
    ClassDef, ClassMemberKind, FunctionBody, FunctionDef, Param, Pattern, PropKey,
};

use crate::env::{Frame, Scope};
use crate::error::{EvalError, EvalResult};
use crate::exec::BindMode;
use crate::interpreter::{define_hidden, Interpreter};
use crate::value::{
    CallArgs, ClassData, Closure, ClosureKind, FieldInit, Function, JsStr, JsValue, Obj, Object,
    ObjectKind, Property, PropertyValue,
};

const UNINITIALIZED_THIS: &str = "Must call super constructor in derived class before accessing \
                                  'this' or returning from derived constructor";

/// Number of parameters before the first default or rest parameter.
fn formal_length(params: &[Param]) -> usize {
    params
        .iter()
        .take_while(|p| !p.rest && !matches!(p.pattern, Pattern::Assign { .. }))
        .count()
}

impl Interpreter {
    pub(crate) fn make_closure(
        &mut self,
        def: &Rc<FunctionDef>,
        scope: &Scope,
        kind: ClosureKind,
        home: Option<Obj>,
    ) -> Obj {
        let kind = if def.is_arrow { ClosureKind::Arrow } else { kind };
        let obj = self.make_function(
            def.name_str(),
            formal_length(&def.params),
            Function::Closure(Closure {
                def: def.clone(),
                scope: scope.clone(),
                home,
                kind,
            }),
        );
        if kind == ClosureKind::Normal && !def.is_async {
            let prototype = self.new_object();
            define_hidden(&prototype, "constructor", JsValue::Object(obj.clone()));
            define_hidden(&obj, "prototype", JsValue::Object(prototype));
        }
        obj
    }

    pub(crate) fn is_constructor(&self, obj: &Obj) -> bool {
        match obj.function() {
            Some(Function::Class(_)) => true,
            Some(Function::Native { constructor, .. }) => constructor,
            Some(Function::Closure(closure)) => {
                closure.kind == ClosureKind::Normal && !closure.def.is_async
            }
            Some(Function::Bound { target, .. }) => self.is_constructor(&target),
            _ => false,
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════

    /// Call `callee` with an explicit receiver.
    pub(crate) fn call(
        &mut self,
        callee: &JsValue,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> EvalResult<JsValue> {
        let function = callee.as_object().and_then(Obj::function);
        let Some(function) = function else {
            return Err(self.type_error(format!("{} is not a function", self.describe(callee))));
        };
        match function {
            Function::Closure(closure) => self.call_closure(&closure, this, args, None, None),
            Function::Class(data) => Err(self.type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                data.name
            ))),
            Function::Native { func, .. } => {
                self.enter_call()?;
                let result = func(
                    self,
                    &CallArgs {
                        this,
                        args,
                        new_target: None,
                    },
                );
                self.exit_call();
                result
            }
            Function::NativeClosure(func) => {
                self.enter_call()?;
                let result = (*func)(
                    self,
                    &CallArgs {
                        this,
                        args,
                        new_target: None,
                    },
                );
                self.exit_call();
                result
            }
            Function::Bound {
                target,
                this: bound_this,
                args: mut bound_args,
            } => {
                bound_args.extend(args);
                self.call(&JsValue::Object(target), bound_this, bound_args)
            }
        }
    }

    fn call_closure(
        &mut self,
        closure: &Closure,
        this: JsValue,
        args: Vec<JsValue>,
        new_target: Option<Obj>,
        class: Option<Rc<ClassData>>,
    ) -> EvalResult<JsValue> {
        self.enter_call()?;
        let scope = if closure.kind == ClosureKind::Arrow {
            closure.scope.function_child(None)
        } else {
            closure.scope.function_child(Some(Frame {
                this: RefCell::new(Some(this)),
                home: closure.home.clone(),
                new_target,
                class,
                args: args.clone(),
            }))
        };
        let def = closure.def.clone();
        // The callee's steps are not part of the caller's replay record.
        let outer = self.record.take();
        let result = if def.is_async {
            self.start_async(&def, args, scope)
        } else {
            self.bind_params(&def.params, args, &scope)
                .and_then(|()| self.run_body(&def, &scope))
        };
        self.record = outer;
        self.exit_call();
        result
    }

    pub(crate) fn bind_params(&mut self, params: &[Param], args: Vec<JsValue>, scope: &Scope) -> EvalResult<()> {
        let mut args = args.into_iter();
        for param in params {
            let value = if param.rest {
                let rest: Vec<JsValue> = args.by_ref().collect();
                self.array_value(rest)
            } else {
                args.next().unwrap_or(JsValue::Undefined)
            };
            self.bind_pattern(&param.pattern, value, scope, BindMode::Let)?;
        }
        Ok(())
    }

    fn run_body(&mut self, def: &FunctionDef, scope: &Scope) -> EvalResult<JsValue> {
        if let FunctionBody::Block(stmts) = &def.body {
            self.hoist_declarations(stmts, scope);
        }
        self.run_statements(def, scope)
    }

    /// Run an already hoisted body and produce its return value.
    pub(crate) fn run_statements(&mut self, def: &FunctionDef, scope: &Scope) -> EvalResult<JsValue> {
        match &def.body {
            FunctionBody::Expr(expr) => self.eval_expr(expr, scope),
            FunctionBody::Block(stmts) => {
                for stmt in stmts {
                    match self.exec_stmt(stmt, scope) {
                        Ok(()) => {}
                        Err(EvalError::Return(value)) => return Ok(value),
                        Err(err) => return Err(err),
                    }
                }
                Ok(JsValue::Undefined)
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Construction
    // ══════════════════════════════════════════════════════════════════════

    /// `new callee(...args)`.
    pub(crate) fn construct(
        &mut self,
        callee: &JsValue,
        args: Vec<JsValue>,
        new_target: Option<&Obj>,
    ) -> EvalResult<JsValue> {
        let Some(obj) = callee.as_object().filter(|o| self.is_constructor(o)).cloned() else {
            return Err(self.type_error(format!("{} is not a constructor", self.describe(callee))));
        };
        let new_target = new_target.cloned().unwrap_or_else(|| obj.clone());
        match obj.function() {
            Some(Function::Class(data)) => self.construct_class(&data, args, &new_target),
            Some(Function::Native { func, .. }) => func(
                self,
                &CallArgs {
                    this: JsValue::Undefined,
                    args,
                    new_target: Some(new_target),
                },
            ),
            Some(Function::Closure(closure)) => {
                let proto = self.prototype_for(&new_target, None)?;
                let this = Obj::new(Object::new(ObjectKind::Ordinary, Some(proto)));
                let result = self.call_closure(
                    &closure,
                    JsValue::Object(this.clone()),
                    args,
                    Some(new_target),
                    None,
                )?;
                Ok(match result {
                    JsValue::Object(_) => result,
                    _ => JsValue::Object(this),
                })
            }
            Some(Function::Bound {
                target,
                args: mut bound_args,
                ..
            }) => {
                bound_args.extend(args);
                let new_target = if new_target.ptr_eq(&obj) {
                    target.clone()
                } else {
                    new_target
                };
                self.construct(&JsValue::Object(target), bound_args, Some(&new_target))
            }
            _ => Err(self.type_error(format!("{} is not a constructor", self.describe(callee)))),
        }
    }

    /// The `prototype` of `new_target`, or `fallback` (default
    /// `Object.prototype`) when it is not an object.
    pub(crate) fn prototype_for(&mut self, new_target: &Obj, fallback: Option<&Obj>) -> EvalResult<Obj> {
        let proto = self.get_from(new_target, "prototype", &JsValue::Object(new_target.clone()))?;
        Ok(match proto {
            JsValue::Object(proto) => proto,
            _ => fallback
                .cloned()
                .unwrap_or_else(|| self.realm.object_prototype.clone()),
        })
    }

    fn construct_class(
        &mut self,
        data: &Rc<ClassData>,
        args: Vec<JsValue>,
        new_target: &Obj,
    ) -> EvalResult<JsValue> {
        self.enter_call()?;
        let outer = self.record.take();
        let result = self.construct_class_inner(data, args, new_target);
        self.record = outer;
        self.exit_call();
        result
    }

    fn construct_class_inner(
        &mut self,
        data: &Rc<ClassData>,
        args: Vec<JsValue>,
        new_target: &Obj,
    ) -> EvalResult<JsValue> {
        let instance = if data.is_derived() {
            None
        } else {
            let proto = self.prototype_for(new_target, None)?;
            Some(Obj::new(Object::new(ObjectKind::Ordinary, Some(proto))))
        };
        let frame = Frame {
            this: RefCell::new(instance.clone().map(JsValue::Object)),
            home: Some(data.prototype.clone()),
            new_target: Some(new_target.clone()),
            class: Some(data.clone()),
            args: args.clone(),
        };
        let scope = data.scope.function_child(Some(frame));

        let returned = match &data.constructor {
            Some(def) => {
                self.bind_params(&def.params, args, &scope)?;
                if let Some(instance) = &instance {
                    self.initialize_instance(instance, data, &scope)?;
                }
                self.run_body(def, &scope)?
            }
            None => {
                if let Some(instance) = &instance {
                    self.initialize_instance(instance, data, &scope)?;
                } else {
                    self.super_call(args, &scope)?;
                }
                JsValue::Undefined
            }
        };
        if let JsValue::Object(_) = returned {
            return Ok(returned);
        }
        let this = scope.frame().and_then(|(frame, _)| {
            let this = frame.this.borrow().clone();
            this
        });
        match this {
            Some(this) => Ok(this),
            None => Err(self.reference_error(UNINITIALIZED_THIS)),
        }
    }

    /// `super(...args)` inside a derived constructor.
    pub(crate) fn super_call(&mut self, args: Vec<JsValue>, scope: &Scope) -> EvalResult<JsValue> {
        let Some((frame, frame_scope)) = scope.frame() else {
            return Err(self.throw_error("SyntaxError", "'super' keyword unexpected here"));
        };
        let Some(data) = frame.class.clone() else {
            return Err(self.throw_error("SyntaxError", "'super' keyword unexpected here"));
        };
        let Some(parent) = data.parent.clone() else {
            return Err(self.throw_error("SyntaxError", "'super' keyword unexpected here"));
        };
        let new_target = frame.new_target.clone().unwrap_or_else(|| parent.clone());
        let result = self.construct(&JsValue::Object(parent), args, Some(&new_target))?;
        let JsValue::Object(instance) = &result else {
            return Err(self.type_error("Derived constructors may only return object or undefined"));
        };
        if frame.this.borrow().is_some() {
            return Err(self.reference_error("Super constructor may only be called once"));
        }
        *frame.this.borrow_mut() = Some(result.clone());
        self.initialize_instance(instance, &data, &frame_scope)?;
        Ok(JsValue::Undefined)
    }

    /// Parameter properties, then field initialisers, in declaration order.
    fn initialize_instance(
        &mut self,
        instance: &Obj,
        data: &ClassData,
        ctor_scope: &Scope,
    ) -> EvalResult<()> {
        let this = JsValue::Object(instance.clone());
        if let Some(def) = &data.constructor {
            for param in def.params.iter().filter(|p| p.property) {
                for name in param.pattern.bound_names() {
                    let value = ctor_scope.lookup(name).unwrap_or(JsValue::Undefined);
                    self.set(&this, name, value)?;
                }
            }
        }
        if data.fields.is_empty() {
            return Ok(());
        }
        let field_scope = data.scope.function_child(Some(Frame {
            home: Some(data.prototype.clone()),
            ..Frame::with_this(this)
        }));
        for field in &data.fields {
            let value = match &field.init {
                Some(init) => self.eval_named(init, Some(&*field.key), &field_scope)?,
                None => JsValue::Undefined,
            };
            self.define_own(instance, &field.key, value);
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Classes
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn resolve_prop_key(&mut self, key: &PropKey, scope: &Scope) -> EvalResult<JsStr> {
        match key {
            PropKey::Static(name) => Ok(Rc::from(name.as_str())),
            PropKey::Computed(expr) => {
                let value = self.eval_expr(expr, scope)?;
                self.to_property_key(&value)
            }
        }
    }

    pub(crate) fn eval_class(&mut self, def: &Rc<ClassDef>, scope: &Scope) -> EvalResult<Obj> {
        let name = def.name.as_ref().map(|n| n.name.as_str()).unwrap_or("");
        let class_scope = scope.child();

        let (parent, proto_parent) = match &def.super_class {
            None => (None, Some(self.realm.object_prototype.clone())),
            Some(expr) => match self.eval_expr(expr, &class_scope)? {
                JsValue::Null => (None, None),
                JsValue::Object(parent) if self.is_constructor(&parent) => {
                    let proto = self.get_from(&parent, "prototype", &JsValue::Object(parent.clone()))?;
                    match proto {
                        JsValue::Object(proto) => (Some(parent), Some(proto)),
                        JsValue::Null => (Some(parent), None),
                        _ => {
                            return Err(self.type_error(
                                "Class extends value does not have valid prototype property",
                            ))
                        }
                    }
                }
                other => {
                    return Err(self.type_error(format!(
                        "Class extends value {} is not a constructor or null",
                        self.describe(&other)
                    )))
                }
            },
        };
        let prototype = Obj::new(Object::new(ObjectKind::Ordinary, proto_parent));

        let mut keys = Vec::with_capacity(def.members.len());
        for member in &def.members {
            keys.push(self.resolve_prop_key(&member.key, &class_scope)?);
        }
        let fields = def
            .members
            .iter()
            .zip(&keys)
            .filter(|(m, _)| !m.is_static)
            .filter_map(|(m, key)| match &m.kind {
                ClassMemberKind::Field(init) => Some(FieldInit {
                    key: key.clone(),
                    init: init.clone(),
                }),
                _ => None,
            })
            .collect();

        let arity = def
            .constructor
            .as_ref()
            .map(|c| formal_length(&c.params))
            .unwrap_or(0);
        let data = ClassData {
            name: Rc::from(name),
            constructor: def.constructor.clone(),
            scope: class_scope.clone(),
            prototype: prototype.clone(),
            parent: parent.clone(),
            fields,
        };
        let ctor = self.make_function(name, arity, Function::Class(Rc::new(data)));
        if let Some(parent) = &parent {
            ctor.borrow_mut().proto = Some(parent.clone());
        }
        define_hidden(&ctor, "prototype", JsValue::Object(prototype.clone()));
        define_hidden(&prototype, "constructor", JsValue::Object(ctor.clone()));
        if !name.is_empty() {
            class_scope.declare(name, JsValue::Object(ctor.clone()), false);
        }

        for (member, key) in def.members.iter().zip(&keys) {
            let target = if member.is_static { &ctor } else { &prototype };
            match &member.kind {
                ClassMemberKind::Method(method) => {
                    let f = self.make_closure(method, &class_scope, ClosureKind::Method, Some(target.clone()));
                    define_hidden(&f, "name", JsValue::String(key.clone()));
                    define_hidden(target, key, JsValue::Object(f));
                }
                ClassMemberKind::Getter(getter) => {
                    let f = self.make_closure(getter, &class_scope, ClosureKind::Method, Some(target.clone()));
                    define_accessor(target, key, Some(f), None, false);
                }
                ClassMemberKind::Setter(setter) => {
                    let f = self.make_closure(setter, &class_scope, ClosureKind::Method, Some(target.clone()));
                    define_accessor(target, key, None, Some(f), false);
                }
                ClassMemberKind::Field(_) => {}
            }
        }

        let statics: Vec<(&JsStr, &Option<tsdojo_types::ast::Expr>)> = def
            .members
            .iter()
            .zip(&keys)
            .filter(|(m, _)| m.is_static)
            .filter_map(|(m, key)| match &m.kind {
                ClassMemberKind::Field(init) => Some((key, init)),
                _ => None,
            })
            .collect();
        if !statics.is_empty() {
            let static_scope = class_scope.function_child(Some(Frame {
                home: Some(ctor.clone()),
                ..Frame::with_this(JsValue::Object(ctor.clone()))
            }));
            for (key, init) in statics {
                let value = match init {
                    Some(init) => self.eval_named(init, Some(&**key), &static_scope)?,
                    None => JsValue::Undefined,
                };
                self.define_own(&ctor, key, value);
            }
        }
        Ok(ctor)
    }

    /// The current `this`.
    pub(crate) fn this_value(&self, scope: &Scope) -> EvalResult<JsValue> {
        match scope.frame() {
            Some((frame, _)) => match frame.this.borrow().clone() {
                Some(this) => Ok(this),
                None => Err(self.reference_error(UNINITIALIZED_THIS)),
            },
            None => Ok(JsValue::Undefined),
        }
    }

    /// The object `super.x` starts its lookup from.
    pub(crate) fn super_base(&self, scope: &Scope) -> EvalResult<Option<Obj>> {
        let home = scope.frame().and_then(|(frame, _)| frame.home.clone());
        match home {
            Some(home) => Ok(home.proto()),
            None => Err(self.throw_error("SyntaxError", "'super' keyword unexpected here")),
        }
    }
}

/// Merge a getter or setter into an accessor property.
pub(crate) fn define_accessor(
    target: &Obj,
    key: &str,
    get: Option<Obj>,
    set: Option<Obj>,
    enumerable: bool,
) {
    let mut object = target.borrow_mut();
    let (old_get, old_set) = match object.props.get(key) {
        Some(Property {
            value: PropertyValue::Accessor { get, set },
            ..
        }) => (get.clone(), set.clone()),
        _ => (None, None),
    };
    object.props.insert(
        Rc::from(key),
        Property {
            value: PropertyValue::Accessor {
                get: get.or(old_get),
                set: set.or(old_set),
            },
            enumerable,
        },
    );
}
