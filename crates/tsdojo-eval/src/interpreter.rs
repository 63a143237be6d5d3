//! The interpreter instance: realm, step budget, job queue and timers.
//!
//! One [`Interpreter`] owns a fresh set of built-in objects and a module
//! scope. Nothing is shared between instances, so separate evaluations
//! cannot observe each other.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use tsdojo_types::ast::Program;

use crate::activation::{PendingAwait, Record};
use crate::builtins;
use crate::env::{Frame, Scope};
use crate::error::{EvalError, EvalResult};
use crate::value::{
    CallArgs, Function, JsValue, NativeFn, Obj, Object, ObjectKind, PromiseState, Property,
    PropertyValue, Reaction,
};

/// Resource limits for one interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Expressions and statements evaluated before [`EvalError::GasExhausted`].
    pub step_limit: u64,
    /// Nested calls before a `RangeError` is thrown.
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            step_limit: 5_000_000,
            max_call_depth: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
        }
    }
}

/// One captured `console.*` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub text: String,
}

/// Where a promise stands after the event loop went idle.
#[derive(Debug, Clone)]
pub enum Settled {
    Fulfilled(JsValue),
    Rejected(JsValue),
    Pending,
}

/// A queued microtask.
pub(crate) enum Job {
    Reaction {
        reaction: Reaction,
        outcome: Result<JsValue, JsValue>,
    },
    ResolveThenable {
        promise: Obj,
        thenable: JsValue,
        then: JsValue,
    },
    Callback(JsValue),
}

pub(crate) struct Timer {
    pub id: u64,
    pub callback: JsValue,
    pub args: Vec<JsValue>,
}

/// Built-in prototypes every object creation site needs.
pub(crate) struct Realm {
    pub object_prototype: Obj,
    pub function_prototype: Obj,
    pub array_prototype: Obj,
    pub string_prototype: Obj,
    pub number_prototype: Obj,
    pub boolean_prototype: Obj,
    pub promise_prototype: Obj,
    pub map_prototype: Obj,
    pub set_prototype: Obj,
    pub iterator_prototype: Obj,
    pub regexp_prototype: Obj,
    pub date_prototype: Obj,
    pub error_prototypes: HashMap<&'static str, Obj>,
    pub global_object: Obj,
    /// Every built-in object, cleared on drop to break prototype cycles.
    pub intrinsics: Vec<Obj>,
}

fn noop(_: &mut Interpreter, _: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Undefined)
}

impl Realm {
    fn new() -> Self {
        let object_prototype = Obj::new(Object::new(ObjectKind::Ordinary, None));
        let derive = |kind: ObjectKind| Obj::new(Object::new(kind, Some(object_prototype.clone())));
        let function_prototype = derive(ObjectKind::Function(Function::Native {
            func: noop,
            constructor: false,
        }));
        let array_prototype = derive(ObjectKind::Array(Vec::new()));
        let string_prototype = derive(ObjectKind::Ordinary);
        let number_prototype = derive(ObjectKind::Ordinary);
        let boolean_prototype = derive(ObjectKind::Ordinary);
        let promise_prototype = derive(ObjectKind::Ordinary);
        let map_prototype = derive(ObjectKind::Ordinary);
        let set_prototype = derive(ObjectKind::Ordinary);
        let iterator_prototype = derive(ObjectKind::Ordinary);
        let regexp_prototype = derive(ObjectKind::Ordinary);
        let date_prototype = derive(ObjectKind::Ordinary);
        let global_object = derive(ObjectKind::Ordinary);
        let intrinsics = vec![
            object_prototype.clone(),
            function_prototype.clone(),
            array_prototype.clone(),
            string_prototype.clone(),
            number_prototype.clone(),
            boolean_prototype.clone(),
            promise_prototype.clone(),
            map_prototype.clone(),
            set_prototype.clone(),
            iterator_prototype.clone(),
            regexp_prototype.clone(),
            date_prototype.clone(),
            global_object.clone(),
        ];
        Self {
            object_prototype,
            function_prototype,
            array_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            promise_prototype,
            map_prototype,
            set_prototype,
            iterator_prototype,
            regexp_prototype,
            date_prototype,
            error_prototypes: HashMap::new(),
            global_object,
            intrinsics,
        }
    }
}

/// A tree-walking interpreter for the executed TypeScript subset.
pub struct Interpreter {
    pub(crate) realm: Realm,
    /// Built-in globals; parent of the module scope.
    pub(crate) globals: Scope,
    /// Top-level declarations of the submission.
    pub(crate) module: Scope,
    limits: Limits,
    steps: u64,
    step_limit: u64,
    depth: usize,
    pub(crate) jobs: VecDeque<Job>,
    pub(crate) timers: BTreeMap<(u64, u64), Timer>,
    pub(crate) timer_seq: u64,
    /// Virtual clock in milliseconds.
    pub(crate) now: u64,
    /// Epoch milliseconds the virtual clock starts at, as seen by `Date`.
    pub(crate) clock_origin: f64,
    console: Vec<ConsoleLine>,
    pub(crate) rng_state: u64,
    /// Arrays being joined, so a self-containing array renders as empty.
    pub(crate) join_stack: Vec<usize>,
    /// Replay record of the async body currently running.
    pub(crate) record: Option<Record>,
    pub(crate) pending_await: Option<PendingAwait>,
}

impl Interpreter {
    pub fn new(limits: Limits) -> Self {
        let globals = Scope::new_root();
        let module = globals.function_child(Some(Frame::with_this(JsValue::Undefined)));
        let mut interp = Self {
            realm: Realm::new(),
            globals,
            module,
            limits,
            steps: 0,
            step_limit: limits.step_limit,
            depth: 0,
            jobs: VecDeque::new(),
            timers: BTreeMap::new(),
            timer_seq: 0,
            now: 0,
            clock_origin: chrono::Utc::now().timestamp_millis() as f64,
            console: Vec::new(),
            rng_state: 0x2545_f491_4f6c_dd1d,
            join_stack: Vec::new(),
            record: None,
            pending_await: None,
        };
        builtins::install(&mut interp);
        interp
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Start a fresh step budget.
    pub fn set_step_limit(&mut self, limit: u64) {
        self.steps = 0;
        self.step_limit = limit;
    }

    /// Pin the wall-clock time `Date` reports before any timer has fired.
    pub fn set_clock_origin(&mut self, epoch_ms: i64) {
        self.clock_origin = epoch_ms as f64;
    }

    /// `Date.now()`: the clock origin advanced by the virtual clock.
    pub(crate) fn current_time(&self) -> f64 {
        self.clock_origin + self.now as f64
    }

    pub fn steps_used(&self) -> u64 {
        self.steps
    }

    /// Consume one step. Fails once the budget is exhausted.
    pub(crate) fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > self.step_limit {
            tracing::debug!(steps = self.steps, "step budget exhausted");
            Err(EvalError::GasExhausted)
        } else {
            Ok(())
        }
    }

    pub(crate) fn enter_call(&mut self) -> EvalResult<()> {
        if self.depth >= self.limits.max_call_depth {
            return Err(self.range_error("Maximum call stack size exceeded"));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Public surface
    // ══════════════════════════════════════════════════════════════════════

    /// Execute the top-level statements, then drain jobs and timers.
    pub fn run_program(&mut self, program: &Program) -> EvalResult<()> {
        let module = self.module.clone();
        self.hoist_declarations(&program.body, &module);
        for stmt in &program.body {
            match self.exec_stmt(stmt, &module) {
                Ok(()) => {}
                Err(EvalError::Return(_) | EvalError::Break(_) | EvalError::Continue(_)) => {
                    break
                }
                Err(err) => return Err(err),
            }
        }
        self.run_until_idle()
    }

    /// A top-level binding of the submission.
    pub fn binding(&self, name: &str) -> Option<JsValue> {
        if self.module.has_own(name) {
            self.module.lookup(name)
        } else {
            None
        }
    }

    /// Call a function value from the host.
    pub fn call_value(
        &mut self,
        callee: &JsValue,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> EvalResult<JsValue> {
        self.call(callee, this, args)
    }

    /// Drain microtasks, then fire timers in (due, insertion) order until
    /// both queues are empty.
    pub fn run_until_idle(&mut self) -> EvalResult<()> {
        loop {
            while self.run_one_job()? {}
            if !self.run_next_timer()? {
                return Ok(());
            }
        }
    }

    /// Drop every queued job and timer. Async functions waiting on them
    /// stay pending forever.
    pub fn clear_pending_work(&mut self) {
        let (jobs, timers) = (self.jobs.len(), self.timers.len());
        if jobs + timers > 0 {
            tracing::debug!(jobs, timers, "discarding pending work");
        }
        self.jobs.clear();
        self.timers.clear();
        self.record = None;
        self.pending_await = None;
    }

    pub fn has_pending_work(&self) -> bool {
        !self.jobs.is_empty() || !self.timers.is_empty()
    }

    /// Run the event loop to idle and report how `value` settled. Values
    /// that are neither promises nor thenables count as fulfilled.
    pub fn settle(&mut self, value: JsValue) -> EvalResult<Settled> {
        let promise = match self.as_thenable(&value)? {
            Some(promise) => promise,
            None => {
                self.run_until_idle()?;
                return Ok(Settled::Fulfilled(value));
            }
        };
        self.run_until_idle()?;
        let state = match &promise.borrow().kind {
            ObjectKind::Promise(PromiseState::Fulfilled(v)) => Settled::Fulfilled(v.clone()),
            ObjectKind::Promise(PromiseState::Rejected(r)) => Settled::Rejected(r.clone()),
            _ => Settled::Pending,
        };
        Ok(state)
    }

    pub fn console(&self) -> &[ConsoleLine] {
        &self.console
    }

    pub fn take_console(&mut self) -> Vec<ConsoleLine> {
        std::mem::take(&mut self.console)
    }

    pub(crate) fn push_console(&mut self, level: ConsoleLevel, text: String) {
        self.console.push(ConsoleLine { level, text });
    }

    // ══════════════════════════════════════════════════════════════════════
    // Object construction helpers
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn new_object(&self) -> Obj {
        Obj::new(Object::new(
            ObjectKind::Ordinary,
            Some(self.realm.object_prototype.clone()),
        ))
    }

    pub(crate) fn new_array(&self, items: Vec<JsValue>) -> Obj {
        Obj::new(Object::new(
            ObjectKind::Array(items),
            Some(self.realm.array_prototype.clone()),
        ))
    }

    pub(crate) fn array_value(&self, items: Vec<JsValue>) -> JsValue {
        JsValue::Object(self.new_array(items))
    }

    pub(crate) fn new_error(&self, kind: &str, message: &str) -> Obj {
        let proto = self
            .realm
            .error_prototypes
            .get(kind)
            .or_else(|| self.realm.error_prototypes.get("Error"))
            .cloned();
        let error = Obj::new(Object::new(ObjectKind::Error, proto));
        error
            .borrow_mut()
            .props
            .insert(Rc::from("message"), Property::hidden(JsValue::str(message)));
        error
    }

    pub(crate) fn throw_error(&self, kind: &str, message: impl AsRef<str>) -> EvalError {
        EvalError::Throw(JsValue::Object(self.new_error(kind, message.as_ref())))
    }

    pub(crate) fn type_error(&self, message: impl AsRef<str>) -> EvalError {
        self.throw_error("TypeError", message)
    }

    pub(crate) fn range_error(&self, message: impl AsRef<str>) -> EvalError {
        self.throw_error("RangeError", message)
    }

    pub(crate) fn reference_error(&self, message: impl AsRef<str>) -> EvalError {
        self.throw_error("ReferenceError", message)
    }

    pub(crate) fn make_native(&self, name: &str, arity: usize, func: NativeFn) -> Obj {
        self.make_function(
            name,
            arity,
            Function::Native {
                func,
                constructor: false,
            },
        )
    }

    pub(crate) fn make_function(&self, name: &str, arity: usize, function: Function) -> Obj {
        let obj = Obj::new(Object::new(
            ObjectKind::Function(function),
            Some(self.realm.function_prototype.clone()),
        ));
        {
            let mut object = obj.borrow_mut();
            object
                .props
                .insert(Rc::from("name"), Property::hidden(JsValue::str(name)));
            object
                .props
                .insert(Rc::from("length"), Property::hidden(JsValue::from(arity)));
        }
        obj
    }

    /// A native constructor wired to `prototype` in both directions.
    pub(crate) fn make_constructor(
        &mut self,
        name: &str,
        arity: usize,
        func: NativeFn,
        prototype: &Obj,
    ) -> Obj {
        let ctor = self.make_function(
            name,
            arity,
            Function::Native {
                func,
                constructor: true,
            },
        );
        define_hidden(&ctor, "prototype", JsValue::Object(prototype.clone()));
        define_hidden(prototype, "constructor", JsValue::Object(ctor.clone()));
        self.realm.intrinsics.push(ctor.clone());
        ctor
    }

    pub(crate) fn define_method(&mut self, target: &Obj, name: &str, arity: usize, func: NativeFn) {
        let method = self.make_native(name, arity, func);
        self.realm.intrinsics.push(method.clone());
        define_hidden(target, name, JsValue::Object(method));
    }

    pub(crate) fn define_getter(&mut self, target: &Obj, name: &str, func: NativeFn) {
        let getter = self.make_native(&format!("get {name}"), 0, func);
        target.borrow_mut().props.insert(
            Rc::from(name),
            Property {
                value: PropertyValue::Accessor {
                    get: Some(getter),
                    set: None,
                },
                enumerable: false,
            },
        );
    }

    /// Bind a built-in in the global scope and on `globalThis`.
    pub(crate) fn define_global(&mut self, name: &str, value: JsValue) {
        self.globals.declare(name, value.clone(), true);
        define_hidden(&self.realm.global_object, name, value);
    }

    /// A fresh intrinsic object inheriting from `Object.prototype`.
    pub(crate) fn new_intrinsic(&mut self) -> Obj {
        let obj = self.new_object();
        self.realm.intrinsics.push(obj.clone());
        obj
    }
}

/// Define a non-enumerable data property.
pub(crate) fn define_hidden(target: &Obj, name: &str, value: JsValue) {
    target
        .borrow_mut()
        .props
        .insert(Rc::from(name), Property::hidden(value));
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.jobs.clear();
        self.timers.clear();
        self.module.clear();
        self.globals.clear();
        for obj in &self.realm.intrinsics {
            obj.borrow_mut().props.clear();
        }
    }
}
