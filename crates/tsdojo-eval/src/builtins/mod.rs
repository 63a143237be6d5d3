//! The built-in library: global functions, constructors and prototypes.
//!
//! Each module installs one family of built-ins into a fresh interpreter.
//! Errors come first so that every later module can throw.

mod array;
mod collections;
mod date;
mod error;
mod function;
mod global;
mod json;
mod math;
mod number;
mod object;
mod promise;
mod regexp;
mod string;

use std::rc::Rc;

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::value::{CallArgs, Function, IteratorState, JsValue, Obj, Object, ObjectKind};

pub(crate) use math::pow;

pub(crate) fn install(interp: &mut Interpreter) {
    error::install(interp);
    object::install(interp);
    function::install(interp);
    array::install(interp);
    regexp::install(interp);
    string::install(interp);
    number::install(interp);
    math::install(interp);
    json::install(interp);
    promise::install(interp);
    collections::install(interp);
    date::install(interp);
    global::install(interp);
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Argument `index`, which must be callable.
fn callback(interp: &Interpreter, call: &CallArgs, index: usize) -> EvalResult<JsValue> {
    let f = call.arg(index);
    if f.is_callable() {
        Ok(f)
    } else {
        Err(interp.type_error(format!("{} is not a function", interp.describe(&f))))
    }
}

/// A function object backed by a Rust closure.
fn closure(
    interp: &Interpreter,
    name: &str,
    arity: usize,
    f: impl Fn(&mut Interpreter, &CallArgs) -> EvalResult<JsValue> + 'static,
) -> JsValue {
    JsValue::Object(interp.make_function(name, arity, Function::NativeClosure(Rc::new(f))))
}

/// A one-shot iterator over a snapshot of `items`.
fn make_iterator(interp: &Interpreter, items: Vec<JsValue>) -> JsValue {
    JsValue::Object(Obj::new(Object::new(
        ObjectKind::Iterator(IteratorState { items, pos: 0 }),
        Some(interp.realm.iterator_prototype.clone()),
    )))
}

/// `{ value, done }`
fn iter_result(interp: &Interpreter, value: JsValue, done: bool) -> JsValue {
    let result = interp.new_object();
    interp.define_own(&result, "value", value);
    interp.define_own(&result, "done", JsValue::Bool(done));
    JsValue::Object(result)
}

/// The receiver of a constructor call, or a `TypeError` when the built-in
/// requires `new`.
fn require_new(interp: &Interpreter, call: &CallArgs, name: &str) -> EvalResult<Obj> {
    match &call.new_target {
        Some(target) => Ok(target.clone()),
        None => Err(interp.type_error(format!("Constructor {name} requires 'new'"))),
    }
}
