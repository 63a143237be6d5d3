//! `Promise`: constructor, combinators and `then` / `catch` / `finally`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::closure;
use crate::error::{EvalError, EvalResult};
use crate::interpreter::{define_hidden, Interpreter};
use crate::value::{CallArgs, JsValue, Obj, ObjectKind};

pub(super) fn install(interp: &mut Interpreter) {
    let proto = interp.realm.promise_prototype.clone();
    let ctor = interp.make_constructor("Promise", 1, promise, &proto);
    interp.define_method(&ctor, "resolve", 1, resolve);
    interp.define_method(&ctor, "reject", 1, reject);
    interp.define_method(&ctor, "all", 1, all);
    interp.define_method(&ctor, "allSettled", 1, all_settled);
    interp.define_method(&ctor, "race", 1, race);
    interp.define_method(&ctor, "any", 1, any);

    interp.define_method(&proto, "then", 2, then);
    interp.define_method(&proto, "catch", 1, catch);
    interp.define_method(&proto, "finally", 1, finally);
    interp.define_global("Promise", JsValue::Object(ctor));
}

fn promise(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let Some(new_target) = &call.new_target else {
        return Err(interp.type_error("Promise constructor cannot be invoked without 'new'"));
    };
    let executor = call.arg(0);
    if !executor.is_callable() {
        return Err(interp.type_error(format!(
            "Promise resolver {} is not a function",
            interp.inspect(&executor)
        )));
    }
    let fallback = interp.realm.promise_prototype.clone();
    let proto = interp.prototype_for(new_target, Some(&fallback))?;
    let promise = interp.new_promise_with_proto(proto);
    let (resolve, reject) = interp.resolving_functions(&promise);
    match interp.call(&executor, JsValue::Undefined, vec![resolve, reject.clone()]) {
        Ok(_) => {}
        Err(EvalError::Throw(reason)) => {
            interp.call(&reject, JsValue::Undefined, vec![reason])?;
        }
        Err(err) => return Err(err),
    }
    Ok(JsValue::Object(promise))
}

fn this_promise(interp: &Interpreter, call: &CallArgs, method: &str) -> EvalResult<Obj> {
    match &call.this {
        JsValue::Object(obj) if matches!(obj.borrow().kind, ObjectKind::Promise(_)) => {
            Ok(obj.clone())
        }
        other => Err(interp.type_error(format!(
            "Method Promise.prototype.{method} called on incompatible receiver {}",
            interp.inspect(other)
        ))),
    }
}

// ── Statics ───────────────────────────────────────────────────────────────────

fn resolve(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    interp.promise_resolve(call.arg(0)).map(JsValue::Object)
}

fn reject(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let promise = interp.new_promise();
    interp.reject_promise(&promise, call.arg(0));
    Ok(JsValue::Object(promise))
}

/// The promises a combinator waits on, plus the promise it returns and that
/// promise's resolving functions.
struct Combinator {
    inputs: Vec<Obj>,
    result: Obj,
    resolve: JsValue,
    reject: JsValue,
}

fn combinator(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<Combinator> {
    let mut inputs = Vec::new();
    for item in interp.iterate(&call.arg(0))? {
        inputs.push(interp.promise_resolve(item)?);
    }
    let result = interp.new_promise();
    let (resolve, reject) = interp.resolving_functions(&result);
    Ok(Combinator {
        inputs,
        result,
        resolve,
        reject,
    })
}

/// Shared state of `all`/`allSettled`/`any`: one slot per input and a
/// count of inputs still outstanding.
struct Slots {
    values: RefCell<Vec<JsValue>>,
    remaining: Cell<usize>,
}

impl Slots {
    fn new(len: usize) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(vec![JsValue::Undefined; len]),
            remaining: Cell::new(len),
        })
    }

    /// Store `value` at `index`; true once every slot is filled.
    fn fill(&self, index: usize, value: JsValue) -> bool {
        if let Some(slot) = self.values.borrow_mut().get_mut(index) {
            *slot = value;
        }
        let left = self.remaining.get().saturating_sub(1);
        self.remaining.set(left);
        left == 0
    }

    fn take(&self) -> Vec<JsValue> {
        std::mem::take(&mut *self.values.borrow_mut())
    }
}

fn all(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let c = combinator(interp, call)?;
    if c.inputs.is_empty() {
        let empty = interp.array_value(Vec::new());
        interp.call(&c.resolve, JsValue::Undefined, vec![empty])?;
        return Ok(JsValue::Object(c.result));
    }
    let slots = Slots::new(c.inputs.len());
    for (index, input) in c.inputs.iter().enumerate() {
        let slots = slots.clone();
        let resolve = c.resolve.clone();
        let on_fulfilled = closure(interp, "", 1, move |interp, call| {
            if slots.fill(index, call.arg(0)) {
                let values = interp.array_value(slots.take());
                interp.call(&resolve, JsValue::Undefined, vec![values])?;
            }
            Ok(JsValue::Undefined)
        });
        interp.promise_then(input, on_fulfilled, c.reject.clone());
    }
    Ok(JsValue::Object(c.result))
}

fn all_settled(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let c = combinator(interp, call)?;
    if c.inputs.is_empty() {
        let empty = interp.array_value(Vec::new());
        interp.call(&c.resolve, JsValue::Undefined, vec![empty])?;
        return Ok(JsValue::Object(c.result));
    }
    let slots = Slots::new(c.inputs.len());
    for (index, input) in c.inputs.iter().enumerate() {
        let settle = |index: usize, status: &'static str, field: &'static str| {
            let slots = slots.clone();
            let resolve = c.resolve.clone();
            move |interp: &mut Interpreter, call: &CallArgs| -> EvalResult<JsValue> {
                let entry = interp.new_object();
                interp.define_own(&entry, "status", JsValue::str(status));
                interp.define_own(&entry, field, call.arg(0));
                if slots.fill(index, JsValue::Object(entry)) {
                    let values = interp.array_value(slots.take());
                    interp.call(&resolve, JsValue::Undefined, vec![values])?;
                }
                Ok(JsValue::Undefined)
            }
        };
        let on_fulfilled = closure(interp, "", 1, settle(index, "fulfilled", "value"));
        let on_rejected = closure(interp, "", 1, settle(index, "rejected", "reason"));
        interp.promise_then(input, on_fulfilled, on_rejected);
    }
    Ok(JsValue::Object(c.result))
}

fn race(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let c = combinator(interp, call)?;
    for input in &c.inputs {
        interp.promise_then(input, c.resolve.clone(), c.reject.clone());
    }
    Ok(JsValue::Object(c.result))
}

fn any(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let c = combinator(interp, call)?;
    if c.inputs.is_empty() {
        let error = aggregate_error(interp, Vec::new());
        interp.call(&c.reject, JsValue::Undefined, vec![error])?;
        return Ok(JsValue::Object(c.result));
    }
    let slots = Slots::new(c.inputs.len());
    for (index, input) in c.inputs.iter().enumerate() {
        let slots = slots.clone();
        let reject = c.reject.clone();
        let on_rejected = closure(interp, "", 1, move |interp, call| {
            if slots.fill(index, call.arg(0)) {
                let error = aggregate_error(interp, slots.take());
                interp.call(&reject, JsValue::Undefined, vec![error])?;
            }
            Ok(JsValue::Undefined)
        });
        interp.promise_then(input, c.resolve.clone(), on_rejected);
    }
    Ok(JsValue::Object(c.result))
}

fn aggregate_error(interp: &Interpreter, errors: Vec<JsValue>) -> JsValue {
    let error = interp.new_error("AggregateError", "All promises were rejected");
    define_hidden(&error, "errors", interp.array_value(errors));
    JsValue::Object(error)
}

// ── Prototype ─────────────────────────────────────────────────────────────────

fn then(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let promise = this_promise(interp, call, "then")?;
    Ok(JsValue::Object(interp.promise_then(&promise, call.arg(0), call.arg(1))))
}

fn catch(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let promise = this_promise(interp, call, "catch")?;
    Ok(JsValue::Object(interp.promise_then(
        &promise,
        JsValue::Undefined,
        call.arg(0),
    )))
}

/// `finally(f)`: `f` runs with no arguments; the original outcome passes
/// through unless `f` throws or returns a rejected promise.
fn finally(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let promise = this_promise(interp, call, "finally")?;
    let on_finally = call.arg(0);
    if !on_finally.is_callable() {
        return Ok(JsValue::Object(interp.promise_then(
            &promise,
            on_finally.clone(),
            on_finally,
        )));
    }

    let handler = |rethrow: bool| {
        let on_finally = on_finally.clone();
        move |interp: &mut Interpreter, call: &CallArgs| -> EvalResult<JsValue> {
            let result = interp.call(&on_finally, JsValue::Undefined, Vec::new())?;
            let waited = interp.promise_resolve(result)?;
            let outcome = call.arg(0);
            let rethrow = rethrow;
            let pass_through = closure(interp, "", 0, move |_, _| {
                if rethrow {
                    Err(EvalError::Throw(outcome.clone()))
                } else {
                    Ok(outcome.clone())
                }
            });
            Ok(JsValue::Object(interp.promise_then(
                &waited,
                pass_through,
                JsValue::Undefined,
            )))
        }
    };
    let then_finally = closure(interp, "", 1, handler(false));
    let catch_finally = closure(interp, "", 1, handler(true));
    Ok(JsValue::Object(interp.promise_then(
        &promise,
        then_finally,
        catch_finally,
    )))
}
