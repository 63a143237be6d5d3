//! Promises, the microtask queue and virtual timers.
//!
//! Reactions run from a FIFO job queue. Timers fire in due order on a
//! virtual clock once the job queue is empty. Only the host drains the
//! queues; async bodies suspend at `await` (see `activation`).

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{EvalError, EvalResult};
use crate::interpreter::{Interpreter, Job, Timer};
use crate::value::{
    CallArgs, Function, JsValue, Obj, Object, ObjectKind, PromiseState, Reaction,
};

impl Interpreter {
    pub(crate) fn new_promise(&self) -> Obj {
        self.new_promise_with_proto(self.realm.promise_prototype.clone())
    }

    pub(crate) fn new_promise_with_proto(&self, proto: Obj) -> Obj {
        Obj::new(Object::new(
            ObjectKind::Promise(PromiseState::Pending(Vec::new())),
            Some(proto),
        ))
    }

    pub(crate) fn promise_state(&self, promise: &Obj) -> Option<Result<JsValue, JsValue>> {
        match &promise.borrow().kind {
            ObjectKind::Promise(PromiseState::Fulfilled(value)) => Some(Ok(value.clone())),
            ObjectKind::Promise(PromiseState::Rejected(reason)) => Some(Err(reason.clone())),
            _ => None,
        }
    }

    /// Resolve `promise` with `value`, adopting the state of thenables.
    pub(crate) fn resolve_promise(&mut self, promise: &Obj, value: JsValue) -> EvalResult<()> {
        if let JsValue::Object(obj) = &value {
            if obj.ptr_eq(promise) {
                let error = self.new_error("TypeError", "Chaining cycle detected for promise #<Promise>");
                self.reject_promise(promise, JsValue::Object(error));
                return Ok(());
            }
            let then = match self.get(&value, "then") {
                Ok(then) => then,
                Err(EvalError::Throw(reason)) => {
                    self.reject_promise(promise, reason);
                    return Ok(());
                }
                Err(err) => return Err(err),
            };
            if then.is_callable() {
                self.jobs.push_back(Job::ResolveThenable {
                    promise: promise.clone(),
                    thenable: value,
                    then,
                });
                return Ok(());
            }
        }
        self.settle_promise(promise, Ok(value));
        Ok(())
    }

    pub(crate) fn reject_promise(&mut self, promise: &Obj, reason: JsValue) {
        self.settle_promise(promise, Err(reason));
    }

    fn settle_promise(&mut self, promise: &Obj, outcome: Result<JsValue, JsValue>) {
        let reactions = {
            let mut object = promise.borrow_mut();
            let ObjectKind::Promise(state) = &mut object.kind else {
                return;
            };
            let PromiseState::Pending(reactions) = state else {
                return;
            };
            let reactions = std::mem::take(reactions);
            *state = match &outcome {
                Ok(value) => PromiseState::Fulfilled(value.clone()),
                Err(reason) => PromiseState::Rejected(reason.clone()),
            };
            reactions
        };
        for reaction in reactions {
            self.jobs.push_back(Job::Reaction {
                reaction,
                outcome: outcome.clone(),
            });
        }
    }

    /// `promise.then(on_fulfilled, on_rejected)`; returns the derived promise.
    pub(crate) fn promise_then(
        &mut self,
        promise: &Obj,
        on_fulfilled: JsValue,
        on_rejected: JsValue,
    ) -> Obj {
        let derived = self.new_promise();
        let reaction = Reaction {
            derived: derived.clone(),
            on_fulfilled: on_fulfilled.is_callable().then_some(on_fulfilled),
            on_rejected: on_rejected.is_callable().then_some(on_rejected),
        };
        let settled = match &mut promise.borrow_mut().kind {
            ObjectKind::Promise(PromiseState::Pending(reactions)) => {
                reactions.push(reaction.clone());
                None
            }
            ObjectKind::Promise(PromiseState::Fulfilled(value)) => Some(Ok(value.clone())),
            ObjectKind::Promise(PromiseState::Rejected(reason)) => Some(Err(reason.clone())),
            _ => None,
        };
        if let Some(outcome) = settled {
            self.jobs.push_back(Job::Reaction { reaction, outcome });
        }
        derived
    }

    /// `Promise.resolve(value)`.
    pub(crate) fn promise_resolve(&mut self, value: JsValue) -> EvalResult<Obj> {
        if let JsValue::Object(obj) = &value {
            if matches!(obj.borrow().kind, ObjectKind::Promise(_)) {
                return Ok(obj.clone());
            }
        }
        let promise = self.new_promise();
        self.resolve_promise(&promise, value)?;
        Ok(promise)
    }

    /// The promise standing for `value` if it is a promise or a thenable.
    pub(crate) fn as_thenable(&mut self, value: &JsValue) -> EvalResult<Option<Obj>> {
        let JsValue::Object(obj) = value else {
            return Ok(None);
        };
        if matches!(obj.borrow().kind, ObjectKind::Promise(_)) {
            return Ok(Some(obj.clone()));
        }
        let then = self.get(value, "then")?;
        if !then.is_callable() {
            return Ok(None);
        }
        let promise = self.new_promise();
        self.jobs.push_back(Job::ResolveThenable {
            promise: promise.clone(),
            thenable: value.clone(),
            then,
        });
        Ok(Some(promise))
    }

    /// The `resolve` / `reject` pair handed to executors and thenables.
    /// Only the first call of either has an effect.
    pub(crate) fn resolving_functions(&mut self, promise: &Obj) -> (JsValue, JsValue) {
        let already_resolved = Rc::new(Cell::new(false));
        let resolve = {
            let promise = promise.clone();
            let done = already_resolved.clone();
            self.make_function(
                "",
                1,
                Function::NativeClosure(Rc::new(move |interp: &mut Interpreter, call: &CallArgs| -> EvalResult<JsValue> {
                    if !done.replace(true) {
                        interp.resolve_promise(&promise, call.arg(0))?;
                    }
                    Ok(JsValue::Undefined)
                })),
            )
        };
        let reject = {
            let promise = promise.clone();
            let done = already_resolved;
            self.make_function(
                "",
                1,
                Function::NativeClosure(Rc::new(move |interp: &mut Interpreter, call: &CallArgs| -> EvalResult<JsValue> {
                    if !done.replace(true) {
                        interp.reject_promise(&promise, call.arg(0));
                    }
                    Ok(JsValue::Undefined)
                })),
            )
        };
        (JsValue::Object(resolve), JsValue::Object(reject))
    }

    /// `await` outside any async body: run queued jobs, then timers, until
    /// `value` settles.
    pub(crate) fn await_blocking(&mut self, value: JsValue) -> EvalResult<JsValue> {
        let Some(promise) = self.as_thenable(&value)? else {
            return Ok(value);
        };
        loop {
            match self.promise_state(&promise) {
                Some(Ok(value)) => return Ok(value),
                Some(Err(reason)) => return Err(EvalError::Throw(reason)),
                None => {}
            }
            if !self.run_one_job()? && !self.run_next_timer()? {
                return Err(EvalError::Suspended);
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Event loop
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn run_one_job(&mut self) -> EvalResult<bool> {
        let Some(job) = self.jobs.pop_front() else {
            return Ok(false);
        };
        match job {
            Job::Reaction { reaction, outcome } => {
                let (handler, argument, fulfilled) = match outcome {
                    Ok(value) => (reaction.on_fulfilled, value, true),
                    Err(reason) => (reaction.on_rejected, reason, false),
                };
                match handler {
                    None if fulfilled => self.resolve_promise(&reaction.derived, argument)?,
                    None => self.reject_promise(&reaction.derived, argument),
                    Some(handler) => {
                        match self.call(&handler, JsValue::Undefined, vec![argument]) {
                            Ok(value) => self.resolve_promise(&reaction.derived, value)?,
                            Err(EvalError::Throw(reason)) => {
                                self.reject_promise(&reaction.derived, reason)
                            }
                            Err(err) => return Err(err),
                        }
                    }
                }
            }
            Job::ResolveThenable {
                promise,
                thenable,
                then,
            } => {
                let (resolve, reject) = self.resolving_functions(&promise);
                match self.call(&then, thenable, vec![resolve, reject.clone()]) {
                    Ok(_) => {}
                    Err(EvalError::Throw(reason)) => {
                        self.call(&reject, JsValue::Undefined, vec![reason])?;
                    }
                    Err(err) => return Err(err),
                }
            }
            Job::Callback(callback) => {
                self.call(&callback, JsValue::Undefined, Vec::new())?;
            }
        }
        Ok(true)
    }

    /// Fire the earliest timer, advancing the virtual clock to its due time.
    pub(crate) fn run_next_timer(&mut self) -> EvalResult<bool> {
        let Some(((due, _), timer)) = self.timers.pop_first() else {
            return Ok(false);
        };
        self.now = self.now.max(due);
        tracing::trace!(id = timer.id, due, "timer fired");
        self.call(&timer.callback, JsValue::Undefined, timer.args)?;
        Ok(true)
    }

    pub(crate) fn add_timer(&mut self, callback: JsValue, delay: u64, args: Vec<JsValue>) -> u64 {
        self.timer_seq += 1;
        let id = self.timer_seq;
        let due = self.now.saturating_add(delay);
        self.timers.insert((due, id), Timer { id, callback, args });
        id
    }

    pub(crate) fn clear_timer(&mut self, id: u64) {
        self.timers.retain(|_, timer| timer.id != id);
    }
}
